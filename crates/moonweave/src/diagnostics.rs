//! Mapping runtime errors back to fragment sources.
//!
//! Two responsibilities live here. [`trace`] turns a flattened line number
//! into the ordered list of (fragment, real line) frames describing how that
//! line reaches back through nested inclusions. [`parse_execution_message`]
//! pattern-matches the opaque error strings produced by the execution
//! collaborator to extract the error kind, the script handle, the flattened
//! line number, and the underlying message; strings matching no known format
//! are left for the caller to handle generically.
//!
//! [`ScriptError`] combines both: it stores the root fragment and the
//! extracted pieces, and renders the multi-frame traceback lazily, only when
//! the error is actually displayed.

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use moonweave_core::{Fragment, LineError, Region};

/// The diagnostic format `<kind>: <handle>:<line>: <message>`, with an
/// optional `ERR ` prefix.
fn simple_format() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:ERR )?(?P<kind>[^:]+): (?P<handle>[\w_]+):(?P<line>\d+): (?P<message>.*)$")
            .expect("simple diagnostic format is a valid regex")
    })
}

/// The diagnostic format with an interposed call frame:
/// `<kind>: <frame>:<line>: <handle>:<line>: <message>`.
fn framed_format() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<kind>[^:]+): [\w@_()]+:\d+: (?P<handle>[\w_]+):(?P<line>\d+): (?P<message>.*)$",
        )
        .expect("framed diagnostic format is a valid regex")
    })
}

/// The pieces extracted from a collaborator error string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionDiagnostic {
    /// The declared error kind, e.g. `something is wrong`.
    pub kind: String,
    /// The collaborator's script handle, e.g. `f_1234abc`.
    pub handle: String,
    /// The flattened line number the error points at.
    pub line: usize,
    /// The underlying error message.
    pub message: String,
}

/// Extract the structured pieces of a collaborator error string.
///
/// Returns `None` when the string matches no known diagnostic format; the
/// caller should then pass the raw error through unmodified.
pub fn parse_execution_message(message: &str) -> Option<ExecutionDiagnostic> {
    let captures = simple_format()
        .captures(message)
        .or_else(|| framed_format().captures(message))?;

    Some(ExecutionDiagnostic {
        kind: captures["kind"].to_string(),
        handle: captures["handle"].to_string(),
        line: captures["line"].parse().ok()?,
        message: captures["message"].to_string(),
    })
}

/// One frame of a traceback: a fragment and the real line inside it.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The fragment this frame points into.
    pub fragment: Arc<Fragment>,
    /// The line in the fragment's own source.
    pub line: usize,
    /// The literal source line text.
    pub source: String,
}

/// Trace a flattened line back through nested inclusions.
///
/// The returned frames read outermost fragment first, innermost last. Each
/// level resolves the owning region; an include frame translates the line
/// into the target's local numbering and recurses.
///
/// # Errors
///
/// Returns [`LineError`] when `line` falls outside the flattened program.
pub fn trace(fragment: &Arc<Fragment>, line: usize) -> Result<Vec<Frame>, LineError> {
    let mut frames = Vec::new();
    let mut current = Arc::clone(fragment);
    let mut line = line;

    loop {
        let (real_line, source, next) = {
            let resolved = current.resolve_line(line)?;
            let source = current.source_line(line)?.to_string();
            let next = match resolved.region {
                Region::Include { fragment, .. } => {
                    Some((Arc::clone(fragment), line - resolved.first_line + 1))
                }
                _ => None,
            };
            (resolved.real_line, source, next)
        };

        frames.push(Frame {
            fragment: Arc::clone(&current),
            line: real_line,
            source,
        });

        match next {
            Some((target, local_line)) => {
                current = target;
                line = local_line;
            }
            None => break,
        }
    }

    Ok(frames)
}

/// A structured execution error mapped back to its fragment sources.
///
/// Produced when a collaborator error string matches a known diagnostic
/// format. The traceback is not computed up front: the error stores only the
/// root fragment and the flattened line, and [`fmt::Display`] walks the line
/// index on demand.
#[derive(Debug)]
pub struct ScriptError {
    fragment: Arc<Fragment>,
    line: usize,
    kind: String,
    message: String,
}

impl ScriptError {
    pub fn new(
        fragment: Arc<Fragment>,
        line: usize,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            fragment,
            line,
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Wrap a collaborator error string, if it matches a known format.
    pub fn from_execution_message(fragment: &Arc<Fragment>, message: &str) -> Option<Self> {
        let diagnostic = parse_execution_message(message)?;

        Some(Self::new(
            Arc::clone(fragment),
            diagnostic.line,
            diagnostic.kind,
            diagnostic.message,
        ))
    }

    /// The root fragment the error was raised from.
    pub fn fragment(&self) -> &Arc<Fragment> {
        &self.fragment
    }

    /// The flattened line number the collaborator reported.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The declared error kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The underlying error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The full traceback for the reported line.
    ///
    /// # Errors
    ///
    /// Returns [`LineError`] when the reported line falls outside the
    /// flattened program.
    pub fn traceback(&self) -> Result<Vec<Frame>, LineError> {
        trace(&self.fragment, self.line)
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message)?;
        write!(f, "LUA Traceback (most recent fragment last):")?;

        match self.traceback() {
            Ok(frames) => {
                for frame in frames {
                    write!(
                        f,
                        "\n  Fragment \"{}\", line {}\n    {}",
                        frame.fragment.name(),
                        frame.line,
                        frame.source.trim()
                    )?;
                }
            }
            Err(_) => {
                write!(
                    f,
                    "\n  (line {} is outside fragment \"{}\")",
                    self.line,
                    self.fragment.name()
                )?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for ScriptError {}
