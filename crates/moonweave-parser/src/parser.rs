//! Line scanner turning raw fragment text into an ordered region list.
//!
//! The scanner walks physical lines in order, matching each against the
//! directive grammars; runs of non-directive lines buffer up and flush as a
//! single text region whenever a directive is reached. Include directives
//! recurse into the resolver with the ancestor path threaded through for
//! cycle detection.

use std::collections::HashSet;
use std::sync::Arc;

use moonweave_core::{Fragment, Pragma, Region, ValueType};

use crate::directive::{Directive, parse_directive};
use crate::error::ParseError;
use crate::resolver::{FragmentSource, Resolver};

/// Parse fragment text into regions, resolving includes through `resolver`.
pub(crate) fn parse_regions<S>(
    resolver: &mut Resolver<'_, S>,
    name: &str,
    content: &str,
    ancestors: &mut Vec<String>,
) -> Result<Vec<Region>, ParseError>
where
    S: FragmentSource + ?Sized,
{
    let directory = directory_of(name);
    let mut builder = RegionsBuilder::new(name);

    for (real_line, line) in physical_lines(content).iter().enumerate() {
        let real_line = real_line + 1;

        match parse_directive(line) {
            Some(Directive::Include { path }) => {
                let target = normalize_include_name(directory, path);
                let fragment = resolver.resolve_with_ancestors(&target, ancestors)?;
                builder.add_include(fragment, line);
            }
            Some(Directive::Key { name }) => builder.add_key(name, line),
            Some(Directive::Arg { name, type_token }) => {
                let value_type = match type_token {
                    None => ValueType::String,
                    Some(token) => {
                        ValueType::parse(token).ok_or_else(|| ParseError::UnknownType {
                            token: token.to_string(),
                            line: real_line,
                            text: line.to_string(),
                        })?
                    }
                };
                builder.add_arg(name, value_type, line);
            }
            Some(Directive::Return { type_token }) => {
                let value_type =
                    ValueType::parse(type_token).ok_or_else(|| ParseError::UnknownType {
                        token: type_token.to_string(),
                        line: real_line,
                        text: line.to_string(),
                    })?;
                builder.add_return(value_type, line);
            }
            Some(Directive::Pragma { token }) => {
                let pragma = Pragma::parse(token).ok_or_else(|| ParseError::UnknownPragma {
                    token: token.to_string(),
                    line: real_line,
                    text: line.to_string(),
                })?;
                builder.add_pragma(pragma, line);
            }
            None => builder.add_text_line(line),
        }
    }

    Ok(builder.finish())
}

/// Split content into physical lines, dropping the trailing empty line a
/// final newline produces.
fn physical_lines(content: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = content.split('\n').collect();

    if lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    lines
}

/// The directory component of a canonical fragment name, or `""`.
fn directory_of(name: &str) -> &str {
    name.rsplit_once('/').map_or("", |(directory, _)| directory)
}

/// Resolve an include path against the including fragment's directory.
///
/// Backslashes become forward slashes and `.`/`..` segments are folded
/// away; `..` segments that climb past the root are kept as-is.
pub(crate) fn normalize_include_name(directory: &str, path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();

    for segment in directory.split('/').chain(path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), None | Some(&"..")) {
                    segments.push("..");
                } else {
                    segments.pop();
                }
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Accumulates regions while the scanner walks lines.
///
/// Keeps the running key/argument slot indices, counting the effective
/// contribution of each include the same way fragment construction flattens
/// declarations, so parser-assigned indices always pass construction
/// validation.
struct RegionsBuilder {
    regions: Vec<Region>,
    text_lines: Vec<String>,
    key_index: usize,
    arg_index: usize,
    included: HashSet<String>,
}

impl RegionsBuilder {
    fn new(name: &str) -> Self {
        Self {
            regions: Vec::new(),
            text_lines: Vec::new(),
            key_index: 1,
            arg_index: 1,
            included: HashSet::from([name.to_string()]),
        }
    }

    fn add_text_line(&mut self, line: &str) {
        self.text_lines.push(line.to_string());
    }

    fn flush(&mut self) {
        if !self.text_lines.is_empty() {
            self.regions.push(Region::Text {
                content: self.text_lines.join("\n"),
            });
            self.text_lines.clear();
        }
    }

    fn add_key(&mut self, name: &str, content: &str) {
        self.flush();
        self.regions.push(Region::Key {
            name: name.to_string(),
            index: self.key_index,
            content: content.to_string(),
        });
        self.key_index += 1;
    }

    fn add_arg(&mut self, name: &str, value_type: ValueType, content: &str) {
        self.flush();
        self.regions.push(Region::Arg {
            name: name.to_string(),
            index: self.arg_index,
            value_type,
            content: content.to_string(),
        });
        self.arg_index += 1;
    }

    fn add_return(&mut self, value_type: ValueType, content: &str) {
        self.flush();
        self.regions.push(Region::Return {
            value_type,
            content: content.to_string(),
        });
    }

    fn add_pragma(&mut self, pragma: Pragma, content: &str) {
        self.flush();
        self.regions.push(Region::Pragma {
            pragma,
            content: content.to_string(),
        });
    }

    fn add_include(&mut self, fragment: Arc<Fragment>, content: &str) {
        self.flush();

        let (keys, args) = slot_contribution(&fragment, &mut self.included);
        self.key_index += keys;
        self.arg_index += args;

        self.regions.push(Region::Include {
            fragment,
            content: content.to_string(),
        });
    }

    /// Flush any pending text and normalize an empty fragment to a single
    /// empty text region.
    fn finish(mut self) -> Vec<Region> {
        self.flush();

        if self.regions.is_empty() {
            self.regions.push(Region::Text {
                content: String::new(),
            });
        }

        self.regions
    }
}

/// Key and argument slots an include contributes, honoring the once-only
/// elision rule under the visited set accumulated so far.
fn slot_contribution(fragment: &Arc<Fragment>, visited: &mut HashSet<String>) -> (usize, usize) {
    if visited.contains(fragment.name()) && !fragment.allow_multiple_inclusion() {
        return (0, 0);
    }
    visited.insert(fragment.name().to_string());

    let mut keys = 0;
    let mut args = 0;

    for region in fragment.regions() {
        match region {
            Region::Key { .. } => keys += 1,
            Region::Arg { .. } => args += 1,
            Region::Include { fragment, .. } => {
                let (nested_keys, nested_args) = slot_contribution(fragment, visited);
                keys += nested_keys;
                args += nested_args;
            }
            _ => {}
        }
    }

    (keys, args)
}
