//! Error adapter for converting MoonweaveError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error
//! types and miette's rich diagnostic formatting used in the CLI. Malformed
//! directive errors carry the offending source line, which is attached as a
//! labeled span pointing at the unknown token.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use moonweave::MoonweaveError;
use moonweave_parser::ParseError;

/// A reportable error that can be rendered by miette.
pub struct Reportable<'a> {
    err: &'a MoonweaveError,
}

impl<'a> Reportable<'a> {
    pub fn new(err: &'a MoonweaveError) -> Self {
        Self { err }
    }
}

impl fmt::Debug for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.err, f)
    }
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.err, f)
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.err.source()
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'b>(&'b self) -> Option<Box<dyn fmt::Display + 'b>> {
        let code = match self.err {
            MoonweaveError::Io(_) => "moonweave::io",
            MoonweaveError::Parse(ParseError::NotFound { .. }) => "moonweave::not_found",
            MoonweaveError::Parse(ParseError::Cycle { .. }) => "moonweave::cycle",
            MoonweaveError::Parse(ParseError::UnknownType { .. })
            | MoonweaveError::Parse(ParseError::UnknownPragma { .. }) => "moonweave::directive",
            MoonweaveError::Parse(ParseError::Structure(_)) => "moonweave::structure",
            MoonweaveError::Call(_) => "moonweave::call",
            MoonweaveError::Execution(_) => "moonweave::execution",
            MoonweaveError::Script(_) => "moonweave::script",
            MoonweaveError::Marshal(_) => "moonweave::marshal",
            MoonweaveError::Line(_) => "moonweave::line",
        };
        Some(Box::new(code))
    }

    fn help<'b>(&'b self) -> Option<Box<dyn fmt::Display + 'b>> {
        let help = match self.err {
            MoonweaveError::Parse(ParseError::NotFound { .. }) => {
                "check the fragment name and the search path"
            }
            MoonweaveError::Parse(ParseError::Cycle { .. }) => {
                "remove one of the includes to break the cycle"
            }
            MoonweaveError::Parse(ParseError::UnknownType { .. }) => {
                "valid types are: string, integer, boolean, list, dict"
            }
            MoonweaveError::Parse(ParseError::UnknownPragma { .. }) => {
                "valid pragma values are: once"
            }
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self.err {
            MoonweaveError::Parse(
                ParseError::UnknownType { text, .. } | ParseError::UnknownPragma { text, .. },
            ) => Some(text as &dyn miette::SourceCode),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let (text, token, message) = match self.err {
            MoonweaveError::Parse(ParseError::UnknownType { text, token, .. }) => {
                (text, token, "unknown type")
            }
            MoonweaveError::Parse(ParseError::UnknownPragma { text, token, .. }) => {
                (text, token, "unknown value")
            }
            _ => return None,
        };

        let offset = text.rfind(token.as_str())?;
        let span = SourceSpan::new(offset.into(), token.len());

        Some(Box::new(std::iter::once(
            LabeledSpan::new_primary_with_span(Some(message.to_string()), span),
        )))
    }
}

/// Convert a [`MoonweaveError`] into a list of reportable errors.
pub fn to_reportables(err: &MoonweaveError) -> Vec<Reportable<'_>> {
    vec![Reportable::new(err)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_error_has_source_and_label() {
        let err = MoonweaveError::Parse(ParseError::UnknownType {
            token: "float".to_string(),
            line: 2,
            text: "%arg value float".to_string(),
        });

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);

        let reportable = &reportables[0];
        assert_eq!(reportable.code().unwrap().to_string(), "moonweave::directive");
        assert!(reportable.source_code().is_some());

        let labels: Vec<_> = reportable.labels().unwrap().collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].label(), Some("unknown type"));
        assert_eq!(labels[0].offset(), "%arg value ".len());
        assert_eq!(labels[0].len(), "float".len());
    }

    #[test]
    fn test_not_found_has_help_but_no_source() {
        let err = MoonweaveError::Parse(ParseError::NotFound {
            name: "foo".to_string(),
            location: "scripts/foo.lua".to_string(),
        });

        let reportable = Reportable::new(&err);
        assert_eq!(reportable.code().unwrap().to_string(), "moonweave::not_found");
        assert!(reportable.help().is_some());
        assert!(reportable.source_code().is_none());
        assert!(reportable.labels().is_none());
    }

    #[test]
    fn test_io_error_is_plain() {
        let err = MoonweaveError::Io(std::io::Error::other("disk on fire"));

        let reportable = Reportable::new(&err);
        assert_eq!(reportable.code().unwrap().to_string(), "moonweave::io");
        assert!(reportable.help().is_none());
        assert!(reportable.labels().is_none());
    }
}
