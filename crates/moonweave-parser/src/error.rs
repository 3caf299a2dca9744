//! Error types for parsing and fragment resolution.
//!
//! Parse-time errors abort the whole resolution for the top-level request.
//! Nested fragments that finished parsing before the failure stay in the
//! cache; callers must tolerate partially warmed caches on error.

use thiserror::Error;

use moonweave_core::StructureError;

/// Error type for parsing and resolving fragments.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The requested fragment name has no backing source.
    #[error("no such fragment `{name}` found at `{location}`")]
    NotFound { name: String, location: String },

    /// An `%include` chain revisited a fragment that is still being parsed.
    ///
    /// The cycle starts at the first occurrence of the revisited name and
    /// ends with that name again, e.g. `a -> b -> a`.
    #[error("cyclic inclusion: {}", .cycle.join(" -> "))]
    Cycle { cycle: Vec<String> },

    /// A well-formed `%arg`/`%return` directive carried an unknown type.
    #[error("unknown type `{token}` in `{text}` when parsing line {line}")]
    UnknownType {
        token: String,
        line: usize,
        text: String,
    },

    /// A well-formed `%pragma` directive carried an unknown value.
    #[error("unknown value `{token}` in `{text}` when parsing line {line}")]
    UnknownPragma {
        token: String,
        line: usize,
        text: String,
    },

    /// Fragment construction rejected the parsed regions.
    #[error(transparent)]
    Structure(#[from] StructureError),
}
