//! Error types for fragment construction and line resolution.
//!
//! [`StructureError`] covers violations of the fragment construction
//! contract. These indicate regions built outside the normal parser flow and
//! are not recoverable user-input errors.

use thiserror::Error;

/// A structural invariant was violated while constructing a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    /// A fragment was constructed from an empty region list.
    #[error("regions cannot be empty")]
    EmptyRegions,

    /// A key declaration carried an index that does not follow the previous one.
    #[error("encountered key `{name}` with index {index} when index {expected} was expected")]
    KeyIndexOutOfSequence {
        name: String,
        index: usize,
        expected: usize,
    },

    /// An argument declaration carried an index that does not follow the previous one.
    #[error("encountered argument `{name}` with index {index} when index {expected} was expected")]
    ArgIndexOutOfSequence {
        name: String,
        index: usize,
        expected: usize,
    },

    /// The same key name was declared more than once in the fragment tree.
    #[error("duplicate key `{name}`")]
    DuplicateKey { name: String },

    /// The same argument name was declared more than once in the fragment tree.
    #[error("duplicate argument `{name}`")]
    DuplicateArg { name: String },

    /// A name was declared both as a key and as an argument.
    #[error("key and argument share the same name `{name}`")]
    KeyArgCollision { name: String },

    /// More than one `%return` declaration was found in the fragment tree.
    #[error("there can be only one return declaration")]
    DuplicateReturn,
}

/// A flattened line number fell outside a fragment's line range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no such line {line} in fragment `{fragment}`")]
pub struct LineError {
    /// The offending flattened line number.
    pub line: usize,
    /// The name of the fragment that was queried.
    pub fragment: String,
}

/// A value could not be encoded or decoded against a declared slot type.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// The value cannot be represented as an integer.
    #[error("value `{value}` is not an integer")]
    NotAnInteger { value: String },

    /// Structured decoding of a list/dict value failed.
    #[error("invalid structured value: {0}")]
    Json(#[from] serde_json::Error),

    /// The value is not a structured value of the declared kind.
    #[error("value `{value}` is not a {expected}")]
    WrongShape { value: String, expected: &'static str },
}
