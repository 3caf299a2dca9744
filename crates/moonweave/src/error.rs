//! The main error type for Moonweave operations.
//!
//! [`MoonweaveError`] wraps the error conditions that can occur while
//! loading, rendering, and invoking fragments.

use std::io;

use thiserror::Error;

use moonweave_core::{LineError, MarshalError};
use moonweave_parser::ParseError;

use crate::diagnostics::ScriptError;
use crate::exec::{CallError, ExecutionError};

/// The main error type for Moonweave operations.
#[derive(Debug, Error)]
pub enum MoonweaveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error(transparent)]
    Line(#[from] LineError),
}
