//! Moonweave - a macro-aware preprocessor for embedded Lua scripts.
//!
//! Fragments declare their external parameters with `%key` and `%arg`
//! directives and compose by textual inclusion with `%include`. Moonweave
//! flattens a fragment tree into one program with globally renumbered
//! `KEYS`/`ARGV` slots, and maps any line of the flattened program back to
//! the exact originating line in the exact originating fragment, however
//! deep the inclusion chain.
//!
//! # Example
//!
//! ```no_run
//! use moonweave::{FragmentCache, load_fragment, render};
//!
//! let mut cache = FragmentCache::new();
//! let fragment = load_fragment("rate_limit", "scripts", &mut cache)
//!     .expect("failed to load fragment");
//!
//! let program = render(&fragment);
//! println!("{program}");
//! ```
//!
//! Running a fragment goes through [`Call`], which binds named values onto
//! the positional slots and hands the flattened program to a
//! [`ScriptExecutor`] implementation:
//!
//! ```no_run
//! use moonweave::{Call, FragmentCache, load_fragment};
//! use serde_json::json;
//!
//! # fn with_executor(executor: &mut impl moonweave::ScriptExecutor) {
//! let mut cache = FragmentCache::new();
//! let fragment = load_fragment("rate_limit", "scripts", &mut cache).unwrap();
//!
//! let result = Call::new(fragment)
//!     .bind("bucket", &json!("user:42"))
//!     .unwrap()
//!     .bind("limit", &json!(100))
//!     .unwrap()
//!     .invoke(executor);
//! # }
//! ```

pub mod diagnostics;

mod error;
mod exec;
mod loader;
mod render;

pub use moonweave_core::{
    ArgSpec, Fragment, LineError, MarshalError, Pragma, Region, StructureError, ValueType,
};
pub use moonweave_parser::{
    FragmentCache, FragmentSource, MemorySource, ParseError, Resolver,
};

pub use diagnostics::ScriptError;
pub use error::MoonweaveError;
pub use exec::{Call, CallError, ExecutionError, ScriptExecutor};
pub use loader::{DirSource, load_dir, load_fragment};
pub use render::render;

use serde_json::Value;

/// The fragment name used for ad-hoc program text.
pub const USER_CODE_NAME: &str = "<user-code>";

/// Parse and run ad-hoc program text on an executor.
///
/// The text is parsed under the [`USER_CODE_NAME`] name with includes
/// resolved through `source` and `cache`, every declared key and argument is
/// bound from `bindings`, and the flattened program runs on `executor`.
///
/// # Errors
///
/// Returns [`MoonweaveError`] for parse failures, unknown or missing
/// bindings, executor failures, and return-value decoding failures.
pub fn run_source<E, S>(
    executor: &mut E,
    content: &str,
    source: &S,
    cache: &mut FragmentCache,
    bindings: &[(&str, Value)],
) -> Result<Value, MoonweaveError>
where
    E: ScriptExecutor,
    S: FragmentSource + ?Sized,
{
    let fragment = moonweave_parser::parse(USER_CODE_NAME, content, source, cache)?;

    let mut call = Call::new(fragment);
    for (name, value) in bindings {
        call = call.bind(name, value)?;
    }

    call.invoke(executor)
}
