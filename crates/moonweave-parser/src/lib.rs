//! Directive parser and fragment resolver for the Moonweave preprocessor.
//!
//! This crate turns raw fragment text into [`Fragment`] values from
//! [`moonweave_core`], resolving `%include` directives recursively through a
//! caller-supplied [`FragmentSource`] and a shared [`FragmentCache`].
//!
//! # Example
//!
//! ```
//! use moonweave_parser::{FragmentCache, MemorySource, parse};
//!
//! let mut source = MemorySource::new();
//! source.insert("util", "local util = {}");
//!
//! let mut cache = FragmentCache::new();
//! let fragment = parse(
//!     "main",
//!     "%include \"util\"\nreturn util",
//!     &source,
//!     &mut cache,
//! )
//! .expect("parse failed");
//!
//! assert_eq!(fragment.line_count(), 2);
//! assert!(cache.contains("util"));
//! ```

pub mod error;

mod directive;
mod parser;
mod resolver;


use std::sync::Arc;

use moonweave_core::Fragment;

pub use error::ParseError;
pub use resolver::{FragmentCache, FragmentSource, MemorySource, Resolver};

/// Resolve a fragment by canonical name.
///
/// A cache hit returns the existing fragment by reference; on a miss the
/// source is read and parsed, with every transitively included fragment
/// cached as it completes.
///
/// # Errors
///
/// Returns [`ParseError`] for missing sources, cyclic inclusion chains,
/// malformed directives, and structural violations.
pub fn resolve<S>(
    name: &str,
    source: &S,
    cache: &mut FragmentCache,
) -> Result<Arc<Fragment>, ParseError>
where
    S: FragmentSource + ?Sized,
{
    Resolver::new(source, cache).resolve(name)
}

/// Parse a fragment from text already in hand.
///
/// Useful for ad-hoc program text; includes are still resolved through
/// `source` and `cache`.
///
/// # Errors
///
/// Returns [`ParseError`] as [`resolve`] does.
pub fn parse<S>(
    name: &str,
    content: &str,
    source: &S,
    cache: &mut FragmentCache,
) -> Result<Arc<Fragment>, ParseError>
where
    S: FragmentSource + ?Sized,
{
    Resolver::new(source, cache).parse(name, content)
}
