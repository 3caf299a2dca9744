//! Moonweave Core Types and Definitions
//!
//! This crate provides the foundational types for the Moonweave Lua fragment
//! preprocessor. It includes:
//!
//! - **Regions**: the classified pieces of a fragment's source ([`region`] module)
//! - **Fragments**: parsed, named, immutable units of source ([`fragment`] module)
//! - **Line index**: flattened-line to source-line mapping ([`line_index`] module)
//! - **Values**: declared slot types and call-time marshalling ([`value`] module)

pub mod error;
pub mod fragment;
pub mod line_index;
pub mod region;
pub mod value;

pub use error::{LineError, MarshalError, StructureError};
pub use fragment::{ArgSpec, Fragment};
pub use line_index::{LineIndex, ResolvedLine};
pub use region::Region;
pub use value::{Pragma, ValueType};
