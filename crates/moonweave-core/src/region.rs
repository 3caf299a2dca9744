//! Regions: the classified pieces of a fragment's source.
//!
//! Parsing splits a fragment into an ordered sequence of regions. A region is
//! either a run of plain text, one of the four declaration directives, or the
//! inclusion of another fragment. Every region knows how many lines it
//! contributes to the flattened program (`line_count`) and how many lines it
//! occupies in its own source (`real_line_count`).

use std::sync::Arc;

use crate::fragment::Fragment;
use crate::value::{Pragma, ValueType};

/// One classified piece of a fragment's source.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    /// A contiguous run of non-directive lines, stored verbatim.
    Text { content: String },

    /// A `%key <name>` declaration.
    ///
    /// `index` is the 1-based position of this key among the key slots
    /// visible at this point of the fragment, counting the effective
    /// contribution of earlier includes.
    Key {
        name: String,
        index: usize,
        content: String,
    },

    /// A `%arg <name> [<type>]` declaration.
    Arg {
        name: String,
        index: usize,
        value_type: ValueType,
        content: String,
    },

    /// A `%return <type>` declaration.
    Return {
        value_type: ValueType,
        content: String,
    },

    /// A `%pragma <value>` declaration.
    Pragma { pragma: Pragma, content: String },

    /// A `%include "<name>"` reference to another fragment.
    ///
    /// The target is shared by reference; the same [`Fragment`] can appear
    /// behind any number of include regions.
    Include {
        fragment: Arc<Fragment>,
        content: String,
    },
}

impl Region {
    /// Lines this region contributes to the flattened program.
    ///
    /// For an include this is the target fragment's own flattened line
    /// count; elision of repeated once-only inclusions is handled by the
    /// line index, not here.
    pub fn line_count(&self) -> usize {
        match self {
            Region::Text { content } => text_line_count(content),
            Region::Include { fragment, .. } => fragment.line_count(),
            _ => 1,
        }
    }

    /// Lines this region occupies in its own source text.
    pub fn real_line_count(&self) -> usize {
        match self {
            Region::Text { content } => text_line_count(content),
            _ => 1,
        }
    }

    /// The raw source text of this region.
    ///
    /// For directive and include regions this is the original directive
    /// line; for text regions the whole run.
    pub fn content(&self) -> &str {
        match self {
            Region::Text { content }
            | Region::Key { content, .. }
            | Region::Arg { content, .. }
            | Region::Return { content, .. }
            | Region::Pragma { content, .. }
            | Region::Include { content, .. } => content,
        }
    }
}

fn text_line_count(content: &str) -> usize {
    content.matches('\n').count() + 1
}
