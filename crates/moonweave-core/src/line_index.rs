//! Mapping between flattened program lines and fragment source lines.
//!
//! The flattened program is the text obtained by recursively substituting
//! every inclusion with its target fragment's rendered lines. The
//! [`LineIndex`] records, for every region that contributes flattened lines,
//! the half-open line span it occupies and where those lines live in the
//! fragment's own source. It is built once at fragment construction and
//! walked again at query time to translate a flattened line into an
//! originating region.
//!
//! The walk mirrors the renderer exactly: a once-only fragment that has
//! already been expanded in the current walk contributes zero flattened
//! lines (the elided duplicate collapses entirely) while still occupying one
//! real line in its parent's source.

use std::collections::HashSet;

use crate::region::Region;

/// One region's contribution to the flattened program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LineSpan {
    /// Index of the owning region in the fragment's region list.
    pub(crate) region: usize,
    /// First flattened line occupied by the region (1-based).
    pub(crate) first_line: usize,
    /// Number of flattened lines occupied.
    pub(crate) line_count: usize,
    /// First line the region occupies in the fragment's own source.
    pub(crate) first_real_line: usize,
    /// Number of source lines occupied (1 for directives and includes).
    pub(crate) real_line_count: usize,
}

/// Line mapping for one fragment, built at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    spans: Vec<LineSpan>,
    line_count: usize,
    real_line_count: usize,
}

impl LineIndex {
    /// Build the index for a fragment's region list.
    ///
    /// `name` seeds the visited set so that the walk matches rendering,
    /// where the fragment being rendered is itself marked first.
    pub(crate) fn build(name: &str, regions: &[Region]) -> Self {
        let mut visited = HashSet::from([name.to_string()]);
        let mut spans = Vec::new();
        let mut line = 1usize;
        let mut real_line = 1usize;

        for (idx, region) in regions.iter().enumerate() {
            match region {
                Region::Include { fragment, .. } => {
                    if visited.contains(fragment.name()) && !fragment.allow_multiple_inclusion() {
                        // Elided duplicate: no flattened lines, one real line.
                        real_line += 1;
                        continue;
                    }
                    visited.insert(fragment.name().to_string());

                    let span_lines = effective_line_count(fragment.regions(), &mut visited);
                    if span_lines > 0 {
                        spans.push(LineSpan {
                            region: idx,
                            first_line: line,
                            line_count: span_lines,
                            first_real_line: real_line,
                            real_line_count: 1,
                        });
                        line += span_lines;
                    }
                    real_line += 1;
                }
                _ => {
                    let count = region.real_line_count();
                    spans.push(LineSpan {
                        region: idx,
                        first_line: line,
                        line_count: count,
                        first_real_line: real_line,
                        real_line_count: count,
                    });
                    line += count;
                    real_line += count;
                }
            }
        }

        Self {
            spans,
            line_count: line - 1,
            real_line_count: real_line - 1,
        }
    }

    /// Total number of lines in the flattened program.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Total number of lines in the fragment's own source.
    pub fn real_line_count(&self) -> usize {
        self.real_line_count
    }

    /// The span owning the given flattened line, if any.
    pub(crate) fn span_at(&self, line: usize) -> Option<&LineSpan> {
        self.spans
            .iter()
            .find(|span| line >= span.first_line && line < span.first_line + span.line_count)
    }
}

/// A resolved flattened line: the owning region and its position.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLine<'a> {
    /// The region that produced the line.
    pub region: &'a Region,
    /// First flattened line of the owning region's span.
    pub first_line: usize,
    /// The queried flattened line.
    pub line: usize,
    /// Flattened lines occupied by the owning span.
    pub line_count: usize,
    /// First source line of the owning region.
    pub first_real_line: usize,
    /// The corresponding line in the fragment's own source.
    ///
    /// For an include region this is the line of the `%include` directive
    /// itself, whatever the offset inside the target.
    pub real_line: usize,
    /// Source lines occupied by the owning region.
    pub real_line_count: usize,
}

/// Flattened line count of a region list under an ongoing visited set.
///
/// Recursion propagates the set so that a once-only fragment reached through
/// any path contributes its lines at most once per walk.
fn effective_line_count(regions: &[Region], visited: &mut HashSet<String>) -> usize {
    let mut lines = 0;

    for region in regions {
        match region {
            Region::Include { fragment, .. } => {
                if visited.contains(fragment.name()) && !fragment.allow_multiple_inclusion() {
                    continue;
                }
                visited.insert(fragment.name().to_string());
                lines += effective_line_count(fragment.regions(), visited);
            }
            _ => lines += region.real_line_count(),
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(content: &str) -> Region {
        Region::Text {
            content: content.to_string(),
        }
    }

    #[test]
    fn test_build_text_only() {
        let regions = vec![text("a"), text("b\nc")];
        let index = LineIndex::build("foo", &regions);

        assert_eq!(index.line_count(), 3);
        assert_eq!(index.real_line_count(), 3);

        let span = index.span_at(1).unwrap();
        assert_eq!((span.region, span.first_line, span.line_count), (0, 1, 1));

        let span = index.span_at(3).unwrap();
        assert_eq!((span.region, span.first_line, span.line_count), (1, 2, 2));
    }

    #[test]
    fn test_span_at_out_of_range() {
        let regions = vec![text("a")];
        let index = LineIndex::build("foo", &regions);

        assert!(index.span_at(0).is_none());
        assert!(index.span_at(2).is_none());
    }
}
