//! The fragment entity: a parsed, named, immutable unit of source.
//!
//! A [`Fragment`] is produced once by the parser from a name and an ordered
//! region list, then cached and shared by reference (`Arc`) for every
//! subsequent inclusion of the same name. Construction aggregates the
//! key/argument declarations of the whole inclusion tree, validates the
//! structural invariants, and builds the line index.

use std::cmp::min;
use std::collections::HashSet;
use std::sync::Arc;

use log::trace;

use crate::error::{LineError, StructureError};
use crate::line_index::{LineIndex, ResolvedLine};
use crate::region::Region;
use crate::value::{Pragma, ValueType};

/// A named argument slot with its declared value type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: String,
    pub value_type: ValueType,
}

/// A parsed fragment: the unit of inclusion and caching.
///
/// Fragments are immutable after construction and compare equal by name and
/// region content. Identity for caching and inclusion bookkeeping is the
/// canonical name (slash-separated path, no extension).
#[derive(Debug)]
pub struct Fragment {
    name: String,
    regions: Vec<Region>,
    keys: Vec<String>,
    args: Vec<ArgSpec>,
    return_type: Option<ValueType>,
    allow_multiple_inclusion: bool,
    line_index: LineIndex,
}

impl Fragment {
    /// Construct a fragment from its name and ordered regions.
    ///
    /// Validates the structural invariants: a non-empty region list,
    /// sequential 1-based indices for the fragment's own declarations,
    /// global key/argument name uniqueness, no key/argument name collision,
    /// and at most one return declaration in the tree.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError`] when an invariant is violated. These
    /// indicate regions built outside the parser contract, not bad user
    /// input.
    pub fn new(name: impl Into<String>, regions: Vec<Region>) -> Result<Arc<Self>, StructureError> {
        let name = name.into();

        if regions.is_empty() {
            return Err(StructureError::EmptyRegions);
        }

        let keys = flatten_keys(&name, &regions)?;
        let args = flatten_args(&name, &regions)?;
        let return_type = find_return(&name, &regions)?;

        check_duplicates(&keys, &args)?;

        let allow_multiple_inclusion = !regions.iter().any(|region| match region {
            Region::Pragma {
                pragma: Pragma::Once,
                ..
            } => true,
            Region::Include { fragment, .. } => !fragment.allow_multiple_inclusion(),
            _ => false,
        });

        let line_index = LineIndex::build(&name, &regions);

        trace!(
            name = name,
            keys = keys.len(),
            args = args.len(),
            lines = line_index.line_count();
            "Constructed fragment"
        );

        Ok(Arc::new(Self {
            name,
            regions,
            keys,
            args,
            return_type,
            allow_multiple_inclusion,
            line_index,
        }))
    }

    /// The canonical fragment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered regions composing the fragment.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Key names aggregated over the whole inclusion tree, in slot order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Argument declarations aggregated over the whole inclusion tree.
    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    /// The declared return type, if any.
    pub fn return_type(&self) -> Option<ValueType> {
        self.return_type
    }

    /// Whether the fragment may be expanded more than once per render.
    ///
    /// False when a `%pragma once` appears anywhere in the tree.
    pub fn allow_multiple_inclusion(&self) -> bool {
        self.allow_multiple_inclusion
    }

    /// Lines in the flattened program.
    pub fn line_count(&self) -> usize {
        self.line_index.line_count()
    }

    /// Lines in the fragment's own source text.
    pub fn real_line_count(&self) -> usize {
        self.line_index.real_line_count()
    }

    /// The line index built at construction.
    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Resolve a flattened line to its owning region.
    ///
    /// # Errors
    ///
    /// Returns [`LineError`] when `line` is outside `[1, line_count]`.
    pub fn resolve_line(&self, line: usize) -> Result<ResolvedLine<'_>, LineError> {
        let span = self.line_index.span_at(line).ok_or_else(|| LineError {
            line,
            fragment: self.name.clone(),
        })?;

        Ok(ResolvedLine {
            region: &self.regions[span.region],
            first_line: span.first_line,
            line,
            line_count: span.line_count,
            first_real_line: span.first_real_line,
            real_line: span.first_real_line + min(line - span.first_line, span.real_line_count - 1),
            real_line_count: span.real_line_count,
        })
    }

    /// The literal source-line text behind a flattened line.
    ///
    /// A line inside an include's span yields the `%include` directive line
    /// from this fragment's own source; recursing into the target is the
    /// diagnostic mapper's job.
    ///
    /// # Errors
    ///
    /// Returns [`LineError`] when `line` is outside `[1, line_count]`.
    pub fn source_line(&self, line: usize) -> Result<&str, LineError> {
        let resolved = self.resolve_line(line)?;

        match resolved.region {
            Region::Text { content } => Ok(content
                .split('\n')
                .nth(line - resolved.first_line)
                .unwrap_or_default()),
            region => Ok(region.content()),
        }
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.regions == other.regions
    }
}

/// Flatten key declarations over the inclusion tree, in slot order.
///
/// The fragment's own declarations are validated for sequential indices
/// against the flattened-so-far count; included fragments were validated at
/// their own construction and only contribute their names. A once-only
/// fragment already expanded in this walk contributes nothing.
fn flatten_keys(name: &str, regions: &[Region]) -> Result<Vec<String>, StructureError> {
    let mut visited = HashSet::from([name.to_string()]);
    let mut keys = Vec::new();

    collect_keys(regions, &mut visited, &mut keys, true)?;

    Ok(keys)
}

fn collect_keys(
    regions: &[Region],
    visited: &mut HashSet<String>,
    out: &mut Vec<String>,
    validate: bool,
) -> Result<(), StructureError> {
    for region in regions {
        match region {
            Region::Key { name, index, .. } => {
                if validate && *index != out.len() + 1 {
                    return Err(StructureError::KeyIndexOutOfSequence {
                        name: name.clone(),
                        index: *index,
                        expected: out.len() + 1,
                    });
                }
                out.push(name.clone());
            }
            Region::Include { fragment, .. } => {
                if visited.contains(fragment.name()) && !fragment.allow_multiple_inclusion() {
                    continue;
                }
                visited.insert(fragment.name().to_string());
                collect_keys(fragment.regions(), visited, out, false)?;
            }
            _ => {}
        }
    }

    Ok(())
}

fn flatten_args(name: &str, regions: &[Region]) -> Result<Vec<ArgSpec>, StructureError> {
    let mut visited = HashSet::from([name.to_string()]);
    let mut args = Vec::new();

    collect_args(regions, &mut visited, &mut args, true)?;

    Ok(args)
}

fn collect_args(
    regions: &[Region],
    visited: &mut HashSet<String>,
    out: &mut Vec<ArgSpec>,
    validate: bool,
) -> Result<(), StructureError> {
    for region in regions {
        match region {
            Region::Arg {
                name,
                index,
                value_type,
                ..
            } => {
                if validate && *index != out.len() + 1 {
                    return Err(StructureError::ArgIndexOutOfSequence {
                        name: name.clone(),
                        index: *index,
                        expected: out.len() + 1,
                    });
                }
                out.push(ArgSpec {
                    name: name.clone(),
                    value_type: *value_type,
                });
            }
            Region::Include { fragment, .. } => {
                if visited.contains(fragment.name()) && !fragment.allow_multiple_inclusion() {
                    continue;
                }
                visited.insert(fragment.name().to_string());
                collect_args(fragment.regions(), visited, out, false)?;
            }
            _ => {}
        }
    }

    Ok(())
}

/// Find the single return declaration in the tree, if any.
fn find_return(name: &str, regions: &[Region]) -> Result<Option<ValueType>, StructureError> {
    let mut visited = HashSet::from([name.to_string()]);
    let mut found = None;

    collect_return(regions, &mut visited, &mut found)?;

    Ok(found)
}

fn collect_return(
    regions: &[Region],
    visited: &mut HashSet<String>,
    found: &mut Option<ValueType>,
) -> Result<(), StructureError> {
    for region in regions {
        match region {
            Region::Return { value_type, .. } => {
                if found.is_some() {
                    return Err(StructureError::DuplicateReturn);
                }
                *found = Some(*value_type);
            }
            Region::Include { fragment, .. } => {
                if visited.contains(fragment.name()) && !fragment.allow_multiple_inclusion() {
                    continue;
                }
                visited.insert(fragment.name().to_string());
                collect_return(fragment.regions(), visited, found)?;
            }
            _ => {}
        }
    }

    Ok(())
}

fn check_duplicates(keys: &[String], args: &[ArgSpec]) -> Result<(), StructureError> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key.as_str()) {
            return Err(StructureError::DuplicateKey { name: key.clone() });
        }
    }

    let mut seen = HashSet::new();
    for arg in args {
        if !seen.insert(arg.name.as_str()) {
            return Err(StructureError::DuplicateArg {
                name: arg.name.clone(),
            });
        }
    }

    let key_names: HashSet<&str> = keys.iter().map(String::as_str).collect();
    for arg in args {
        if key_names.contains(arg.name.as_str()) {
            return Err(StructureError::KeyArgCollision {
                name: arg.name.clone(),
            });
        }
    }

    Ok(())
}
