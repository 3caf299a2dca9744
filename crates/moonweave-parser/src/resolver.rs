//! Fragment lookup, caching, and cycle detection.
//!
//! A [`Resolver`] drives one resolution session: it looks names up in a
//! shared [`FragmentCache`], reads raw text through a caller-supplied
//! [`FragmentSource`] on a miss, and hands the text to the scanner, which
//! recurses back into the resolver for every `%include`. The chain of names
//! currently being parsed travels along as the ancestor path; revisiting one
//! of them is a cycle.
//!
//! The cache is written eagerly as each nested fragment finishes
//! constructing. A failing parse leaves the already-cached fragments in
//! place; there is no rollback.

use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, trace};

use moonweave_core::Fragment;

use crate::error::ParseError;
use crate::parser::parse_regions;

/// Raw-text lookup keyed by canonical fragment name.
///
/// Implementations must fail with [`ParseError::NotFound`] carrying the
/// name and the attempted location rather than a generic I/O error.
pub trait FragmentSource {
    /// Read the raw text behind a canonical fragment name.
    fn read(&self, name: &str) -> Result<String, ParseError>;
}

/// An in-memory fragment source, useful for tests and embedded fragments.
#[derive(Debug, Default)]
pub struct MemorySource {
    fragments: IndexMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register fragment text under a canonical name.
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) -> &mut Self {
        self.fragments.insert(name.into(), content.into());
        self
    }
}

impl FragmentSource for MemorySource {
    fn read(&self, name: &str) -> Result<String, ParseError> {
        self.fragments
            .get(name)
            .cloned()
            .ok_or_else(|| ParseError::NotFound {
                name: name.to_string(),
                location: "<memory>".to_string(),
            })
    }
}

/// Name-keyed store of parsed fragments.
///
/// Guarantees at most one parse per name within a resolution session: a hit
/// returns the existing fragment by reference. Not synchronized; concurrent
/// use requires external locking.
#[derive(Debug, Default)]
pub struct FragmentCache {
    entries: IndexMap<String, Arc<Fragment>>,
}

impl FragmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached fragment for a name, if any.
    pub fn get(&self, name: &str) -> Option<Arc<Fragment>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Store a fragment under its own name, replacing any previous entry.
    pub fn insert(&mut self, fragment: Arc<Fragment>) {
        self.entries
            .insert(fragment.name().to_string(), fragment);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// One resolution session over a source and a shared cache.
pub struct Resolver<'a, S: FragmentSource + ?Sized> {
    source: &'a S,
    cache: &'a mut FragmentCache,
}

impl<'a, S: FragmentSource + ?Sized> Resolver<'a, S> {
    pub fn new(source: &'a S, cache: &'a mut FragmentCache) -> Self {
        Self { source, cache }
    }

    /// Resolve a fragment by canonical name.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] for missing sources, cyclic inclusion chains,
    /// malformed directives, and structural violations.
    pub fn resolve(&mut self, name: &str) -> Result<Arc<Fragment>, ParseError> {
        self.resolve_with_ancestors(name, &mut Vec::new())
    }

    /// Parse a fragment from text already in hand.
    ///
    /// Includes are still resolved through the source and cache; the parsed
    /// fragment is cached under `name`, replacing any previous entry.
    pub fn parse(&mut self, name: &str, content: &str) -> Result<Arc<Fragment>, ParseError> {
        self.parse_with_ancestors(name, content, &mut Vec::new())
    }

    pub(crate) fn resolve_with_ancestors(
        &mut self,
        name: &str,
        ancestors: &mut Vec<String>,
    ) -> Result<Arc<Fragment>, ParseError> {
        if let Some(fragment) = self.cache.get(name) {
            trace!(name = name; "Fragment cache hit");
            return Ok(fragment);
        }

        let content = self.source.read(name)?;
        self.parse_with_ancestors(name, &content, ancestors)
    }

    fn parse_with_ancestors(
        &mut self,
        name: &str,
        content: &str,
        ancestors: &mut Vec<String>,
    ) -> Result<Arc<Fragment>, ParseError> {
        if ancestors.iter().any(|ancestor| ancestor == name) {
            return Err(ParseError::Cycle {
                cycle: extract_cycle(ancestors, name),
            });
        }

        ancestors.push(name.to_string());
        let regions = parse_regions(self, name, content, ancestors);
        ancestors.pop();

        let fragment = Fragment::new(name, regions?)?;
        self.cache.insert(Arc::clone(&fragment));
        debug!(name = name, cached = self.cache.len(); "Parsed fragment");

        Ok(fragment)
    }
}

/// The ancestor-path suffix starting at the revisited name, plus the name
/// again.
fn extract_cycle(ancestors: &[String], name: &str) -> Vec<String> {
    let start = ancestors
        .iter()
        .position(|ancestor| ancestor == name)
        .unwrap_or(0);

    let mut cycle: Vec<String> = ancestors[start..].to_vec();
    cycle.push(name.to_string());
    cycle
}
