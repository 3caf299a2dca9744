//! Filesystem fragment source and directory loading.
//!
//! Fragments live on disk as `<root>/<name>.lua`, where `<name>` is the
//! canonical slash-separated fragment name. A missing file surfaces as the
//! distinguishable not-found parse error carrying the name and the attempted
//! path, never as a bare I/O error.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, info};

use moonweave_core::Fragment;
use moonweave_parser::{FragmentCache, FragmentSource, ParseError, resolve};

use crate::error::MoonweaveError;

/// A fragment source rooted at a directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory fragment names resolve under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The on-disk path behind a canonical fragment name.
    fn file_path(&self, name: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in name.split('/') {
            path.push(segment);
        }
        path.set_extension("lua");
        path
    }
}

impl FragmentSource for DirSource {
    fn read(&self, name: &str) -> Result<String, ParseError> {
        let path = self.file_path(name);

        fs::read_to_string(&path).map_err(|_| ParseError::NotFound {
            name: name.to_string(),
            location: path.display().to_string(),
        })
    }
}

/// Load a fragment by name from a directory root.
///
/// A cache hit skips the filesystem entirely; every transitively included
/// fragment is cached as it completes.
///
/// # Errors
///
/// Returns [`MoonweaveError::Parse`] for missing files, cycles, malformed
/// directives, and structural violations.
pub fn load_fragment(
    name: &str,
    root: impl Into<PathBuf>,
    cache: &mut FragmentCache,
) -> Result<Arc<Fragment>, MoonweaveError> {
    let source = DirSource::new(root);
    info!(name = name, root = source.root().display().to_string(); "Loading fragment");

    Ok(resolve(name, &source, cache)?)
}

/// Load every `.lua` fragment found under a directory root.
///
/// Walks the tree recursively; fragment names are the relative paths without
/// extension, slash-separated. Returns the loaded fragments keyed by name in
/// discovery order.
///
/// # Errors
///
/// Returns [`MoonweaveError::Io`] when the directory walk fails and
/// [`MoonweaveError::Parse`] when any fragment fails to load. Fragments
/// loaded before the failure stay in the cache.
pub fn load_dir(
    root: impl AsRef<Path>,
    cache: &mut FragmentCache,
) -> Result<IndexMap<String, Arc<Fragment>>, MoonweaveError> {
    let root = root.as_ref();
    let source = DirSource::new(root);
    let mut names = Vec::new();
    collect_names(root, "", &mut names)?;

    debug!(root = root.display().to_string(), count = names.len(); "Discovered fragments");

    let mut fragments = IndexMap::new();
    for name in names {
        let fragment = resolve(&name, &source, cache)?;
        fragments.insert(name, fragment);
    }

    Ok(fragments)
}

fn collect_names(
    directory: &Path,
    prefix: &str,
    names: &mut Vec<String>,
) -> Result<(), MoonweaveError> {
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if path.is_dir() {
            let nested = join_name(prefix, file_name);
            collect_names(&path, &nested, names)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("lua") {
            let stem = file_name.trim_end_matches(".lua");
            names.push(join_name(prefix, stem));
        }
    }

    Ok(())
}

fn join_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
