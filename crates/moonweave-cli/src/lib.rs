//! CLI logic for the Moonweave fragment flattener.
//!
//! This module contains the core CLI logic for the Moonweave tool.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::fs;
use std::path::PathBuf;

use log::info;

use moonweave::{FragmentCache, MoonweaveError, diagnostics, load_fragment, render};

/// Run the Moonweave CLI application
///
/// Resolves the named fragment under the search path and either writes the
/// flattened program to the output (file or standard output), or, with
/// `--trace`, prints the traceback frames for a flattened line.
///
/// # Arguments
///
/// * `args` - Command-line arguments
///
/// # Errors
///
/// Returns `MoonweaveError` for:
/// - Configuration loading errors
/// - Missing fragments and parse errors
/// - Out-of-range trace lines
/// - File I/O errors
pub fn run(args: &Args) -> Result<(), MoonweaveError> {
    info!(name = args.name; "Processing fragment");

    // Load configuration
    let app_config = config::load_config(args.config.as_ref())?;

    // Command-line arguments win over configuration values
    let root = args
        .path
        .as_ref()
        .map(PathBuf::from)
        .or(app_config.path)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut cache = FragmentCache::new();
    let fragment = load_fragment(&args.name, &root, &mut cache)?;

    if let Some(line) = args.trace {
        for frame in diagnostics::trace(&fragment, line)? {
            println!(
                "Fragment \"{}\", line {}\n  {}",
                frame.fragment.name(),
                frame.line,
                frame.source.trim()
            );
        }
        return Ok(());
    }

    let program = render(&fragment);
    let output = args.output.as_ref().map(PathBuf::from).or(app_config.output);

    match output {
        Some(path) => {
            fs::write(&path, format!("{program}\n"))?;
            info!(output_file = path.display().to_string(); "Flattened program written");
        }
        None => println!("{program}"),
    }

    Ok(())
}
