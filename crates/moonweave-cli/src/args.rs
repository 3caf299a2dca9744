//! Command-line argument definitions for the Moonweave CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control the fragment to flatten, the search
//! path, output selection, and logging verbosity.

use clap::Parser;

/// Command-line arguments for the Moonweave fragment flattener
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Canonical name of the fragment to flatten (no `.lua` extension)
    #[arg(help = "Name of the fragment to flatten")]
    pub name: String,

    /// Directory to resolve fragment names under
    #[arg(short, long)]
    pub path: Option<String>,

    /// Path to the output file; defaults to standard output
    #[arg(short, long)]
    pub output: Option<String>,

    /// Print the traceback for this flattened line instead of the program
    #[arg(short, long)]
    pub trace: Option<usize>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}
