//! CLI argument parsing for Avivar

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::watch::DEFAULT_WATCH_PORT;

#[derive(Parser, Debug)]
#[command(name = "avivar")]
#[command(version)]
#[command(about = "Source-aware viewer for CPython's specializing adaptive interpreter", long_about = None)]
pub struct Cli {
    /// Enable debug logging to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a recorded trace and render per-file reports
    Run(RunArgs),
    /// Re-analyze continuously and stream changes to an analysis socket
    Watch(WatchArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Trace file recorded by the execution harness (.json or .msgpack)
    #[arg(long = "trace", value_name = "FILE")]
    pub trace: PathBuf,

    /// Target source files to analyze (default: every file in the trace)
    #[arg(short = 't', long = "targets", value_name = "PATH")]
    pub targets: Vec<PathBuf>,

    /// Emit JSON instead of HTML
    #[arg(long)]
    pub json: bool,

    /// Indent the JSON output
    #[arg(short = 'I', long, value_name = "N", requires = "json")]
    pub indent: Option<usize>,

    /// Use a red-blue color scheme
    #[arg(short = 'b', long, conflicts_with = "json")]
    pub blue: bool,

    /// Use a dark color scheme
    #[arg(short = 'd', long, conflicts_with = "json")]
    pub dark: bool,

    /// A directory to write reports to (rather than printing them)
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Trace file recorded by the execution harness (.json or .msgpack)
    #[arg(long = "trace", value_name = "FILE")]
    pub trace: PathBuf,

    /// Target source files to track (default: every file in the trace)
    #[arg(short = 't', long = "targets", value_name = "PATH")]
    pub targets: Vec<PathBuf>,

    /// Port for the analysis socket
    #[arg(short = 'p', long, value_name = "PORT", default_value_t = DEFAULT_WATCH_PORT)]
    pub port: u16,
}
