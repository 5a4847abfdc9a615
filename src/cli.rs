//! Command-line arguments.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    Pretty,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "gofetch", version, about = "Vanity import-path redirector")]
pub struct Args {
    /// Path to the JSON config file.
    #[arg(long, env = "CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = TracingFormat::Pretty)]
    pub tracing: TracingFormat,
}
