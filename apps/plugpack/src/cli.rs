//! Command line interface definition

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// plugpack - stage plugin sources and build reproducible archives
#[derive(Parser)]
#[command(name = "plugpack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stage plugin sources and build reproducible tar archives")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Stage manifest entries and write a tar archive
    #[command(alias = "pack")]
    Package {
        /// Manifest file (TOML) or inline list `src=dst,src2=dst2`
        #[arg(long, value_name = "FILE_OR_LIST")]
        manifest: String,

        /// Glob pattern to leave out of the archive (repeatable)
        #[arg(long = "exclude", value_name = "PATTERN")]
        excludes: Vec<String>,

        /// Staging directory
        #[arg(long, value_name = "DIR")]
        staging: PathBuf,

        /// Archive to write; replaced if it exists
        #[arg(long, value_name = "PATH")]
        out: PathBuf,

        /// Empty the staging directory before copying
        #[arg(long)]
        clean: bool,

        /// Ignore the configured default exclusion patterns
        #[arg(long)]
        no_default_excludes: bool,

        /// Header mtime for archive entries (seconds since the epoch)
        #[arg(long, value_name = "SECS")]
        timestamp: Option<u64>,
    },

    /// List the members and digest of an archive
    Inspect {
        /// Archive to read
        archive: PathBuf,

        /// Fail unless the archive's BLAKE3 digest equals this hex string
        #[arg(long, value_name = "HEX")]
        expect: Option<String>,
    },
}

/// Color output choice
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    Always,
    Auto,
    Never,
}
