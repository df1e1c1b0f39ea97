//! plugpack - stage plugin sources and build reproducible archives
//!
//! This is the CLI application; the packaging pipeline itself lives in the
//! packager crate.

mod cli;
mod display;
mod error;

use crate::cli::{Cli, ColorChoice, Commands};
use crate::display::{InspectReport, OperationResult, OutputRenderer};
use crate::error::CliError;
use clap::Parser;
use plugpack_config::Config;
use plugpack_errors::PackError;
use plugpack_hash::Hash;
use plugpack_manifest::Manifest;
use plugpack_packager::PackOptions;
use std::path::Path;
use std::process;
use tracing::{debug, info};

fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli) {
        debug!(error = ?e, "command failed");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Main application logic
fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting plugpack v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration with proper precedence:
    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref())?;

    // 2. Merge environment variables
    config.merge_env()?;

    let colors_enabled = match cli.global.color.unwrap_or(ColorChoice::Auto) {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stdout().features().colors_supported(),
    };
    let renderer = OutputRenderer::new(cli.global.json, colors_enabled);

    // 3. CLI flags are applied per command (highest precedence)
    let result = execute_command(cli.command, &config)?;
    renderer.render_result(&result)?;

    info!("Command completed successfully");
    Ok(())
}

/// Execute the specified command
fn execute_command(command: Commands, config: &Config) -> Result<OperationResult, CliError> {
    match command {
        Commands::Package {
            manifest,
            excludes,
            staging,
            out,
            clean,
            no_default_excludes,
            timestamp,
        } => {
            let cwd = std::env::current_dir()?;
            let manifest = Manifest::from_arg(&manifest, &cwd)?;

            let defaults: &[String] = if no_default_excludes {
                &[]
            } else {
                &config.pack.default_excludes
            };
            let patterns = merge_patterns([defaults, manifest.excludes(), excludes.as_slice()]);
            debug!(patterns = ?patterns, "exclusion patterns");

            let options = PackOptions {
                timestamp: timestamp.unwrap_or(config.pack.timestamp),
                clean_staging: clean || config.pack.clean_staging,
            };
            let report =
                plugpack_packager::run_with_options(&manifest, &patterns, &staging, &out, &options)?;
            Ok(OperationResult::Package(report))
        }

        Commands::Inspect { archive, expect } => {
            let expected = expect.as_deref().map(Hash::from_hex).transpose()?;
            Ok(OperationResult::Inspect(inspect(&archive, expected.as_ref())?))
        }
    }
}

fn inspect(archive: &Path, expected: Option<&Hash>) -> Result<InspectReport, CliError> {
    let members = plugpack_packager::list_archive(archive)?;
    let size = std::fs::metadata(archive)
        .map_err(|e| plugpack_errors::Error::io_with_path(&e, archive))?
        .len();
    let blake3 = Hash::hash_file(archive)?;
    if let Some(expected) = expected {
        if *expected != blake3 {
            return Err(plugpack_errors::Error::from(PackError::DigestMismatch {
                path: archive.display().to_string(),
                expected: expected.to_hex(),
                actual: blake3.to_hex(),
            })
            .into());
        }
    }
    Ok(InspectReport {
        archive: archive.to_path_buf(),
        members,
        size,
        blake3,
    })
}

/// Concatenate pattern sources in order, dropping repeats
fn merge_patterns<const N: usize>(sources: [&[String]; N]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for pattern in sources.into_iter().flatten() {
        if !merged.contains(pattern) {
            merged.push(pattern.clone());
        }
    }
    merged
}

/// Initialize tracing/logging
///
/// Logs always go to stderr so stdout stays clean for reports.
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    let filter = if debug_enabled {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,plugpack=debug"))
    } else {
        tracing_subscriber::EnvFilter::new("warn,plugpack=warn")
    };

    if json_mode && debug_enabled {
        // Structured logs alongside the JSON report
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else if json_mode {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter("error")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }
}
