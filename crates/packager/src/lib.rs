#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Staging and packaging for plugpack
//!
//! The pipeline is a single forward pass: copy manifest entries into a
//! staging directory, filter the staged tree through the exclusion set,
//! and write a reproducible tar archive of what remains.

mod archive;
mod exclude;
mod stage;

pub use archive::{
    get_deterministic_timestamp, list_archive, pack, pack_with_timestamp, PackOutcome,
};
pub use exclude::ExclusionSet;
pub use stage::{clear_staging, stage, StageSummary};

use plugpack_errors::Error;
use plugpack_hash::Hash;
use plugpack_manifest::Manifest;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Knobs for a packaging run
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// mtime written into every archive header
    pub timestamp: u64,
    /// Empty the staging root before copying
    pub clean_staging: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            timestamp: get_deterministic_timestamp(),
            clean_staging: false,
        }
    }
}

/// Summary of one packaging run
#[derive(Debug, Clone, Serialize)]
pub struct PackReport {
    pub staging_root: PathBuf,
    pub archive: PathBuf,
    pub entries_staged: usize,
    pub files_copied: u64,
    pub members: Vec<String>,
    pub excluded: Vec<String>,
    pub size: u64,
    pub blake3: Hash,
}

/// Stage `manifest` into `staging_root` and archive it to `archive_path`
///
/// # Errors
///
/// Returns the first `PatternError`, `SourceNotFound` or
/// `ArchiveWriteError` encountered. The staging directory is left in place
/// on failure.
pub fn run<S: AsRef<str>>(
    manifest: &Manifest,
    exclusions: &[S],
    staging_root: &Path,
    archive_path: &Path,
) -> Result<PackReport, Error> {
    run_with_options(
        manifest,
        exclusions,
        staging_root,
        archive_path,
        &PackOptions::default(),
    )
}

/// [`run`] with explicit options
///
/// # Errors
///
/// See [`run`].
pub fn run_with_options<S: AsRef<str>>(
    manifest: &Manifest,
    exclusions: &[S],
    staging_root: &Path,
    archive_path: &Path,
    options: &PackOptions,
) -> Result<PackReport, Error> {
    // Compile first so a bad pattern aborts before anything is copied
    let exclusions = ExclusionSet::new(exclusions)?;

    if options.clean_staging {
        clear_staging(staging_root)?;
    }
    let summary = stage(manifest, staging_root)?;
    let outcome = pack_with_timestamp(staging_root, &exclusions, archive_path, options.timestamp)?;
    let blake3 = Hash::hash_file(archive_path)?;

    info!(
        archive = %archive_path.display(),
        blake3 = %blake3,
        "package complete"
    );

    Ok(PackReport {
        staging_root: staging_root.to_path_buf(),
        archive: archive_path.to_path_buf(),
        entries_staged: summary.entries,
        files_copied: summary.files,
        members: outcome.members,
        excluded: outcome.excluded,
        size: outcome.size,
        blake3,
    })
}
