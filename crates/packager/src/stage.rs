//! Copying manifest entries into a staging directory

use plugpack_errors::{Error, ManifestError, PackError};
use plugpack_manifest::{Manifest, ManifestEntry};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// What a staging pass copied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSummary {
    pub entries: usize,
    pub files: u64,
    pub bytes: u64,
}

/// Copy every manifest entry to `staging_root/destination`
///
/// Sources are checked up front so a missing one, or two entries that would
/// write the same staged path, leaves the staging tree untouched. Files
/// already in the staging root that no entry targets are left alone.
///
/// # Errors
///
/// Returns `SourceNotFound` for a missing source, `DuplicateDestination`
/// when entries overlap on a staged file and `StagingFailed` if the staging
/// tree cannot be written.
pub fn stage(manifest: &Manifest, staging_root: &Path) -> Result<StageSummary, Error> {
    let mut sources = Vec::with_capacity(manifest.len());
    for entry in manifest {
        let metadata = fs::metadata(&entry.source).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::from(PackError::SourceNotFound {
                    path: entry.source.display().to_string(),
                })
            } else {
                Error::io_with_path(&e, &entry.source)
            }
        })?;
        sources.push((entry, metadata.is_dir()));
    }

    let mut claimed = HashSet::new();
    for &(entry, is_dir) in &sources {
        for path in planned_paths(entry, is_dir)? {
            if !claimed.insert(path.clone()) {
                return Err(ManifestError::DuplicateDestination {
                    destination: path.display().to_string(),
                }
                .into());
            }
        }
    }

    fs::create_dir_all(staging_root).map_err(|e| staging_failed(staging_root, &e))?;
    let root = staging_root
        .canonicalize()
        .map_err(|e| staging_failed(staging_root, &e))?;

    info!(
        staging = %root.display(),
        entries = manifest.len(),
        "staging manifest entries"
    );

    let mut summary = StageSummary::default();
    for (entry, is_dir) in sources {
        let target = root.join(&entry.destination);
        if is_dir {
            ensure_not_nested(entry, &root)?;
            copy_tree(&entry.source, &target, &mut summary)?;
        } else {
            copy_file(&entry.source, &target, &mut summary)?;
        }
        summary.entries += 1;
        debug!(
            source = %entry.source.display(),
            destination = %entry.destination.display(),
            "staged entry"
        );
    }

    info!(
        files = summary.files,
        bytes = summary.bytes,
        "staging complete"
    );
    Ok(summary)
}

/// Remove everything under `staging_root`, leaving an empty directory
///
/// # Errors
///
/// Returns `StagingFailed` if the root is a filesystem root or cannot be
/// removed and recreated.
pub fn clear_staging(staging_root: &Path) -> Result<(), Error> {
    if staging_root.exists() {
        let resolved = staging_root
            .canonicalize()
            .map_err(|e| staging_failed(staging_root, &e))?;
        if resolved.parent().is_none() {
            return Err(PackError::StagingFailed {
                path: resolved.display().to_string(),
                message: "refusing to clear a filesystem root".to_string(),
            }
            .into());
        }
        info!(staging = %resolved.display(), "clearing staging directory");
        fs::remove_dir_all(&resolved).map_err(|e| staging_failed(&resolved, &e))?;
    }
    fs::create_dir_all(staging_root).map_err(|e| staging_failed(staging_root, &e))?;
    Ok(())
}

// Non-directory paths, relative to the staging root, that an entry will write
fn planned_paths(entry: &ManifestEntry, is_dir: bool) -> Result<Vec<PathBuf>, Error> {
    if !is_dir {
        return Ok(vec![entry.destination.clone()]);
    }
    let mut paths = Vec::new();
    for item in WalkDir::new(&entry.source).follow_links(false) {
        let item = item.map_err(|e| walk_failed(&entry.source, &e))?;
        if item.file_type().is_dir() {
            continue;
        }
        let relative = item
            .path()
            .strip_prefix(&entry.source)
            .map_err(|e| Error::internal(format!("walk escaped {}: {e}", entry.source.display())))?;
        paths.push(entry.destination.join(relative));
    }
    Ok(paths)
}

// A staging root inside a copied directory would recurse forever.
fn ensure_not_nested(entry: &ManifestEntry, root: &Path) -> Result<(), Error> {
    let source = entry
        .source
        .canonicalize()
        .map_err(|e| Error::io_with_path(&e, &entry.source))?;
    if root.starts_with(&source) {
        return Err(PackError::StagingFailed {
            path: root.display().to_string(),
            message: format!("staging root lies inside source {}", source.display()),
        }
        .into());
    }
    Ok(())
}

fn copy_file(source: &Path, target: &Path, summary: &mut StageSummary) -> Result<(), Error> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| staging_failed(parent, &e))?;
    }
    // a read-only copy left by an earlier run cannot be opened for writing
    if let Ok(existing) = fs::symlink_metadata(target) {
        if !existing.is_dir() {
            fs::remove_file(target).map_err(|e| staging_failed(target, &e))?;
        }
    }
    let bytes = fs::copy(source, target).map_err(|e| staging_failed(target, &e))?;
    summary.files += 1;
    summary.bytes += bytes;
    Ok(())
}

fn copy_tree(source: &Path, target: &Path, summary: &mut StageSummary) -> Result<(), Error> {
    for entry in WalkDir::new(source).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_failed(source, &e))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| Error::internal(format!("walk escaped {}: {e}", source.display())))?;
        let dest = target.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&dest).map_err(|e| staging_failed(&dest, &e))?;
        } else if file_type.is_file() {
            copy_file(entry.path(), &dest, summary)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &dest)?;
        } else {
            warn!(path = %entry.path().display(), "skipping special file");
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, dest: &Path) -> Result<(), Error> {
    let link_target: PathBuf = fs::read_link(source).map_err(|e| Error::io_with_path(&e, source))?;
    if fs::symlink_metadata(dest).is_ok() {
        fs::remove_file(dest).map_err(|e| staging_failed(dest, &e))?;
    }
    std::os::unix::fs::symlink(&link_target, dest).map_err(|e| staging_failed(dest, &e))?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, _dest: &Path) -> Result<(), Error> {
    warn!(path = %source.display(), "skipping symlink on this platform");
    Ok(())
}

fn walk_failed(source: &Path, err: &walkdir::Error) -> Error {
    PackError::StagingFailed {
        path: err.path().unwrap_or(source).display().to_string(),
        message: err.to_string(),
    }
    .into()
}

fn staging_failed(path: &Path, err: &std::io::Error) -> Error {
    PackError::StagingFailed {
        path: path.display().to_string(),
        message: err.to_string(),
    }
    .into()
}
