//! Deterministic TAR archive creation for reproducible packages

use crate::exclude::{to_slash, ExclusionSet};
use plugpack_errors::{Error, PackError};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Default deterministic timestamp (Unix epoch) for reproducible archives
const DETERMINISTIC_TIMESTAMP: u64 = 0;

/// Environment variable for `SOURCE_DATE_EPOCH` (standard for reproducible builds)
const SOURCE_DATE_EPOCH_VAR: &str = "SOURCE_DATE_EPOCH";

/// Result of writing an archive
#[derive(Debug, Clone, Default)]
pub struct PackOutcome {
    /// Member names in archive order; directories end with `/`
    pub members: Vec<String>,
    /// Staged paths left out because they matched an exclusion pattern
    pub excluded: Vec<String>,
    /// Size of the archive in bytes
    pub size: u64,
}

/// Archive the staged tree at `staging_root` into `archive_path`
///
/// Uses the timestamp from `SOURCE_DATE_EPOCH`, or the epoch if unset.
///
/// # Errors
///
/// See [`pack_with_timestamp`].
pub fn pack(
    staging_root: &Path,
    exclusions: &ExclusionSet,
    archive_path: &Path,
) -> Result<PackOutcome, Error> {
    pack_with_timestamp(
        staging_root,
        exclusions,
        archive_path,
        get_deterministic_timestamp(),
    )
}

/// Archive the staged tree with an explicit header timestamp
///
/// Entries are visited in lexicographic file-name order at every level.
/// An excluded directory is pruned along with everything beneath it. The
/// archive is written to a temporary file beside `archive_path` and renamed
/// into place once complete; any stale archive at that path is removed
/// first.
///
/// # Errors
///
/// Returns `SourceNotFound` if the staging root is missing and
/// `ArchiveWriteError` if the archive cannot be created, written or moved
/// into place.
pub fn pack_with_timestamp(
    staging_root: &Path,
    exclusions: &ExclusionSet,
    archive_path: &Path,
    timestamp: u64,
) -> Result<PackOutcome, Error> {
    if !staging_root.is_dir() {
        return Err(PackError::SourceNotFound {
            path: staging_root.display().to_string(),
        }
        .into());
    }
    let root = staging_root
        .canonicalize()
        .map_err(|e| Error::io_with_path(&e, staging_root))?;

    let (out_dir, file_name) = split_archive_path(archive_path)?;
    let out_dir = out_dir
        .canonicalize()
        .map_err(|e| write_error(archive_path, &e))?;
    let final_path = out_dir.join(file_name);
    if final_path.is_dir() {
        return Err(PackError::ArchiveWriteError {
            path: archive_path.display().to_string(),
            message: "path is a directory".to_string(),
        }
        .into());
    }

    let temp = NamedTempFile::new_in(&out_dir).map_err(|e| write_error(archive_path, &e))?;
    let skip = [final_path.clone(), temp.path().to_path_buf()];

    info!(
        staging = %root.display(),
        archive = %final_path.display(),
        patterns = exclusions.patterns().len(),
        "writing archive"
    );

    let mut outcome = PackOutcome::default();
    {
        let writer = BufWriter::new(temp.as_file());
        let mut tar_builder = tar::Builder::new(writer);
        tar_builder.follow_symlinks(false);

        let excluded = &mut outcome.excluded;
        let walker = WalkDir::new(&root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| keep_entry(entry, &root, &skip, exclusions, excluded));

        let mut members = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| PackError::ArchiveWriteError {
                path: archive_path.display().to_string(),
                message: e.to_string(),
            })?;
            let relative = entry
                .path()
                .strip_prefix(&root)
                .map_err(|e| Error::internal(format!("walk escaped staging root: {e}")))?;
            let name = to_slash(relative);
            if let Some(member) = append_entry(&mut tar_builder, &entry, &name, timestamp)
                .map_err(|e| write_error(archive_path, &e))?
            {
                debug!(member = %member, "archived");
                members.push(member);
            }
        }

        let mut writer = tar_builder
            .into_inner()
            .map_err(|e| write_error(archive_path, &e))?;
        writer.flush().map_err(|e| write_error(archive_path, &e))?;
        outcome.members = members;
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| write_error(archive_path, &e))?;
    set_archive_permissions(temp.path()).map_err(|e| write_error(archive_path, &e))?;

    if final_path.exists() {
        fs::remove_file(&final_path).map_err(|e| write_error(archive_path, &e))?;
        debug!(archive = %final_path.display(), "removed stale archive");
    }
    let file = temp
        .persist(&final_path)
        .map_err(|e| write_error(archive_path, &e.error))?;
    outcome.size = file
        .metadata()
        .map_err(|e| write_error(archive_path, &e))?
        .len();

    info!(
        members = outcome.members.len(),
        excluded = outcome.excluded.len(),
        size = outcome.size,
        "archive written"
    );
    Ok(outcome)
}

/// List the member names stored in a tar archive, in archive order
///
/// # Errors
///
/// Returns `ArchiveReadError` if the archive cannot be opened or parsed.
pub fn list_archive(archive_path: &Path) -> Result<Vec<String>, Error> {
    let read_error = |e: &std::io::Error| -> Error {
        PackError::ArchiveReadError {
            path: archive_path.display().to_string(),
            message: e.to_string(),
        }
        .into()
    };

    let file = File::open(archive_path).map_err(|e| read_error(&e))?;
    let mut archive = tar::Archive::new(file);
    let mut members = Vec::new();
    for entry in archive.entries().map_err(|e| read_error(&e))? {
        let entry = entry.map_err(|e| read_error(&e))?;
        members.push(String::from_utf8_lossy(&entry.path_bytes()).into_owned());
    }
    Ok(members)
}

/// Get deterministic timestamp for reproducible archives
/// Uses `SOURCE_DATE_EPOCH` if set, otherwise uses epoch (0)
#[must_use]
pub fn get_deterministic_timestamp() -> u64 {
    std::env::var(SOURCE_DATE_EPOCH_VAR)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(DETERMINISTIC_TIMESTAMP)
}

fn keep_entry(
    entry: &DirEntry,
    root: &Path,
    skip: &[PathBuf],
    exclusions: &ExclusionSet,
    excluded: &mut Vec<String>,
) -> bool {
    // filter_entry still sees the root even with min_depth(1)
    if entry.depth() == 0 {
        return true;
    }
    if skip.iter().any(|p| p == entry.path()) {
        return false;
    }
    let Ok(relative) = entry.path().strip_prefix(root) else {
        return true;
    };
    if exclusions.is_excluded(relative) {
        debug!(path = %relative.display(), "excluded");
        excluded.push(to_slash(relative));
        return false;
    }
    true
}

/// Append one staged entry with fully normalised metadata
///
/// Returns the member name, or `None` for skipped special files.
fn append_entry<W: Write>(
    tar_builder: &mut tar::Builder<W>,
    entry: &DirEntry,
    name: &str,
    timestamp: u64,
) -> std::io::Result<Option<String>> {
    let metadata = entry.path().symlink_metadata()?;
    let file_type = metadata.file_type();

    if file_type.is_dir() {
        let mut header = normalized_header(tar::EntryType::Directory, timestamp)?;
        header.set_size(0);
        header.set_mode(normalize_file_permissions(&metadata));
        header.set_cksum();

        let member = format!("{name}/");
        tar_builder.append_data(&mut header, &member, std::io::empty())?;
        Ok(Some(member))
    } else if file_type.is_file() {
        let mut file = File::open(entry.path())?;
        let mut header = normalized_header(tar::EntryType::Regular, timestamp)?;
        header.set_size(metadata.len());
        header.set_mode(normalize_file_permissions(&metadata));
        header.set_cksum();

        tar_builder.append_data(&mut header, name, &mut file)?;
        Ok(Some(name.to_string()))
    } else if file_type.is_symlink() {
        let target = fs::read_link(entry.path())?;
        let mut header = normalized_header(tar::EntryType::Symlink, timestamp)?;
        header.set_size(0);
        header.set_mode(0o777); // Standard symlink permissions
        header.set_cksum();

        tar_builder.append_link(&mut header, name, &target)?;
        Ok(Some(name.to_string()))
    } else {
        // Device nodes, fifos and sockets are never archived
        Ok(None)
    }
}

fn normalized_header(entry_type: tar::EntryType, timestamp: u64) -> std::io::Result<tar::Header> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mtime(timestamp);
    header.set_uid(0);
    header.set_gid(0);
    header.set_username("root")?;
    header.set_groupname("root")?;
    header.set_device_major(0)?;
    header.set_device_minor(0)?;
    Ok(header)
}

/// Normalize file permissions for deterministic output
/// Ensures consistent permissions across different filesystems and umask settings
#[cfg(unix)]
fn normalize_file_permissions(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    if metadata.is_dir() || metadata.permissions().mode() & 0o111 != 0 {
        0o755
    } else {
        0o644
    }
}

#[cfg(not(unix))]
fn normalize_file_permissions(metadata: &fs::Metadata) -> u32 {
    if metadata.is_dir() {
        0o755
    } else {
        0o644
    }
}

#[cfg(unix)]
fn set_archive_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_archive_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn split_archive_path(archive_path: &Path) -> Result<(PathBuf, std::ffi::OsString), Error> {
    let file_name = archive_path
        .file_name()
        .ok_or_else(|| PackError::ArchiveWriteError {
            path: archive_path.display().to_string(),
            message: "archive path has no file name".to_string(),
        })?
        .to_owned();
    let dir = match archive_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, file_name))
}

fn write_error(archive_path: &Path, err: &std::io::Error) -> Error {
    PackError::ArchiveWriteError {
        path: archive_path.display().to_string(),
        message: err.to_string(),
    }
    .into()
}
