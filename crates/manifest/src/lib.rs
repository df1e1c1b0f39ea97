#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Staging manifest handling for plugpack
//!
//! A manifest is an ordered list of source → destination copy instructions.
//! It is read either from a TOML file (`[[entry]]` tables plus an optional
//! `exclude` list) or from an inline, comma-separated `source=destination`
//! list given on the command line.

use plugpack_errors::{Error, ManifestError};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// A single copy instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// File or directory to copy
    pub source: PathBuf,
    /// Normalised path relative to the staging root
    pub destination: PathBuf,
}

impl ManifestEntry {
    /// Create an entry, normalising the destination
    ///
    /// # Errors
    ///
    /// Returns an error if the destination is empty, absolute, or escapes
    /// the staging root.
    pub fn new(source: impl Into<PathBuf>, destination: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self {
            source: source.into(),
            destination: normalize_destination(destination.as_ref())?,
        })
    }

    /// Create an entry whose destination is the source's file name
    ///
    /// # Errors
    ///
    /// Returns an error if the source has no file name component (`.`, `/`).
    pub fn from_source(source: impl Into<PathBuf>) -> Result<Self, Error> {
        let source = source.into();
        let name = source
            .file_name()
            .ok_or_else(|| ManifestError::InvalidEntry {
                entry: source.display().to_string(),
                reason: "source has no file name; give an explicit destination".to_string(),
            })?
            .to_owned();
        Self::new(source, name)
    }
}

/// Ordered set of copy instructions with unique destinations
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    excludes: Vec<String>,
}

/// On-disk manifest layout
#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default, rename = "entry")]
    entries: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    source: PathBuf,
    destination: Option<PathBuf>,
}

impl Manifest {
    /// Build a manifest from entries
    ///
    /// # Errors
    ///
    /// Returns an error if two entries share a destination.
    pub fn new(entries: Vec<ManifestEntry>) -> Result<Self, Error> {
        let manifest = Self {
            entries,
            excludes: Vec::new(),
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Attach exclusion patterns declared alongside the entries
    #[must_use]
    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Load a TOML manifest; relative sources resolve against its directory
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, has
    /// no entries, or violates destination rules.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|_| ManifestError::NotFound {
            path: path.display().to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let manifest = Self::from_toml_str(&contents, base).map_err(|e| match e {
            Error::Manifest(ManifestError::ParseError { message, .. }) => {
                ManifestError::ParseError {
                    path: path.display().to_string(),
                    message,
                }
                .into()
            }
            other => other,
        })?;
        debug!(
            path = %path.display(),
            entries = manifest.len(),
            "loaded manifest file"
        );
        Ok(manifest)
    }

    /// Parse TOML manifest contents
    ///
    /// # Errors
    ///
    /// Returns an error if the contents are not a valid manifest.
    pub fn from_toml_str(contents: &str, base: &Path) -> Result<Self, Error> {
        let file: ManifestFile = toml::from_str(contents).map_err(|e| ManifestError::ParseError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;

        let entries = file
            .entries
            .into_iter()
            .map(|raw| {
                let source = resolve(base, &raw.source);
                match raw.destination {
                    Some(dest) => ManifestEntry::new(source, dest),
                    None => ManifestEntry::from_source(source),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        if entries.is_empty() {
            return Err(ManifestError::Empty.into());
        }
        Ok(Self::new(entries)?.with_excludes(file.exclude))
    }

    /// Parse an inline `src=dst,src2=dst2` list
    ///
    /// An item without `=` keeps the source's file name as destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or an item is malformed.
    pub fn parse_inline(list: &str, base: &Path) -> Result<Self, Error> {
        let mut entries = Vec::new();
        for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let entry = match item.split_once('=') {
                Some((src, dst)) => {
                    let (src, dst) = (src.trim(), dst.trim());
                    if src.is_empty() || dst.is_empty() {
                        return Err(ManifestError::InvalidEntry {
                            entry: item.to_string(),
                            reason: "expected `source=destination`".to_string(),
                        }
                        .into());
                    }
                    ManifestEntry::new(resolve(base, Path::new(src)), dst)?
                }
                None => ManifestEntry::from_source(resolve(base, Path::new(item)))?,
            };
            entries.push(entry);
        }

        if entries.is_empty() {
            return Err(ManifestError::Empty.into());
        }
        Self::new(entries)
    }

    /// Interpret a `--manifest` argument: an existing file is loaded,
    /// anything else is parsed as an inline list.
    ///
    /// # Errors
    ///
    /// Returns an error from [`Manifest::load`] or [`Manifest::parse_inline`].
    pub fn from_arg(arg: &str, base: &Path) -> Result<Self, Error> {
        let candidate = resolve(base, Path::new(arg));
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Self::parse_inline(arg, base)
        }
    }

    /// Check that destinations are well-formed and unique
    ///
    /// # Errors
    ///
    /// Returns the first offending destination.
    pub fn validate(&self) -> Result<(), Error> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            let normalized = normalize_destination(&entry.destination)?;
            if !seen.insert(normalized) {
                return Err(ManifestError::DuplicateDestination {
                    destination: entry.destination.display().to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    #[must_use]
    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManifestEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Reduce a destination to its plain relative form (`./a//b/` → `a/b`)
///
/// # Errors
///
/// Returns an error for empty, absolute, or `..`-containing destinations.
pub fn normalize_destination(destination: &Path) -> Result<PathBuf, ManifestError> {
    let invalid = |reason: &str| ManifestError::InvalidDestination {
        destination: destination.display().to_string(),
        reason: reason.to_string(),
    };

    let mut normalized = PathBuf::new();
    for component in destination.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err(invalid("must not contain `..`")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("must be a relative path"))
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(invalid("must name a path below the staging root"));
    }
    Ok(normalized)
}
