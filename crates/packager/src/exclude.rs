//! Glob exclusion matching against staged relative paths

use globset::{Glob, GlobSet, GlobSetBuilder};
use plugpack_errors::{Error, PackError};
use std::path::Path;

/// Compiled set of exclusion patterns
///
/// A path is tested both in its plain relative form (`tests/x.py`) and in
/// its tar member form (`./tests/x.py`), so `*/tests` drops a top-level
/// `tests` directory the same way `tar --exclude` would.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl ExclusionSet {
    /// Compile patterns into a matcher
    ///
    /// # Errors
    ///
    /// Returns `PatternError` naming the first pattern that fails to compile.
    pub fn new<I, S>(patterns: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern).map_err(|e| PackError::PatternError {
                pattern: pattern.to_string(),
                message: e.kind().to_string(),
            })?;
            builder.add(glob);
            kept.push(pattern.to_string());
        }

        let set = builder.build().map_err(|e| PackError::PatternError {
            pattern: e.glob().unwrap_or_default().to_string(),
            message: e.kind().to_string(),
        })?;

        Ok(Self {
            patterns: kept,
            set,
        })
    }

    /// A set that excludes nothing
    #[must_use]
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    /// Whether `relative` (a path below the staging root) is excluded
    #[must_use]
    pub fn is_excluded(&self, relative: &Path) -> bool {
        if self.set.is_empty() {
            return false;
        }
        let plain = to_slash(relative);
        self.set.is_match(&plain) || self.set.is_match(format!("./{plain}"))
    }

    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Render a relative path with `/` separators regardless of platform
pub(crate) fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tar_style_pattern_matches_top_level_dir() {
        let set = ExclusionSet::new(["*/tests"]).unwrap();
        assert!(set.is_excluded(Path::new("tests")));
        assert!(set.is_excluded(Path::new("plugin/tests")));
        assert!(!set.is_excluded(Path::new("plugin.py")));
        assert!(!set.is_excluded(Path::new("tests_helper.py")));
    }

    #[test]
    fn test_star_crosses_separators() {
        let set = ExclusionSet::new(["*.pyc"]).unwrap();
        assert!(set.is_excluded(Path::new("mod.pyc")));
        assert!(set.is_excluded(Path::new("pkg/sub/mod.pyc")));
        assert!(!set.is_excluded(Path::new("pkg/mod.py")));
    }

    #[test]
    fn test_alternation_and_recursive() {
        let set = ExclusionSet::new(["**/{.vscode,.idea}"]).unwrap();
        assert!(set.is_excluded(Path::new(".vscode")));
        assert!(set.is_excluded(Path::new("nested/.idea")));
        assert!(!set.is_excluded(Path::new("src")));
    }

    #[test]
    fn test_malformed_pattern_is_pattern_error() {
        let err = ExclusionSet::new(["*/ok", "[abc"]).unwrap_err();
        match err {
            Error::Pack(PackError::PatternError { pattern, .. }) => assert_eq!(pattern, "[abc"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_set_excludes_nothing() {
        let set = ExclusionSet::empty();
        assert!(set.is_empty());
        assert!(!set.is_excluded(Path::new("anything")));
    }
}
