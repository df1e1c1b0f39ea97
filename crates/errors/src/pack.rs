//! Staging and archive error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PackError {
    #[error("source not found: {path}")]
    SourceNotFound { path: String },

    #[error("invalid exclusion pattern '{pattern}': {message}")]
    PatternError { pattern: String, message: String },

    #[error("cannot write archive {path}: {message}")]
    ArchiveWriteError { path: String, message: String },

    #[error("cannot read archive {path}: {message}")]
    ArchiveReadError { path: String, message: String },

    #[error("staging failed at {path}: {message}")]
    StagingFailed { path: String, message: String },

    #[error("digest mismatch for {path}: expected {expected}, got {actual}")]
    DigestMismatch {
        path: String,
        expected: String,
        actual: String,
    },
}

impl UserFacingError for PackError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::SourceNotFound { .. } => {
                Some("Check the manifest source paths; relative paths resolve against the manifest file.")
            }
            Self::PatternError { .. } => {
                Some("Exclusion patterns use glob syntax: *, ?, [abc], {a,b} and **.")
            }
            Self::ArchiveWriteError { .. } => {
                Some("Ensure the output directory exists, is writable and has free space.")
            }
            Self::StagingFailed { .. } => {
                Some("Check permissions on the staging directory or pass --clean to start fresh.")
            }
            Self::DigestMismatch { .. } => {
                Some("The archive differs from the expected build; rebuild it from the same inputs.")
            }
            Self::ArchiveReadError { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::SourceNotFound { .. } => "pack.source_not_found",
            Self::PatternError { .. } => "pack.pattern_error",
            Self::ArchiveWriteError { .. } => "pack.archive_write_error",
            Self::ArchiveReadError { .. } => "pack.archive_read_error",
            Self::StagingFailed { .. } => "pack.staging_failed",
            Self::DigestMismatch { .. } => "pack.digest_mismatch",
        };
        Some(code)
    }
}
