//! Manifest error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ManifestError {
    #[error("manifest not found: {path}")]
    NotFound { path: String },

    #[error("failed to parse manifest {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("manifest has no entries")]
    Empty,

    #[error("invalid manifest entry '{entry}': {reason}")]
    InvalidEntry { entry: String, reason: String },

    #[error("invalid destination '{destination}': {reason}")]
    InvalidDestination { destination: String, reason: String },

    #[error("duplicate destination: {destination}")]
    DuplicateDestination { destination: String },
}

impl UserFacingError for ManifestError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ParseError { .. } => {
                Some("Manifest files are TOML with one [[entry]] table per source.")
            }
            Self::InvalidEntry { .. } => {
                Some("Inline manifests are comma-separated `source=destination` items.")
            }
            Self::InvalidDestination { .. } => {
                Some("Destinations must be relative paths inside the staging root.")
            }
            Self::DuplicateDestination { .. } => {
                Some("Give each manifest entry its own destination.")
            }
            Self::Empty => Some("Add at least one entry to the manifest."),
            Self::NotFound { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotFound { .. } => "manifest.not_found",
            Self::ParseError { .. } => "manifest.parse_error",
            Self::Empty => "manifest.empty",
            Self::InvalidEntry { .. } => "manifest.invalid_entry",
            Self::InvalidDestination { .. } => "manifest.invalid_destination",
            Self::DuplicateDestination { .. } => "manifest.duplicate_destination",
        };
        Some(code)
    }
}
