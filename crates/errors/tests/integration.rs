//! Integration tests for error types

#[cfg(test)]
mod tests {
    use plugpack_errors::*;

    #[test]
    fn test_error_conversion() {
        let pack_err = PackError::SourceNotFound {
            path: "a/plugin.py".into(),
        };
        let err: Error = pack_err.into();
        assert!(matches!(err, Error::Pack(PackError::SourceNotFound { .. })));
    }

    #[test]
    fn test_error_display_names_path() {
        let err = PackError::ArchiveWriteError {
            path: "/ro/out.tar".into(),
            message: "permission denied".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot write archive /ro/out.tar: permission denied"
        );
    }

    #[test]
    fn test_pattern_error_names_pattern() {
        let err: Error = PackError::PatternError {
            pattern: "[abc".into(),
            message: "unclosed character class".into(),
        }
        .into();
        assert!(err.user_message().contains("[abc"));
        assert_eq!(err.user_code(), Some("pack.pattern_error"));
        assert!(err.user_hint().is_some());
    }

    #[test]
    fn test_digest_mismatch_code() {
        let err: Error = PackError::DigestMismatch {
            path: "plugin.tar".into(),
            expected: "00".into(),
            actual: "ff".into(),
        }
        .into();
        assert_eq!(err.user_code(), Some("pack.digest_mismatch"));
        assert!(err.user_message().contains("expected 00, got ff"));
    }

    #[test]
    fn test_error_clone() {
        let err = ManifestError::DuplicateDestination {
            destination: "plugin.py".into(),
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let storage_err: StorageError = io_err.into();
        assert!(matches!(storage_err, StorageError::IoError { .. }));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let storage_err = StorageError::from_io_with_path(&io_err, std::path::Path::new("/x"));
        assert!(matches!(storage_err, StorageError::PermissionDenied { .. }));
    }

    #[test]
    fn test_io_with_path_message() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::io_with_path(&io_err, "/tmp/x");
        assert_eq!(err.user_message(), "/tmp/x: missing");
        assert_eq!(err.user_code(), Some("error.io"));
    }
}
