//! Integration tests for manifest crate

#[cfg(test)]
mod tests {
    use plugpack_errors::{Error, ManifestError};
    use plugpack_manifest::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_load_resolves_relative_to_manifest_dir() {
        let temp = tempdir().unwrap();
        let manifest_path = temp.path().join("plugin.toml");
        std::fs::write(
            &manifest_path,
            r#"
[[entry]]
source = "src/plugin.py"
destination = "plugin/plugin.py"
"#,
        )
        .unwrap();

        let manifest = Manifest::load(&manifest_path).unwrap();
        assert_eq!(
            manifest.entries()[0].source,
            temp.path().join("src/plugin.py")
        );
        assert_eq!(
            manifest.entries()[0].destination,
            PathBuf::from("plugin/plugin.py")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let temp = tempdir().unwrap();
        let err = Manifest::load(&temp.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, Error::Manifest(ManifestError::NotFound { .. })));
    }

    #[test]
    fn test_load_parse_error_names_file() {
        let temp = tempdir().unwrap();
        let manifest_path = temp.path().join("bad.toml");
        std::fs::write(&manifest_path, "[[entry]\nsource = ").unwrap();

        match Manifest::load(&manifest_path).unwrap_err() {
            Error::Manifest(ManifestError::ParseError { path, .. }) => {
                assert!(path.ends_with("bad.toml"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_empty_manifest() {
        let temp = tempdir().unwrap();
        let manifest_path = temp.path().join("empty.toml");
        std::fs::write(&manifest_path, "exclude = [\"*.pyc\"]\n").unwrap();

        let err = Manifest::load(&manifest_path).unwrap_err();
        assert!(matches!(err, Error::Manifest(ManifestError::Empty)));
    }

    #[test]
    fn test_from_arg_prefers_existing_file() {
        let temp = tempdir().unwrap();
        std::fs::write(
            temp.path().join("m.toml"),
            "[[entry]]\nsource = \"a.txt\"\n",
        )
        .unwrap();

        let from_file = Manifest::from_arg("m.toml", temp.path()).unwrap();
        assert_eq!(from_file.entries()[0].source, temp.path().join("a.txt"));

        let inline = Manifest::from_arg("a.txt=docs/a.txt", temp.path()).unwrap();
        assert_eq!(
            inline.entries()[0].destination,
            PathBuf::from("docs/a.txt")
        );
    }

    #[test]
    fn test_escaping_destination_rejected() {
        let err = Manifest::parse_inline("a.txt=../a.txt", std::path::Path::new("/w")).unwrap_err();
        assert!(matches!(
            err,
            Error::Manifest(ManifestError::InvalidDestination { .. })
        ));
    }
}
