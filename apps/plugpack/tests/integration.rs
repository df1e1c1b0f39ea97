//! Integration tests for the plugpack CLI

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the binary with config and environment isolated from the host
fn plugpack(home: &Path, args: &[&str]) -> Output {
    plugpack_with_env(home, &[], args)
}

fn plugpack_with_env(home: &Path, vars: &[(&str, &str)], args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_plugpack"))
        .args(args)
        .current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("PLUGPACK_EXCLUDE")
        .env_remove("PLUGPACK_CLEAN_STAGING")
        .env_remove("SOURCE_DATE_EPOCH")
        .env_remove("RUST_LOG")
        .envs(vars.iter().copied())
        .output()
        .expect("Failed to execute plugpack")
}

fn plugin_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("a/tests")).unwrap();
    fs::create_dir_all(root.join("a/__pycache__")).unwrap();
    fs::write(root.join("a/plugin.py"), "def register():\n    pass\n").unwrap();
    fs::write(root.join("a/tests/test_plugin.py"), "def test():\n    pass\n").unwrap();
    fs::write(root.join("a/__pycache__/plugin.cpython-312.pyc"), [0u8; 8]).unwrap();
    fs::write(root.join("metadata.txt"), "name=demo\n").unwrap();
    temp
}

fn members(stdout: &[u8]) -> Vec<String> {
    let report: serde_json::Value = serde_json::from_slice(stdout).expect("JSON report");
    report["members"]
        .as_array()
        .expect("members array")
        .iter()
        .map(|m| m.as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_cli_version() {
    let temp = TempDir::new().unwrap();
    let output = plugpack(temp.path(), &["--version"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("plugpack"));
}

#[test]
fn test_cli_help() {
    let temp = TempDir::new().unwrap();
    let output = plugpack(temp.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("package"));
    assert!(stdout.contains("inspect"));
}

#[test]
fn test_package_excludes_tests() {
    let project = plugin_project();
    let output = plugpack(
        project.path(),
        &[
            "--json",
            "package",
            "--manifest",
            "a/plugin.py=plugin.py,a/tests=tests",
            "--exclude",
            "*/tests",
            "--staging",
            "staging",
            "--out",
            "plugin.tar",
        ],
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(members(&output.stdout), vec!["plugin.py"]);
    assert!(project.path().join("plugin.tar").is_file());
}

#[test]
fn test_only_requested_patterns_exclude() {
    let project = plugin_project();
    let output = plugpack(
        project.path(),
        &[
            "--json",
            "package",
            "--manifest",
            "a=plugin",
            "--exclude",
            "*.log",
            "--staging",
            "staging",
            "--out",
            "plugin.tar",
        ],
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let all = members(&output.stdout);
    assert!(all.contains(&"plugin/tests/test_plugin.py".to_string()));
    assert!(all.contains(&"plugin/__pycache__/plugin.cpython-312.pyc".to_string()));
}

#[test]
fn test_configured_excludes_apply_unless_disabled() {
    let project = plugin_project();
    let vars = [("PLUGPACK_EXCLUDE", "*/tests,*/__pycache__")];
    let base = [
        "--json",
        "package",
        "--manifest",
        "a=plugin",
        "--staging",
        "staging",
        "--out",
        "plugin.tar",
    ];

    let output = plugpack_with_env(project.path(), &vars, &base);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        members(&output.stdout),
        vec!["plugin/", "plugin/plugin.py"]
    );

    let mut args = base.to_vec();
    args.push("--no-default-excludes");
    let output = plugpack_with_env(project.path(), &vars, &args);
    assert!(output.status.success());
    let all = members(&output.stdout);
    assert!(all.contains(&"plugin/tests/test_plugin.py".to_string()));
    assert!(all.contains(&"plugin/__pycache__/plugin.cpython-312.pyc".to_string()));
}

#[test]
fn test_manifest_file_with_excludes() {
    let project = plugin_project();
    fs::write(
        project.path().join("plugin.toml"),
        r#"
exclude = ["*.txt"]

[[entry]]
source = "a/plugin.py"
destination = "demo/plugin.py"

[[entry]]
source = "metadata.txt"
destination = "demo/metadata.txt"
"#,
    )
    .unwrap();

    let output = plugpack(
        project.path(),
        &[
            "--json",
            "package",
            "--manifest",
            "plugin.toml",
            "--staging",
            "staging",
            "--out",
            "demo.tar",
        ],
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(members(&output.stdout), vec!["demo/", "demo/plugin.py"]);
}

#[test]
fn test_existing_archive_overwritten_and_reproducible() {
    let project = plugin_project();
    let out = project.path().join("existing.tar");
    fs::write(&out, "stale archive").unwrap();
    let args = [
        "package",
        "--manifest",
        "a=plugin",
        "--staging",
        "staging",
        "--out",
        "existing.tar",
    ];

    assert!(plugpack(project.path(), &args).status.success());
    let first = fs::read(&out).unwrap();
    assert_ne!(first, b"stale archive");

    assert!(plugpack(project.path(), &args).status.success());
    assert_eq!(first, fs::read(&out).unwrap());
}

#[test]
fn test_missing_source_exits_one() {
    let project = plugin_project();
    let output = plugpack(
        project.path(),
        &[
            "package",
            "--manifest",
            "a/missing.py=missing.py",
            "--staging",
            "staging",
            "--out",
            "plugin.tar",
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing.py"));
    assert!(!project.path().join("plugin.tar").exists());
}

#[test]
fn test_bad_pattern_exits_one() {
    let project = plugin_project();
    let output = plugpack(
        project.path(),
        &[
            "package",
            "--manifest",
            "a/plugin.py",
            "--exclude",
            "[oops",
            "--staging",
            "staging",
            "--out",
            "plugin.tar",
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[oops"));
}

#[test]
fn test_unwritable_archive_path_exits_one() {
    let project = plugin_project();
    let output = plugpack(
        project.path(),
        &[
            "package",
            "--manifest",
            "a/plugin.py",
            "--staging",
            "staging",
            "--out",
            "no/such/dir/plugin.tar",
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no/such/dir/plugin.tar"));
}

#[test]
fn test_inspect_lists_members() {
    let project = plugin_project();
    let packaged = plugpack(
        project.path(),
        &[
            "package",
            "--manifest",
            "a/plugin.py,metadata.txt",
            "--staging",
            "staging",
            "--out",
            "plugin.tar",
        ],
    );
    assert!(packaged.status.success());

    let output = plugpack(project.path(), &["--json", "inspect", "plugin.tar"]);
    assert!(output.status.success());
    assert_eq!(members(&output.stdout), vec!["metadata.txt", "plugin.py"]);
}

#[test]
fn test_error_reported_once() {
    let project = plugin_project();
    let output = plugpack(
        project.path(),
        &[
            "package",
            "--manifest",
            "a/missing.py",
            "--staging",
            "staging",
            "--out",
            "plugin.tar",
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("source not found").count(), 1, "{stderr}");
}

#[test]
fn test_inspect_checks_expected_digest() {
    let project = plugin_project();
    let packaged = plugpack(
        project.path(),
        &[
            "--json",
            "package",
            "--manifest",
            "a/plugin.py",
            "--staging",
            "staging",
            "--out",
            "plugin.tar",
        ],
    );
    assert!(packaged.status.success());
    let report: serde_json::Value = serde_json::from_slice(&packaged.stdout).unwrap();
    let digest = report["blake3"].as_str().unwrap().to_string();

    let output = plugpack(
        project.path(),
        &["inspect", "plugin.tar", "--expect", &digest],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let wrong = "0".repeat(64);
    let output = plugpack(project.path(), &["inspect", "plugin.tar", "--expect", &wrong]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("digest mismatch"), "{stderr}");
    assert!(stderr.contains(&digest));
}
