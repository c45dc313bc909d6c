use std::process::{Command, Output};

use tempfile::tempdir;

fn delite_bench(args: &[&str]) -> Output {
    // Outside of any repository and without a configuration file.
    let dir = tempdir().unwrap();
    Command::new(env!("CARGO_BIN_EXE_delite-bench"))
        .args(args)
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .env_remove("XDG_CONFIG_HOME")
        .output()
        .expect("Failed to run delite-bench")
}

#[test]
fn unknown_app_fails_before_touching_git() {
    for args in [
        ["run", "-a", "nosuchapp"],
        ["report", "-c", "nosuchapp"],
    ] {
        let output = delite_bench(&args);
        assert!(!output.status.success(), "{:?} should fail", args);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains("Unknown application 'nosuchapp'"),
            "unexpected error output: {}",
            stderr
        );
    }
}

#[test]
fn unknown_dsl_is_rejected() {
    let output = delite_bench(&["inline", "--dsl", "OptiFoo", "--code", "missing.py"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown DSL 'OptiFoo'"));
}

#[test]
fn run_outside_repository_fails() {
    let output = delite_bench(&["run", "-a", "gda", "--skip-publish"]);
    assert!(!output.status.success());
}

#[test]
fn list_shows_registry() {
    let output = delite_bench(&["list"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("OptiML"));
    assert!(stdout.contains("OptiML/LogReg"));
    assert!(stdout.contains("delite_gda"));
    assert!(stdout.contains("smp8"));
    assert!(stdout.contains("gda vs delite_gda"));
    assert!(stdout.contains("Configuration files:\n  (none)"));
}

#[test]
fn list_shows_local_configuration_file() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join(".delitebenchconfig"), "[run]\nruns = 3\n").unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_delite-bench"))
        .arg("list")
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .env_remove("XDG_CONFIG_HOME")
        .output()
        .expect("Failed to run delite-bench");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(".delitebenchconfig"));
}
