//! Integration tests for repogen
//!
//! These exercise the CLI surface: argument parsing, the plan command's
//! expansion output, and the precondition exit statuses. The provisioning
//! path itself is covered by the orchestrator unit tests against an
//! in-memory hosting API.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a repogen Command with a clean credential environment.
fn repogen() -> Command {
    let mut cmd = cargo_bin_cmd!("repogen");
    cmd.env_remove("REPO_GEN_GITHUB_TOKEN");
    cmd
}

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("repoConfig.json");
    fs::write(&path, content).unwrap();
    path
}

const NAMED_DIRECTIVE: &str = r#"[
    {
        "url": "https://github.com/acme/widget",
        "organization": "org1",
        "name": "demo",
        "description": "A demo repository",
        "isPrivate": false,
        "count": 3
    }
]"#;

mod cli_basics {
    use super::*;

    #[test]
    fn test_repogen_help() {
        repogen().arg("--help").assert().success();
    }

    #[test]
    fn test_repogen_version() {
        repogen().arg("--version").assert().success();
    }

    #[test]
    fn test_repogen_requires_subcommand() {
        repogen().assert().failure();
    }
}

mod plan {
    use super::*;

    #[test]
    fn test_plan_lists_expanded_tasks() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, NAMED_DIRECTIVE);

        repogen()
            .current_dir(dir.path())
            .args(["plan", "--config"])
            .arg(&config)
            .assert()
            .success()
            .stdout(predicate::str::contains("3 task(s) would run"))
            .stdout(predicate::str::contains("org1/demo-1"))
            .stdout(predicate::str::contains("org1/demo-3"))
            .stdout(predicate::str::contains("source widget"));
    }

    #[test]
    fn test_plan_skips_zero_count_directives() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            &dir,
            r#"[{"url": "https://github.com/acme/widget", "organization": "org1", "name": "demo", "count": 0}]"#,
        );

        repogen()
            .current_dir(dir.path())
            .args(["plan", "--config"])
            .arg(&config)
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to do"));
    }

    #[test]
    fn test_plan_generates_names_for_unnamed_directives() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            &dir,
            r#"[{"url": "https://github.com/acme/widget", "organization": "org1", "name": "", "count": 2}]"#,
        );

        repogen()
            .current_dir(dir.path())
            .args(["plan", "--config"])
            .arg(&config)
            .assert()
            .success()
            .stdout(predicate::str::contains("2 task(s) would run"));
    }

    #[test]
    fn test_plan_missing_config_exits_one() {
        let dir = TempDir::new().unwrap();

        repogen()
            .current_dir(dir.path())
            .args(["plan", "--config", "missing.json"])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Failed to read directive file"));
    }

    #[test]
    fn test_plan_unparsable_config_exits_one() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "this is not json");

        repogen()
            .current_dir(dir.path())
            .args(["plan", "--config"])
            .arg(&config)
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Failed to parse directive file"));
    }

    #[test]
    fn test_plan_invalid_source_url_exits_one() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            &dir,
            r#"[{"url": "not-a-url", "organization": "org1", "name": "demo", "count": 1}]"#,
        );

        repogen()
            .current_dir(dir.path())
            .args(["plan", "--config"])
            .arg(&config)
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Invalid source repository URL"));
    }
}

mod run_preconditions {
    use super::*;

    #[test]
    fn test_run_without_token_exits_one_before_any_work() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, NAMED_DIRECTIVE);

        repogen()
            .current_dir(dir.path())
            .args(["run", "--config"])
            .arg(&config)
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("REPO_GEN_GITHUB_TOKEN"));

        // No clone cache, no manifest: nothing was launched.
        assert!(!dir.path().join("localRepos").exists());
        assert_eq!(
            fs::read_dir(dir.path())
                .unwrap()
                .filter(|e| {
                    e.as_ref()
                        .unwrap()
                        .file_name()
                        .to_string_lossy()
                        .starts_with("deleteRepos-")
                })
                .count(),
            0
        );
    }

    #[test]
    fn test_run_with_token_but_missing_config_exits_one() {
        let dir = TempDir::new().unwrap();

        repogen()
            .current_dir(dir.path())
            .env("REPO_GEN_GITHUB_TOKEN", "ghp_testtoken")
            .args(["run", "--config", "missing.json"])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Failed to read directive file"));
    }
}
