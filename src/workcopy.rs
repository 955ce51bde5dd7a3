//! Local working-copy management.
//!
//! Many tasks in a batch usually share one source repository. The manager
//! guarantees a single physical clone per source key regardless of how
//! many tasks reference it, then pushes that clone into each newly created
//! remote. The one-clone-per-key guarantee is structural: each key owns a
//! memoized cell, and concurrent requesters converge on its single
//! initialization rather than racing the filesystem.

use crate::errors::{CloneError, GitError, PushError, PushStep};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Boundary to the git binary. Only the exit status matters; no output
/// parsing is done here.
#[async_trait]
pub trait GitRunner: Send + Sync {
    async fn run(&self, args: &[&str], cwd: &Path) -> Result<(), GitError>;
}

/// Runs the real `git` binary via a subprocess, output silenced.
pub struct SystemGit;

#[async_trait]
impl GitRunner for SystemGit {
    async fn run(&self, args: &[&str], cwd: &Path) -> Result<(), GitError> {
        let status = tokio::process::Command::new("git")
            .args(args)
            .current_dir(cwd)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(GitError::Spawn)?;

        if status.success() {
            Ok(())
        } else {
            Err(GitError::NonZeroExit {
                command: format!("git {}", args.join(" ")),
                code: status.code().unwrap_or(-1),
            })
        }
    }
}

type CloneCell = Arc<OnceCell<Result<PathBuf, CloneError>>>;

/// Ensures one ready local clone per source key and publishes clones into
/// newly created remotes.
pub struct WorkingCopyManager {
    cache_dir: PathBuf,
    git: Arc<dyn GitRunner>,
    clones: Mutex<HashMap<String, CloneCell>>,
}

impl WorkingCopyManager {
    pub fn new(cache_dir: PathBuf, git: Arc<dyn GitRunner>) -> Self {
        Self {
            cache_dir,
            git,
            clones: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Return the local path for `source_key`, cloning `url` if this is the
    /// first reference. Idempotent: later calls (and concurrent callers)
    /// observe the first call's result, success or failure alike.
    pub async fn ensure_cloned(
        &self,
        source_key: &str,
        url: &str,
    ) -> Result<PathBuf, CloneError> {
        let cell = {
            let mut clones = self.clones.lock().await;
            clones
                .entry(source_key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        cell.get_or_init(|| self.clone_source(source_key, url))
            .await
            .clone()
    }

    async fn clone_source(&self, source_key: &str, url: &str) -> Result<PathBuf, CloneError> {
        let dest = self.cache_dir.join(source_key);

        // A pre-existing path is treated as ready; no re-clone, no
        // verification of content.
        if dest.exists() {
            return Ok(dest);
        }

        std::fs::create_dir_all(&self.cache_dir).map_err(|e| CloneError {
            url: url.to_string(),
            message: format!("failed to create cache directory: {}", e),
        })?;

        self.git
            .run(&["clone", url], &self.cache_dir)
            .await
            .map_err(|e| CloneError {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(dest)
    }

    /// Push the mirror at `local_path` into the freshly created remote
    /// `organization/name`.
    ///
    /// The four steps run in order and fail fast: a non-zero exit aborts
    /// the remaining steps for this task only.
    pub async fn publish(
        &self,
        local_path: &Path,
        organization: &str,
        name: &str,
    ) -> Result<(), PushError> {
        let remote = format!("git@github.com:{}/{}.git", organization, name);

        let steps: [(PushStep, Vec<&str>); 4] = [
            (PushStep::RemoveOrigin, vec!["remote", "remove", "origin"]),
            (PushStep::AddOrigin, vec!["remote", "add", "origin", &remote]),
            (PushStep::RenameBranch, vec!["branch", "-M", "main"]),
            (
                PushStep::ForcePush,
                vec!["push", "-u", "--force", "origin", "main"],
            ),
        ];

        for (step, args) in steps {
            self.git
                .run(&args, local_path)
                .await
                .map_err(|cause| PushError { step, cause })?;
        }

        Ok(())
    }

    /// Remove the entire local cache directory. Best-effort: this runs on
    /// cleanup and abort paths where the batch outcome is already
    /// determined, so failure is logged and never escalated.
    pub fn teardown_all(&self) {
        if !self.cache_dir.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.cache_dir) {
            eprintln!(
                "Failed to delete local clone directory {}: {}",
                self.cache_dir.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Counts invocations and records argument vectors; optionally fails
    /// every call whose first argument matches `fail_on`.
    struct RecordingGit {
        calls: AtomicUsize,
        commands: std::sync::Mutex<Vec<Vec<String>>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingGit {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                commands: std::sync::Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn failing_on(subcommand: &'static str) -> Self {
            Self {
                fail_on: Some(subcommand),
                ..Self::new()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn commands(&self) -> Vec<Vec<String>> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GitRunner for RecordingGit {
        async fn run(&self, args: &[&str], _cwd: &Path) -> Result<(), GitError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.commands
                .lock()
                .unwrap()
                .push(args.iter().map(|s| s.to_string()).collect());
            if self.fail_on == args.first().copied() {
                return Err(GitError::NonZeroExit {
                    command: format!("git {}", args.join(" ")),
                    code: 128,
                });
            }
            Ok(())
        }
    }

    fn manager_with(git: Arc<RecordingGit>) -> (WorkingCopyManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let manager = WorkingCopyManager::new(dir.path().join("localRepos"), git);
        (manager, dir)
    }

    #[tokio::test]
    async fn test_ensure_cloned_is_idempotent() {
        let git = Arc::new(RecordingGit::new());
        let (manager, _dir) = manager_with(git.clone());

        let first = manager
            .ensure_cloned("widget", "https://github.com/acme/widget")
            .await
            .unwrap();
        let second = manager
            .ensure_cloned("widget", "https://github.com/acme/widget")
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(git.call_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_clone() {
        let git = Arc::new(RecordingGit::new());
        let (manager, _dir) = manager_with(git.clone());
        let manager = Arc::new(manager);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                manager
                    .ensure_cloned("widget", "https://github.com/acme/widget")
                    .await
            }));
        }

        let mut paths = Vec::new();
        for handle in handles {
            paths.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(git.call_count(), 1);
        assert!(paths.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_failure() {
        let git = Arc::new(RecordingGit::failing_on("clone"));
        let (manager, _dir) = manager_with(git.clone());
        let manager = Arc::new(manager);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                manager
                    .ensure_cloned("widget", "https://github.com/acme/widget")
                    .await
            }));
        }

        let mut errors = Vec::new();
        for handle in handles {
            errors.push(handle.await.unwrap().unwrap_err());
        }

        // One physical attempt; every waiter observes the same failure.
        assert_eq!(git.call_count(), 1);
        assert!(errors.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_pre_existing_path_is_treated_as_ready() {
        let git = Arc::new(RecordingGit::new());
        let (manager, _dir) = manager_with(git.clone());

        std::fs::create_dir_all(manager.cache_dir().join("widget")).unwrap();

        let path = manager
            .ensure_cloned("widget", "https://github.com/acme/widget")
            .await
            .unwrap();

        assert_eq!(path, manager.cache_dir().join("widget"));
        assert_eq!(git.call_count(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_clone_independently() {
        let git = Arc::new(RecordingGit::new());
        let (manager, _dir) = manager_with(git.clone());

        manager
            .ensure_cloned("widget", "https://github.com/acme/widget")
            .await
            .unwrap();
        manager
            .ensure_cloned("gadget", "https://github.com/acme/gadget")
            .await
            .unwrap();

        assert_eq!(git.call_count(), 2);
    }

    #[tokio::test]
    async fn test_publish_runs_four_steps_in_order() {
        let git = Arc::new(RecordingGit::new());
        let (manager, dir) = manager_with(git.clone());

        manager
            .publish(dir.path(), "org1", "demo-1")
            .await
            .unwrap();

        let commands = git.commands();
        assert_eq!(commands.len(), 4);
        assert_eq!(commands[0], vec!["remote", "remove", "origin"]);
        assert_eq!(
            commands[1],
            vec!["remote", "add", "origin", "git@github.com:org1/demo-1.git"]
        );
        assert_eq!(commands[2], vec!["branch", "-M", "main"]);
        assert_eq!(commands[3], vec!["push", "-u", "--force", "origin", "main"]);
    }

    #[tokio::test]
    async fn test_publish_fails_fast_and_names_the_step() {
        let git = Arc::new(RecordingGit::failing_on("branch"));
        let (manager, dir) = manager_with(git.clone());

        let err = manager
            .publish(dir.path(), "org1", "demo-1")
            .await
            .unwrap_err();

        assert_eq!(err.step, PushStep::RenameBranch);
        // remove-origin, add-origin, then the failing rename; no push
        assert_eq!(git.call_count(), 3);
    }

    #[tokio::test]
    async fn test_teardown_removes_cache_directory() {
        let git = Arc::new(RecordingGit::new());
        let (manager, _dir) = manager_with(git);

        std::fs::create_dir_all(manager.cache_dir().join("widget")).unwrap();
        manager.teardown_all();
        assert!(!manager.cache_dir().exists());

        // Second teardown on a missing directory is a no-op.
        manager.teardown_all();
    }
}
