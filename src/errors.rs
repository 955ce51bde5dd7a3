//! Typed error hierarchy for the repogen orchestrator.
//!
//! Three groups cover the three subsystems:
//! - `SetupError` — startup precondition failures (fatal before any API call)
//! - `SourceError` — source URL resolution failures
//! - `GitError` / `CloneError` / `PushError` — working-copy subprocess failures

use std::path::PathBuf;
use thiserror::Error;

/// Startup precondition failures. Any of these halts the process before a
/// single task is launched.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("repogen requires git to be installed and on PATH")]
    MissingGit,

    #[error("Missing environment variable {var}")]
    MissingToken { var: String },

    #[error("Failed to read directive file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse directive file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from resolving a source repository URL.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Invalid source repository URL: {url}")]
    InvalidUrl { url: String },
}

/// A git subprocess failure: either the binary could not be spawned or it
/// exited non-zero.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Failed to spawn git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git {command} exited with code {code}")]
    NonZeroExit { command: String, code: i32 },
}

/// A clone failure, shared between every task waiting on the same source
/// key. Cloneable so the memoized result can be handed to all waiters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("git clone failed for {url}: {message}")]
pub struct CloneError {
    pub url: String,
    pub message: String,
}

/// The ordered steps of publishing a mirror into a new remote. The pipeline
/// stops at the first failing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStep {
    RemoveOrigin,
    AddOrigin,
    RenameBranch,
    ForcePush,
}

impl std::fmt::Display for PushStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushStep::RemoveOrigin => write!(f, "remove-origin"),
            PushStep::AddOrigin => write!(f, "add-origin"),
            PushStep::RenameBranch => write!(f, "rename-branch"),
            PushStep::ForcePush => write!(f, "force-push"),
        }
    }
}

/// A publish failure, carrying which pipeline step failed.
#[derive(Debug, Error)]
#[error("publish step {step} failed: {cause}")]
pub struct PushError {
    pub step: PushStep,
    #[source]
    pub cause: GitError,
}
