//! Directive file loading, credential loading, and runtime settings.

use crate::errors::SetupError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the GitHub bearer token.
pub const TOKEN_VAR: &str = "REPO_GEN_GITHUB_TOKEN";

/// One configured source-to-target replication instruction.
///
/// Loaded from the JSON directive file; immutable for the run. A missing
/// or empty `name` means "generate one", `count == 0` means "skip".
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationDirective {
    pub url: String,
    pub organization: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_private: bool,
    pub count: u32,
}

impl ReplicationDirective {
    /// The base name to derive copy names from, if one was configured.
    pub fn base_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}

/// Runtime settings for one invocation, resolved from CLI flags.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Path to the JSON directive file.
    pub config_path: PathBuf,
    /// Directory holding local mirror clones for the run.
    pub cache_dir: PathBuf,
    /// Directory the rollback manifest is written into.
    pub manifest_dir: PathBuf,
    /// Minimum spacing between hosting-API call starts.
    pub throttle_interval: Duration,
}

/// Load and parse the directive file.
pub fn load_directives(path: &Path) -> Result<Vec<ReplicationDirective>, SetupError> {
    let text = std::fs::read_to_string(path).map_err(|source| SetupError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SetupError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the GitHub token from the environment, reading `.env` first if one
/// is present in the working directory.
pub fn load_token() -> Result<String, SetupError> {
    dotenvy::dotenv().ok();
    match std::env::var(TOKEN_VAR) {
        Ok(token) if !token.is_empty() => Ok(token),
        _ => Err(SetupError::MissingToken {
            var: TOKEN_VAR.to_string(),
        }),
    }
}

/// Verify git is installed and on PATH.
pub fn ensure_git() -> Result<(), SetupError> {
    which::which("git").map(|_| ()).map_err(|_| SetupError::MissingGit)
}
