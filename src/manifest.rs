//! Rollback manifest: the batch's undo log.
//!
//! Every remote repository the run successfully creates is recorded here,
//! and the set is written out once at the end of the run. The file is the
//! sole input to the separate bulk-delete tool, so entries must never be
//! dropped or duplicated.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One remote repository created during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub organization: String,
    pub name: String,
}

/// Append-only, concurrency-safe record of created repositories.
pub struct RollbackManifest {
    entries: Mutex<Vec<ManifestEntry>>,
}

impl RollbackManifest {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Record one created repository. Safe to call from concurrent tasks.
    pub fn record(&self, organization: &str, name: &str) {
        let entry = ManifestEntry {
            organization: organization.to_string(),
            name: name.to_string(),
        };
        // Lock poisoning means a panicking task died mid-append; the data
        // itself is still a valid Vec, so keep recording.
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<ManifestEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Write the manifest to a timestamped file under `dir`.
    ///
    /// Returns `None` without touching the filesystem when nothing was
    /// created; otherwise returns the path of the file written.
    pub fn flush(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let entries = self.entries();
        if entries.is_empty() {
            return Ok(None);
        }

        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let path = dir.join(format!("deleteRepos-{}.json", stamp));
        let json = serde_json::to_string_pretty(&entries)
            .context("Failed to serialize rollback manifest")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write rollback manifest to {}", path.display()))?;
        Ok(Some(path))
    }
}

impl Default for RollbackManifest {
    fn default() -> Self {
        Self::new()
    }
}
