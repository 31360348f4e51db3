//! Catalog store: directory-per-entry persistence of catalog records.
//!
//! Each entry owns one directory under the catalog root, named by its
//! `action_id` with path separators replaced by a filesystem-safe token.
//! The directory holds a mutable `latest.json` plus immutable version
//! snapshots named `<version_id>.json`.
//!
//! The two writes in [`CatalogStore::put`] are not transactional: a crash
//! between them can leave `latest.json` updated with the version snapshot
//! missing, or vice versa. This is an accepted, documented limitation — no
//! reconciliation pass exists.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::models::CatalogEntry;

/// A missing or corrupt persisted record. Read paths degrade to "treat as
/// absent" rather than failing the run.
#[derive(Debug, Error)]
pub enum StoreReadError {
    #[error("no catalog entry for {action_id}")]
    NotFound { action_id: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed catalog record {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Durable storage for catalog entries.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    root: PathBuf,
}

/// Replace path separators with a filesystem-safe token so the directory
/// name is deterministic for a given `action_id`.
pub fn sanitize_id(action_id: &str) -> String {
    action_id.replace('/', "__")
}

impl CatalogStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, action_id: &str) -> PathBuf {
        self.root.join(sanitize_id(action_id))
    }

    fn latest_path(&self, action_id: &str) -> PathBuf {
        self.entry_dir(action_id).join("latest.json")
    }

    /// Write the latest record and its version snapshot.
    pub fn put(&self, entry: &CatalogEntry) -> Result<()> {
        let dir = self.entry_dir(&entry.action_id);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let serialized = serde_json::to_string_pretty(entry)?;
        let latest = dir.join("latest.json");
        std::fs::write(&latest, &serialized)
            .with_context(|| format!("failed to write {}", latest.display()))?;

        let snapshot = dir.join(format!("{}.json", entry.version_id));
        std::fs::write(&snapshot, &serialized)
            .with_context(|| format!("failed to write {}", snapshot.display()))?;

        Ok(())
    }

    /// Rewrite only the latest record, leaving version snapshots untouched.
    /// Used by the categorization pass, which mutates annotations in place.
    pub fn put_latest(&self, entry: &CatalogEntry) -> Result<()> {
        let dir = self.entry_dir(&entry.action_id);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let latest = dir.join("latest.json");
        std::fs::write(&latest, serde_json::to_string_pretty(entry)?)
            .with_context(|| format!("failed to write {}", latest.display()))?;
        Ok(())
    }

    /// Rewrite the latest record and, when it exists, the snapshot for the
    /// entry's current version. Used by release-only updates.
    pub fn put_with_current_snapshot(&self, entry: &CatalogEntry) -> Result<()> {
        self.put_latest(entry)?;
        let snapshot = self
            .entry_dir(&entry.action_id)
            .join(format!("{}.json", entry.version_id));
        if snapshot.exists() {
            std::fs::write(&snapshot, serde_json::to_string_pretty(entry)?)
                .with_context(|| format!("failed to write {}", snapshot.display()))?;
        }
        Ok(())
    }

    /// Load the latest record for an action.
    pub fn get_latest(&self, action_id: &str) -> Result<CatalogEntry, StoreReadError> {
        let path = self.latest_path(action_id);
        if !path.exists() {
            return Err(StoreReadError::NotFound {
                action_id: action_id.to_string(),
            });
        }
        let content = std::fs::read_to_string(&path).map_err(|source| StoreReadError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content)
            .map_err(|source| StoreReadError::Malformed { path, source })
    }

    /// Cached source hash of an existing entry, or None when the latest
    /// record is missing or corrupt. A corrupt record logs a warning and
    /// forces a rebuild rather than failing the run.
    pub fn cached_hash(&self, action_id: &str) -> Option<String> {
        match self.get_latest(action_id) {
            Ok(entry) => Some(entry.cache.source_hash),
            Err(StoreReadError::NotFound { .. }) => None,
            Err(e) => {
                println!("warning: {} — treating as absent", e);
                None
            }
        }
    }

    /// Cached publisher-verified flag of an existing entry, with the same
    /// resilience contract as [`cached_hash`](Self::cached_hash).
    pub fn cached_verified(&self, action_id: &str) -> Option<bool> {
        match self.get_latest(action_id) {
            Ok(entry) => Some(entry.source.verified),
            Err(StoreReadError::NotFound { .. }) => None,
            Err(e) => {
                println!("warning: {} — treating as absent", e);
                None
            }
        }
    }

    /// Iterate all latest records in the store, skipping unreadable entries
    /// with a warning. Read-only consumers and release-only updates use this.
    pub fn entries(&self) -> Result<Vec<CatalogEntry>> {
        let mut out = Vec::new();
        if !self.root.exists() {
            return Ok(out);
        }
        for dir_entry in std::fs::read_dir(&self.root)
            .with_context(|| format!("failed to read {}", self.root.display()))?
        {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_dir() {
                continue;
            }
            let latest = dir_entry.path().join("latest.json");
            if !latest.exists() {
                continue;
            }
            let content = match std::fs::read_to_string(&latest) {
                Ok(content) => content,
                Err(e) => {
                    println!("warning: skipping {}: {}", latest.display(), e);
                    continue;
                }
            };
            match serde_json::from_str::<CatalogEntry>(&content) {
                Ok(entry) => out.push(entry),
                Err(e) => println!("warning: skipping {}: {}", latest.display(), e),
            }
        }
        // Deterministic order for consumers and tests.
        out.sort_by(|a, b| a.action_id.cmp(&b.action_id));
        Ok(out)
    }
}
