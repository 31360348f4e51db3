//! Publisher registry: verified/community trust status for marketplace
//! publishers.
//!
//! Loaded once per run from the snapshot file written by `acat publishers`
//! and immutable thereafter. The registry is passed explicitly into the
//! build planner and pipeline rather than living in process-global state,
//! so both can be exercised with a fake registry in tests.

use std::collections::HashMap;
use std::path::Path;

use crate::models::PublisherSnapshot;

/// Read-only mapping from publisher name to verified status.
#[derive(Debug, Clone, Default)]
pub struct PublisherRegistry {
    verified: HashMap<String, bool>,
}

impl PublisherRegistry {
    /// Load the registry from a snapshot file.
    ///
    /// An absent file yields an empty registry — downstream entries simply
    /// default to unverified. A corrupt file does the same, with a warning.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };

        match serde_json::from_str::<PublisherSnapshot>(&content) {
            Ok(snapshot) => Self {
                verified: snapshot
                    .publishers
                    .into_iter()
                    .map(|p| (p.name, p.verified))
                    .collect(),
            },
            Err(e) => {
                println!(
                    "warning: could not load publisher snapshot {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Build a registry from explicit pairs. Test seam.
    pub fn from_pairs(pairs: &[(&str, bool)]) -> Self {
        Self {
            verified: pairs
                .iter()
                .map(|(name, v)| (name.to_string(), *v))
                .collect(),
        }
    }

    /// Verified status of a publisher, defaulting to false for unknown names.
    pub fn lookup(&self, name: &str) -> bool {
        self.verified.get(name).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.verified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verified.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_file_yields_empty_registry() {
        let registry = PublisherRegistry::load(Path::new("/nonexistent/publishers.json"));
        assert!(registry.is_empty());
        assert!(!registry.lookup("actions"));
    }

    #[test]
    fn corrupt_file_yields_empty_registry() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("publishers.json");
        std::fs::write(&path, "{ not json").unwrap();
        let registry = PublisherRegistry::load(&path);
        assert!(registry.is_empty());
    }

    #[test]
    fn loads_snapshot_and_defaults_unknown_to_false() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("publishers.json");
        std::fs::write(
            &path,
            r#"{
              "metadata": {
                "generated_at": "2024-06-01T00:00:00Z",
                "total_publishers": 2,
                "verified_count": 1,
                "community_count": 1,
                "source": "test",
                "version": "2.0"
              },
              "publishers": [
                {"name": "actions", "verified": true, "type": "official"},
                {"name": "acme", "verified": false, "type": "community", "stars": 120}
              ]
            }"#,
        )
        .unwrap();

        let registry = PublisherRegistry::load(&path);
        assert_eq!(registry.len(), 2);
        assert!(registry.lookup("actions"));
        assert!(!registry.lookup("acme"));
        assert!(!registry.lookup("unknown-publisher"));
    }
}
