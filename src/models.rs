//! Core data models used throughout the action catalog.
//!
//! These types represent the catalog entries, normalized definitions, and
//! publisher records that flow through the build and enrichment pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a definition was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Internal,
    Marketplace,
}

/// Latest published release of a marketplace action's origin repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestRelease {
    pub tag_name: Option<String>,
    pub name: Option<String>,
    pub published_at: Option<String>,
    pub html_url: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
}

/// Provenance of a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// Path of the definition file, relative to the working tree.
    pub path: String,
    /// Remote origin in `host/owner/repo` form. None for internal actions.
    pub origin: Option<String>,
    pub publisher: Option<String>,
    /// Publisher trust status as of the last rebuild. Stale until the next
    /// rebuild that targets publisher-verification changes.
    pub verified: bool,
    /// Omitted entirely (not null) when no release is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_release: Option<LatestRelease>,
}

/// A single named input of an action definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub description: String,
}

/// A single named output of an action definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Normalized action definition extracted from an `action.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    #[serde(default)]
    pub outputs: Vec<OutputSpec>,
    /// The `runs` block, passed through opaquely.
    #[serde(default)]
    pub runs: serde_json::Value,
}

/// One piece of evidence backing an entry's category annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(rename = "type")]
    pub kind: String,
    pub model: String,
    pub primary_category: Option<String>,
    pub reasoning: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Mutable enrichment attached to an entry by the categorization pass.
///
/// `categories` stays empty until a categorization call fully succeeds, and
/// is then only ever replaced wholesale, never partially merged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default)]
    pub categories: Vec<String>,
    pub confidence: Option<String>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

/// Cache bookkeeping used by the incremental build planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheInfo {
    /// Full SHA-256 hex digest of the raw definition bytes.
    pub source_hash: String,
    pub taxonomy_version: String,
    pub prompt_version: String,
    pub generated_at: DateTime<Utc>,
}

/// The unit of persistence: one action, one version snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Globally unique key derived from the source location, e.g.
    /// `internal/platform/.github/actions/setup` or
    /// `marketplace/actions/checkout`.
    pub action_id: String,
    /// First 12 hex chars of the SHA-256 digest of the definition bytes.
    pub version_id: String,
    pub source: SourceInfo,
    pub definition: Definition,
    #[serde(default)]
    pub annotations: Annotations,
    pub cache: CacheInfo,
}

impl CatalogEntry {
    /// Whether a successful categorization has already been recorded.
    pub fn is_categorized(&self) -> bool {
        !self.annotations.evidence.is_empty()
    }
}

/// A publisher as recorded in the discovery snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherRecord {
    pub name: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(rename = "type")]
    pub kind: PublisherKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherKind {
    Official,
    Community,
}

/// Snapshot file written by `acat publishers` and read by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherSnapshot {
    pub metadata: SnapshotMetadata,
    pub publishers: Vec<PublisherRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub generated_at: DateTime<Utc>,
    pub total_publishers: usize,
    pub verified_count: usize,
    pub community_count: usize,
    pub source: String,
    pub version: String,
}
