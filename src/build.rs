//! Catalog build pipeline orchestration.
//!
//! Coordinates the full flow: discovery → parse + identity → planner
//! decision → enrichment (publisher status, latest release) → store, then a
//! second pass that categorizes entries lacking annotations. Single-threaded
//! and sequential: one definition at a time, one remote call at a time.
//!
//! Running two builds concurrently against the same catalog store is unsafe
//! (no locking) and must be prevented operationally.

use anyhow::{bail, Result};
use chrono::Utc;

use crate::categorize::{self, Categorizer};
use crate::config::Config;
use crate::discover::{self, DiscoveredAction};
use crate::identity;
use crate::models::{
    Annotations, CacheInfo, CatalogEntry, SourceInfo, SourceKind,
};
use crate::parse;
use crate::planner::{marketplace_publisher, BuildPlanner, Decision, RebuildReason};
use crate::registry::PublisherRegistry;
use crate::release::ReleaseClient;
use crate::store::CatalogStore;

pub const TAXONOMY_VERSION: &str = "0.0.1";
pub const PROMPT_VERSION: &str = "v1";

/// Flags accepted by `acat build`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Ignore cached hashes: every entry rebuilds.
    pub no_cache: bool,
    pub no_categorize: bool,
    pub force_categorize: bool,
    pub force_publisher_update: bool,
}

fn env_token(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Run the full catalog build.
pub async fn run_build(config: &Config, opts: &BuildOptions) -> Result<()> {
    let registry = PublisherRegistry::load(&config.paths.publishers_file);
    let store = CatalogStore::new(&config.paths.catalog_dir);
    let planner = BuildPlanner::new(&registry, !opts.no_cache, opts.force_publisher_update);
    let releases = ReleaseClient::new(&config.hosting, env_token("GITHUB_TOKEN"))?;

    println!("build");
    if opts.no_cache {
        println!("  cache disabled (--no-cache)");
    }
    if opts.force_publisher_update {
        println!("  forced publisher update (--force-publisher-update)");
    }
    if !releases.has_token() {
        println!("  GITHUB_TOKEN not set - release information will not be fetched");
    }

    let actions = discover::discover_actions(&config.paths.blueprints_dir)?;
    let internal_count = actions
        .iter()
        .filter(|a| a.kind == SourceKind::Internal)
        .count();
    println!("  internal actions: {}", internal_count);
    println!("  marketplace actions: {}", actions.len() - internal_count);

    let mut built: Vec<CatalogEntry> = Vec::new();
    let mut rebuilt = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    let mut publisher_updates = 0usize;
    let mut releases_fetched = 0usize;

    for action in &actions {
        let (definition, bytes) = match parse::parse_definition_file(&action.path) {
            Ok(parsed) => parsed,
            Err(e) => {
                println!("  {} ... failed: {}", action.action_id, e);
                failed += 1;
                continue;
            }
        };
        let content_id = identity::identity(&bytes);

        let cached_hash = store.cached_hash(&action.action_id);
        let cached_verified = store.cached_verified(&action.action_id);
        let decision = planner.decide(
            &action.action_id,
            &content_id.full_hash,
            cached_hash.as_deref(),
            cached_verified,
        );

        let reason = match decision {
            Decision::Skip => {
                println!("  {} ... skipped (unchanged)", action.action_id);
                skipped += 1;
                // Still loaded: skipped entries remain eligible for the
                // categorization pass.
                match store.get_latest(&action.action_id) {
                    Ok(existing) => built.push(existing),
                    Err(e) => println!("warning: {}", e),
                }
                continue;
            }
            Decision::Rebuild(reason) => reason,
        };

        let mut entry = build_entry(action, definition, &content_id, &registry);

        if entry.source.kind == SourceKind::Marketplace {
            if let Some(origin) = entry.source.origin.clone() {
                entry.source.latest_release =
                    releases.latest_release(&origin).await.into_release();
                if entry.source.latest_release.is_some() {
                    releases_fetched += 1;
                }
            }
        }

        store.put(&entry)?;

        if reason == RebuildReason::PublisherChanged {
            println!(
                "  {} ... rebuilt ({}) publisher {}: {:?} -> {}",
                entry.action_id,
                entry.version_id,
                entry.source.publisher.as_deref().unwrap_or("?"),
                cached_verified,
                entry.source.verified
            );
            publisher_updates += 1;
        } else {
            println!("  {} ... rebuilt ({})", entry.action_id, entry.version_id);
        }

        rebuilt += 1;
        built.push(entry);
    }

    println!("  rebuilt: {}", rebuilt);
    println!("  skipped: {} (unchanged)", skipped);
    if failed > 0 {
        println!("  failed: {}", failed);
    }
    if publisher_updates > 0 {
        println!("  publisher updates: {}", publisher_updates);
    }
    if releases_fetched > 0 {
        println!("  releases fetched: {}", releases_fetched);
    }

    if opts.no_categorize {
        println!("  categorization skipped (--no-categorize)");
        println!("ok");
        return Ok(());
    }

    run_categorize_pass(config, &store, &mut built, opts.force_categorize).await?;
    println!("ok");
    Ok(())
}

/// Construct a fresh catalog entry for a discovered action. Release
/// enrichment happens separately so this stays a pure transform.
fn build_entry(
    action: &DiscoveredAction,
    definition: crate::models::Definition,
    content_id: &identity::ContentId,
    registry: &PublisherRegistry,
) -> CatalogEntry {
    let publisher = marketplace_publisher(&action.action_id).map(str::to_string);
    let verified = publisher
        .as_deref()
        .map(|p| registry.lookup(p))
        .unwrap_or(false);

    CatalogEntry {
        action_id: action.action_id.clone(),
        version_id: content_id.short_id.clone(),
        source: SourceInfo {
            kind: action.kind,
            path: action.path.display().to_string(),
            origin: action.origin.clone(),
            publisher,
            verified,
            latest_release: None,
        },
        definition,
        annotations: Annotations::default(),
        cache: CacheInfo {
            source_hash: content_id.full_hash.clone(),
            taxonomy_version: TAXONOMY_VERSION.to_string(),
            prompt_version: PROMPT_VERSION.to_string(),
            generated_at: Utc::now(),
        },
    }
}

/// Second pass: categorize entries without evidence (or all, when forced).
async fn run_categorize_pass(
    config: &Config,
    store: &CatalogStore,
    entries: &mut [CatalogEntry],
    force: bool,
) -> Result<()> {
    let api_key = match env_token("OPENAI_API_KEY") {
        Some(key) => key,
        None => {
            println!("  OPENAI_API_KEY not set - categorization skipped");
            return Ok(());
        }
    };
    let categorizer = Categorizer::new(&config.categorize, api_key)?;

    println!("categorize");
    let total = entries.len();
    let mut categorized = 0usize;
    let mut total_cost = 0.0f64;

    for (i, entry) in entries.iter_mut().enumerate() {
        let position = format!("[{}/{}]", i + 1, total);

        if entry.is_categorized() && !force {
            println!(
                "  {} {} ... skipped (already categorized)",
                position, entry.action_id
            );
            continue;
        }

        match categorizer.categorize(entry).await {
            Ok((categorization, cost)) => {
                total_cost += cost;
                categorize::apply(entry, &categorization, categorizer.model());
                store.put_latest(entry)?;

                let categories = entry.annotations.categories.join(", ");
                println!(
                    "  {} {} ... ok ({}; {}) ${:.5}",
                    position,
                    entry.action_id,
                    categories,
                    categorization.confidence,
                    cost
                );
                categorized += 1;
            }
            // Entry keeps its prior annotations; the batch continues.
            Err(e) => {
                println!("  {} {} ... skipped ({})", position, entry.action_id, e);
            }
        }
    }

    println!("  categorized: {}/{}", categorized, total);
    println!("  total cost: ${:.2}", total_cost);
    Ok(())
}

/// Release-only update mode: refresh `latest_release` on existing
/// marketplace entries without rebuilding anything else.
///
/// The hosting token is required here by design — the feature cannot
/// function at all without it.
pub async fn run_update_releases(config: &Config) -> Result<()> {
    let token = match env_token("GITHUB_TOKEN") {
        Some(token) => token,
        None => bail!("GITHUB_TOKEN not set - cannot fetch releases"),
    };
    let releases = ReleaseClient::new(&config.hosting, Some(token))?;
    let store = CatalogStore::new(&config.paths.catalog_dir);

    println!("update-releases");

    let mut updated = 0usize;
    let mut skipped = 0usize;

    for mut entry in store.entries()? {
        if entry.source.kind != SourceKind::Marketplace {
            continue;
        }
        let origin = match entry.source.origin.clone() {
            Some(origin) => origin,
            None => continue,
        };

        match releases.latest_release(&origin).await.into_release() {
            Some(release) => {
                let old_tag = entry
                    .source
                    .latest_release
                    .as_ref()
                    .and_then(|r| r.tag_name.clone())
                    .unwrap_or_else(|| "none".to_string());
                let new_tag = release
                    .tag_name
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string());

                entry.source.latest_release = Some(release);
                store.put_with_current_snapshot(&entry)?;

                if old_tag != new_tag {
                    println!("  {} ... {} -> {}", entry.action_id, old_tag, new_tag);
                } else {
                    println!("  {} ... {} (unchanged)", entry.action_id, new_tag);
                }
                updated += 1;
            }
            None => {
                println!("  {} ... no release found", entry.action_id);
                skipped += 1;
            }
        }
    }

    println!("  updated: {}", updated);
    println!("  skipped: {}", skipped);
    println!("ok");
    Ok(())
}
