//! Publisher discovery: build the verified/community publisher snapshot.
//!
//! Seeds a fixed list of official organizations as verified, then searches
//! the hosting API for popular community action repositories, dedupes them,
//! and records each previously-unseen owner as an unverified community
//! publisher with a star count. No flags; the hosting token is required by
//! design.

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde_json::{json, Value};

use crate::config::Config;
use crate::models::{PublisherKind, PublisherRecord, PublisherSnapshot, SnapshotMetadata};

/// Official organizations always included as verified.
pub const OFFICIAL_ORGS: [&str; 7] = [
    "actions",
    "azure",
    "aws-actions",
    "google-github-actions",
    "docker",
    "codecov",
    "github",
];

/// Search terms combined with `topic:github-action stars:><min>`.
const SEARCH_TERMS: [&str; 7] = [
    "github-action",
    "workflow",
    "ci-cd",
    "action",
    "github-actions",
    "automation",
    "devops",
];

const MIN_STARS: u64 = 100;

const SEARCH_QUERY: &str = r#"
query($searchQuery: String!, $after: String) {
  search(query: $searchQuery, type: REPOSITORY, first: 100, after: $after) {
    pageInfo {
      hasNextPage
      endCursor
    }
    nodes {
      ... on Repository {
        id
        name
        owner {
          login
        }
        stargazerCount
      }
    }
  }
}
"#;

/// One repository hit from the search API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoHit {
    pub id: String,
    pub owner: String,
    pub stars: u64,
}

/// Run the publisher-discovery workflow and write the snapshot file.
pub async fn run_discover(config: &Config) -> Result<()> {
    let token = match std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => bail!("GITHUB_TOKEN is required for publisher discovery"),
    };

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.hosting.timeout_secs.max(30)))
        .build()?;

    println!("publishers");
    println!("  official orgs: {}", OFFICIAL_ORGS.len());

    let mut hits: Vec<RepoHit> = Vec::new();
    for term in SEARCH_TERMS {
        println!("  searching: {}", term);
        match search_repositories(&http, &config.hosting.graphql_url, &token, term).await {
            Ok(mut found) => {
                println!("    found: {}", found.len());
                hits.append(&mut found);
            }
            Err(e) => println!("    warning: {}", e),
        }
    }

    let publishers = assemble_publishers(&hits);
    let snapshot = make_snapshot(publishers);

    if let Some(parent) = config.paths.publishers_file.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(
        &config.paths.publishers_file,
        serde_json::to_string_pretty(&snapshot)?,
    )
    .with_context(|| {
        format!(
            "failed to write {}",
            config.paths.publishers_file.display()
        )
    })?;

    println!(
        "  saved: {} publishers ({} verified, {} community)",
        snapshot.metadata.total_publishers,
        snapshot.metadata.verified_count,
        snapshot.metadata.community_count
    );
    println!("  file: {}", config.paths.publishers_file.display());
    println!("ok");
    Ok(())
}

/// One paginated search pass for a single term.
async fn search_repositories(
    http: &reqwest::Client,
    graphql_url: &str,
    token: &str,
    term: &str,
) -> Result<Vec<RepoHit>> {
    let search_query = format!("{} topic:github-action stars:>{}", term, MIN_STARS);
    let mut hits = Vec::new();
    let mut after: Option<String> = None;

    loop {
        let response = http
            .post(graphql_url)
            .header("Authorization", format!("Bearer {}", token))
            .header("User-Agent", "acat")
            .json(&json!({
                "query": SEARCH_QUERY,
                "variables": { "searchQuery": &search_query, "after": after },
            }))
            .send()
            .await
            .context("GraphQL request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("GraphQL error: {}", status);
        }
        let body: Value = response.json().await.context("GraphQL reply not JSON")?;
        if let Some(errors) = body.get("errors") {
            bail!("GraphQL errors: {}", errors);
        }

        let (page_hits, next_cursor) = match search_page(&body["data"]) {
            Some(page) => page,
            None => break,
        };
        if page_hits.is_empty() {
            break;
        }
        hits.extend(page_hits);

        match next_cursor {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }

    Ok(hits)
}

/// Extract repository hits and the pagination cursor from one search page.
fn search_page(data: &Value) -> Option<(Vec<RepoHit>, Option<String>)> {
    let search = data.get("search")?;
    let nodes = search["nodes"].as_array()?;

    let hits = nodes
        .iter()
        .filter_map(|node| {
            Some(RepoHit {
                id: node["id"].as_str()?.to_string(),
                owner: node["owner"]["login"].as_str()?.to_string(),
                stars: node["stargazerCount"].as_u64().unwrap_or(0),
            })
        })
        .collect();

    let next_cursor = if search["pageInfo"]["hasNextPage"].as_bool().unwrap_or(false) {
        search["pageInfo"]["endCursor"].as_str().map(str::to_string)
    } else {
        None
    };

    Some((hits, next_cursor))
}

/// Combine official orgs with deduplicated community owners.
///
/// Repositories are deduplicated by id across all search terms; owners
/// already present (officials included) are not added twice. Community
/// publishers are sorted by name; each carries the star count of its first
/// deduplicated repository.
pub fn assemble_publishers(hits: &[RepoHit]) -> Vec<PublisherRecord> {
    let mut publishers: Vec<PublisherRecord> = OFFICIAL_ORGS
        .iter()
        .map(|org| PublisherRecord {
            name: org.to_string(),
            verified: true,
            kind: PublisherKind::Official,
            stars: None,
        })
        .collect();

    let mut seen_repos = HashSet::new();
    let mut unique: Vec<&RepoHit> = Vec::new();
    for hit in hits {
        if seen_repos.insert(hit.id.as_str()) {
            unique.push(hit);
        }
    }

    let owners: BTreeSet<&str> = unique.iter().map(|hit| hit.owner.as_str()).collect();
    let known: HashSet<&str> = OFFICIAL_ORGS.iter().copied().collect();

    for owner in owners {
        if known.contains(owner) {
            continue;
        }
        let stars = unique
            .iter()
            .find(|hit| hit.owner == owner)
            .map(|hit| hit.stars)
            .unwrap_or(0);
        publishers.push(PublisherRecord {
            name: owner.to_string(),
            verified: false,
            kind: PublisherKind::Community,
            stars: Some(stars),
        });
    }

    publishers
}

fn make_snapshot(publishers: Vec<PublisherRecord>) -> PublisherSnapshot {
    let verified_count = publishers.iter().filter(|p| p.verified).count();
    PublisherSnapshot {
        metadata: SnapshotMetadata {
            generated_at: Utc::now(),
            total_publishers: publishers.len(),
            verified_count,
            community_count: publishers.len() - verified_count,
            source: "GitHub Marketplace API".to_string(),
            version: "2.0".to_string(),
        },
        publishers,
    }
}
