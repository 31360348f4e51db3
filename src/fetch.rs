//! Definition fetch: populate the blueprints tree from the remote hosting
//! API.
//!
//! Driven entirely by the publisher snapshot file — no flags. For each
//! publisher, two paginated GraphQL passes run over its public repositories
//! (stars descending, 100 per page): one selecting root-level
//! `action.yml`/`action.yaml` blobs, one listing `.github/actions` tree
//! entries whose definitions are then downloaded via the REST contents API.
//!
//! A GraphQL failure ends that publisher's loop with a warning; the run
//! continues with the next publisher. The hosting token is required by
//! design.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};

use crate::config::Config;
use crate::models::PublisherSnapshot;

const ROOT_ACTIONS_QUERY: &str = r#"
query($owner: String!, $after: String) {
  repositoryOwner(login: $owner) {
    repositories(first: 100, after: $after, privacy: PUBLIC, orderBy: {field: STARGAZERS, direction: DESC}) {
      pageInfo {
        hasNextPage
        endCursor
      }
      nodes {
        name
        action: object(expression: "HEAD:action.yml") {
          ... on Blob {
            text
          }
        }
        actionYaml: object(expression: "HEAD:action.yaml") {
          ... on Blob {
            text
          }
        }
      }
    }
  }
}
"#;

const COMPOSITE_ACTIONS_QUERY: &str = r#"
query($owner: String!, $after: String) {
  repositoryOwner(login: $owner) {
    repositories(first: 100, after: $after, privacy: PUBLIC, orderBy: {field: STARGAZERS, direction: DESC}) {
      pageInfo {
        hasNextPage
        endCursor
      }
      nodes {
        name
        githubDir: object(expression: "HEAD:.github/actions") {
          ... on Tree {
            entries {
              name
              type
            }
          }
        }
      }
    }
  }
}
"#;

/// A definition fetched from the remote, ready to be written locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAction {
    /// Directory name under `marketplace/<publisher>/`.
    pub name: String,
    /// Raw definition file content.
    pub definition: String,
}

/// Minimal GraphQL client for the hosting API.
pub struct HostingGraphql {
    http: reqwest::Client,
    url: String,
    api_base: String,
    token: String,
}

impl HostingGraphql {
    pub fn new(config: &Config, token: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.hosting.timeout_secs.max(30)))
            .build()?;
        Ok(Self {
            http,
            url: config.hosting.graphql_url.clone(),
            api_base: config.hosting.api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Execute one GraphQL query; a non-200 status or an `errors` key in
    /// the reply is an error.
    async fn query(&self, query: &str, variables: Value) -> Result<Value> {
        let response = self
            .http
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "acat")
            .json(&json!({ "query": query, "variables": variables }))
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
        Ok(body["data"].clone())
    }

    /// All repositories of a publisher with a root-level definition file.
    pub async fn fetch_root_actions(&self, publisher: &str) -> Result<Vec<FetchedAction>> {
        let mut actions = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let data = self
                .query(ROOT_ACTIONS_QUERY, json!({ "owner": publisher, "after": after }))
                .await?;
            let page = match repository_page(&data) {
                Some(page) => page,
                None => break,
            };

            for node in page.nodes {
                if let Some(action) = root_action_from_node(node) {
                    actions.push(action);
                }
            }

            match page.next_cursor {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        Ok(actions)
    }

    /// Composite actions under `.github/actions/` across a publisher's
    /// repositories. Tree listing comes from GraphQL; each definition is
    /// downloaded separately via the REST contents API.
    pub async fn fetch_composite_actions(&self, publisher: &str) -> Result<Vec<FetchedAction>> {
        let mut actions = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let data = self
                .query(
                    COMPOSITE_ACTIONS_QUERY,
                    json!({ "owner": publisher, "after": after }),
                )
                .await?;
            let page = match repository_page(&data) {
                Some(page) => page,
                None => break,
            };

            for node in page.nodes {
                let repo_name = match node["name"].as_str() {
                    Some(name) => name,
                    None => continue,
                };
                for action_name in composite_dirs_from_node(node) {
                    if let Some(definition) = self
                        .download_composite_definition(publisher, repo_name, &action_name)
                        .await
                    {
                        actions.push(FetchedAction {
                            name: format!("{}-{}", repo_name, action_name),
                            definition,
                        });
                    }
                }
            }

            match page.next_cursor {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        Ok(actions)
    }

    /// Download one composite action's definition, trying `action.yml`
    /// then `action.yaml`. Any failure yields None.
    async fn download_composite_definition(
        &self,
        publisher: &str,
        repo: &str,
        action: &str,
    ) -> Option<String> {
        for file in ["action.yml", "action.yaml"] {
            let url = format!(
                "{}/repos/{}/{}/contents/.github/actions/{}/{}",
                self.api_base, publisher, repo, action, file
            );
            let response = self
                .http
                .get(&url)
                .header("Authorization", format!("Bearer {}", self.token))
                .header("User-Agent", "acat")
                .send()
                .await
                .ok()?;

            if !response.status().is_success() {
                continue;
            }
            let content: Value = response.json().await.ok()?;
            if content["type"].as_str() == Some("file") {
                if let Some(decoded) = decode_contents(content["content"].as_str()?) {
                    return Some(decoded);
                }
            }
        }
        None
    }
}

struct RepositoryPage<'a> {
    nodes: &'a [Value],
    next_cursor: Option<String>,
}

/// Pull the repository nodes and pagination cursor out of one reply page.
fn repository_page(data: &Value) -> Option<RepositoryPage<'_>> {
    let repositories = data.get("repositoryOwner")?.get("repositories")?;
    let nodes = repositories["nodes"].as_array()?;
    let next_cursor = if repositories["pageInfo"]["hasNextPage"]
        .as_bool()
        .unwrap_or(false)
    {
        repositories["pageInfo"]["endCursor"]
            .as_str()
            .map(str::to_string)
    } else {
        None
    };
    Some(RepositoryPage {
        nodes,
        next_cursor,
    })
}

/// Extract a root-level action from a repository node, preferring
/// `action.yml` over `action.yaml`.
fn root_action_from_node(node: &Value) -> Option<FetchedAction> {
    let name = node["name"].as_str()?;
    let text = node["action"]["text"]
        .as_str()
        .filter(|t| !t.is_empty())
        .or_else(|| node["actionYaml"]["text"].as_str().filter(|t| !t.is_empty()))?;
    Some(FetchedAction {
        name: name.to_string(),
        definition: text.to_string(),
    })
}

/// Names of `.github/actions/<name>` subdirectories in a repository node.
fn composite_dirs_from_node(node: &Value) -> Vec<String> {
    node["githubDir"]["entries"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter(|e| e["type"].as_str() == Some("Tree"))
                .filter_map(|e| e["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Decode a REST contents-API payload (base64 with embedded newlines).
fn decode_contents(encoded: &str) -> Option<String> {
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64.decode(cleaned).ok()?;
    String::from_utf8(bytes).ok()
}

/// Write a fetched definition to `marketplace/<publisher>/<name>/action.yml`.
fn save_definition(
    marketplace_dir: &Path,
    publisher: &str,
    action: &FetchedAction,
) -> Result<PathBuf> {
    let dir = marketplace_dir.join(publisher).join(&action.name);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let file = dir.join("action.yml");
    std::fs::write(&file, &action.definition)
        .with_context(|| format!("failed to write {}", file.display()))?;
    Ok(file)
}

/// Run the definition-fetch workflow.
pub async fn run_fetch(config: &Config) -> Result<()> {
    let token = match std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => bail!("GITHUB_TOKEN is required for fetching definitions"),
    };
    let client = HostingGraphql::new(config, token)?;
    let marketplace_dir = config.paths.blueprints_dir.join("marketplace");

    let publishers = match load_publisher_names(&config.paths.publishers_file) {
        Some(publishers) => publishers,
        None => {
            println!(
                "{} not found - run `acat publishers` first",
                config.paths.publishers_file.display()
            );
            return Ok(());
        }
    };

    println!("fetch");
    println!("  publishers: {}", publishers.len());

    let mut saved = 0usize;
    let mut failed = 0usize;

    for publisher in &publishers {
        println!("  {}", publisher);

        let root_actions = match client.fetch_root_actions(publisher).await {
            Ok(actions) => actions,
            Err(e) => {
                println!("    warning: {}", e);
                Vec::new()
            }
        };
        let composite_actions = match client.fetch_composite_actions(publisher).await {
            Ok(actions) => actions,
            Err(e) => {
                println!("    warning: {}", e);
                Vec::new()
            }
        };

        for action in root_actions.iter().chain(composite_actions.iter()) {
            match save_definition(&marketplace_dir, publisher, action) {
                Ok(_) => {
                    println!("    {}/{} ... saved", publisher, action.name);
                    saved += 1;
                }
                Err(e) => {
                    println!("    {}/{} ... failed: {}", publisher, action.name, e);
                    failed += 1;
                }
            }
        }
    }

    println!("  saved: {}", saved);
    println!("  failed: {}", failed);
    println!("ok");
    Ok(())
}

fn load_publisher_names(path: &Path) -> Option<Vec<String>> {
    let content = std::fs::read_to_string(path).ok()?;
    let snapshot: PublisherSnapshot = serde_json::from_str(&content).ok()?;
    Some(snapshot.publishers.into_iter().map(|p| p.name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(nodes: Value, has_next: bool, cursor: Option<&str>) -> Value {
        json!({
            "repositoryOwner": {
                "repositories": {
                    "pageInfo": { "hasNextPage": has_next, "endCursor": cursor },
                    "nodes": nodes,
                }
            }
        })
    }

    #[test]
    fn extracts_root_actions_preferring_yml() {
        let data = page(
            json!([
                { "name": "checkout", "action": { "text": "name: Checkout" }, "actionYaml": null },
                { "name": "cache", "action": null, "actionYaml": { "text": "name: Cache" } },
                { "name": "no-action", "action": null, "actionYaml": null },
            ]),
            false,
            None,
        );

        let page = repository_page(&data).unwrap();
        let actions: Vec<_> = page.nodes.iter().filter_map(root_action_from_node).collect();
        assert_eq!(
            actions,
            vec![
                FetchedAction {
                    name: "checkout".to_string(),
                    definition: "name: Checkout".to_string(),
                },
                FetchedAction {
                    name: "cache".to_string(),
                    definition: "name: Cache".to_string(),
                },
            ]
        );
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn pagination_cursor_only_when_next_page() {
        let data = page(json!([]), true, Some("cursor-1"));
        let page = repository_page(&data).unwrap();
        assert_eq!(page.next_cursor.as_deref(), Some("cursor-1"));
    }

    #[test]
    fn missing_owner_ends_iteration() {
        assert!(repository_page(&json!({ "repositoryOwner": null })).is_none());
        assert!(repository_page(&json!({})).is_none());
    }

    #[test]
    fn composite_dirs_only_include_trees() {
        let node = json!({
            "name": "platform",
            "githubDir": {
                "entries": [
                    { "name": "setup", "type": "Tree" },
                    { "name": "README.md", "type": "Blob" },
                    { "name": "teardown", "type": "Tree" },
                ]
            }
        });
        assert_eq!(composite_dirs_from_node(&node), vec!["setup", "teardown"]);

        let bare = json!({ "name": "bare", "githubDir": null });
        assert!(composite_dirs_from_node(&bare).is_empty());
    }

    #[test]
    fn decodes_contents_with_embedded_newlines() {
        // "name: Setup\n" base64-encoded, wrapped like the contents API does.
        let encoded = "bmFtZTog\nU2V0dXAK\n";
        assert_eq!(decode_contents(encoded).as_deref(), Some("name: Setup\n"));
        assert!(decode_contents("!!! not base64").is_none());
    }

    #[test]
    fn saves_definition_under_publisher_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let action = FetchedAction {
            name: "deploy".to_string(),
            definition: "name: Deploy\n".to_string(),
        };
        let file = save_definition(tmp.path(), "acme", &action).unwrap();
        assert_eq!(file, tmp.path().join("acme").join("deploy").join("action.yml"));
        assert_eq!(std::fs::read_to_string(file).unwrap(), "name: Deploy\n");
    }
}
