//! Release fetcher: newest published release for a marketplace origin.
//!
//! One request per entry per run, no retry. Every failure mode — transport,
//! auth, rate limit, unparseable origin — collapses to [`ReleaseOutcome::
//! Unavailable`], which the pipeline treats exactly like "no release":
//! the entry is stored without release information, never aborted.

use std::time::Duration;

use anyhow::Result;

use crate::config::HostingConfig;
use crate::models::LatestRelease;

/// Result of a release lookup. `NoRelease` and `Unavailable` are handled
/// identically by callers; they are distinguished only for reporting.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseOutcome {
    Release(LatestRelease),
    /// The remote reports no published releases (HTTP 404).
    NoRelease,
    /// Transport, auth, or rate-limit failure.
    Unavailable,
}

impl ReleaseOutcome {
    pub fn into_release(self) -> Option<LatestRelease> {
        match self {
            ReleaseOutcome::Release(release) => Some(release),
            _ => None,
        }
    }
}

/// Client for the remote hosting REST API's releases endpoint.
pub struct ReleaseClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl ReleaseClient {
    pub fn new(config: &HostingConfig, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Fetch the most recent published release for an origin of the form
    /// `github.com/<owner>/<repo>`.
    pub async fn latest_release(&self, origin: &str) -> ReleaseOutcome {
        let token = match &self.token {
            Some(token) => token,
            None => return ReleaseOutcome::Unavailable,
        };
        let (owner, repo) = match parse_origin(origin) {
            Some(parts) => parts,
            None => return ReleaseOutcome::Unavailable,
        };

        let url = format!("{}/repos/{}/{}/releases/latest", self.api_base, owner, repo);
        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", "acat")
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(_) => return ReleaseOutcome::Unavailable,
        };

        match response.status().as_u16() {
            200 => match response.json::<LatestRelease>().await {
                Ok(release) => ReleaseOutcome::Release(release),
                Err(_) => ReleaseOutcome::Unavailable,
            },
            404 => ReleaseOutcome::NoRelease,
            _ => ReleaseOutcome::Unavailable,
        }
    }
}

/// Split a `host/owner/repo` origin into owner and repo. Extra path
/// segments beyond the repo are ignored.
fn parse_origin(origin: &str) -> Option<(&str, &str)> {
    let rest = origin.strip_prefix("github.com/").unwrap_or(origin);
    let mut parts = rest.split('/').filter(|s| !s.is_empty());
    let owner = parts.next()?;
    let repo = parts.next()?;
    Some((owner, repo))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_origin() {
        assert_eq!(
            parse_origin("github.com/actions/checkout"),
            Some(("actions", "checkout"))
        );
    }

    #[test]
    fn tolerates_missing_host_prefix() {
        assert_eq!(parse_origin("acme/deploy"), Some(("acme", "deploy")));
    }

    #[test]
    fn rejects_origin_without_repo() {
        assert_eq!(parse_origin("github.com/actions"), None);
        assert_eq!(parse_origin(""), None);
    }

    #[test]
    fn release_json_defaults_flags() {
        let release: LatestRelease = serde_json::from_str(
            r#"{"tag_name": "v1.0.0", "name": null, "published_at": "2024-01-01T00:00:00Z", "html_url": "https://github.com/a/b/releases/tag/v1.0.0"}"#,
        )
        .unwrap();
        assert_eq!(release.tag_name.as_deref(), Some("v1.0.0"));
        assert!(!release.prerelease);
        assert!(!release.draft);
    }

    #[tokio::test]
    async fn missing_token_is_unavailable() {
        let client = ReleaseClient::new(&crate::config::HostingConfig::default(), None).unwrap();
        assert!(!client.has_token());
        let outcome = client.latest_release("github.com/actions/checkout").await;
        assert_eq!(outcome, ReleaseOutcome::Unavailable);
        assert_eq!(outcome.into_release(), None);
    }
}
