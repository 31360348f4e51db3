//! Categorization client: LLM-backed category annotation with cost tracking.
//!
//! Sends a truncated summary of a normalized definition to a chat-completions
//! endpoint with a fixed instruction prompt over a closed 14-label category
//! vocabulary, and parses the structured JSON reply.
//!
//! Failure handling is deliberately coarse: a transport or HTTP error is
//! [`CategorizeError::Unavailable`], a reply that is not the expected JSON is
//! [`CategorizeError::Format`]. Both mean "skip this entry, keep its prior
//! annotations, continue the batch" — never fatal.

use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use thiserror::Error;

use crate::config::CategorizeConfig;
use crate::models::{CatalogEntry, Evidence};

/// The closed category vocabulary, mirroring the marketplace taxonomy.
pub const CATEGORIES: [&str; 14] = [
    "Authentication",
    "Build",
    "Communication",
    "Code quality",
    "Deployment",
    "Dependency management",
    "Documentation",
    "Infrastructure",
    "Monitoring",
    "Notification",
    "Packaging",
    "Publishing",
    "Security",
    "Testing",
];

/// How many inputs are included in the summary sent to the model.
const SUMMARY_INPUT_LIMIT: usize = 3;

#[derive(Debug, Error)]
pub enum CategorizeError {
    #[error("categorization service unavailable: {0}")]
    Unavailable(String),
    #[error("categorization response was not valid JSON: {0}")]
    Format(String),
}

/// Structured categorization returned by the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Categorization {
    pub primary_category: String,
    #[serde(default)]
    pub secondary_categories: Vec<String>,
    #[serde(default)]
    pub all_categories: Vec<String>,
    pub confidence: String,
    pub reasoning: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Categorization {
    /// Final category list: `all_categories` when the model provided it,
    /// otherwise primary followed by secondaries.
    pub fn categories(&self) -> Vec<String> {
        if !self.all_categories.is_empty() {
            return self.all_categories.clone();
        }
        let mut categories = vec![self.primary_category.clone()];
        categories.extend(self.secondary_categories.iter().cloned());
        categories
    }
}

/// Client for the external text-completion service.
pub struct Categorizer {
    http: reqwest::Client,
    config: CategorizeConfig,
    api_key: String,
}

impl Categorizer {
    pub fn new(config: &CategorizeConfig, api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            config: config.clone(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Categorize one entry, returning the parsed categorization and the
    /// monetary cost of the call in USD.
    pub async fn categorize(
        &self,
        entry: &CatalogEntry,
    ) -> Result<(Categorization, f64), CategorizeError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_prompt() },
                { "role": "user", "content": user_prompt(entry) },
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        let response = self
            .http
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| CategorizeError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CategorizeError::Unavailable(format!(
                "{}: {}",
                status, detail
            )));
        }

        let reply: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CategorizeError::Unavailable(e.to_string()))?;

        let input_tokens = reply["usage"]["prompt_tokens"].as_u64().unwrap_or(0);
        let output_tokens = reply["usage"]["completion_tokens"].as_u64().unwrap_or(0);
        let cost = self.cost(input_tokens, output_tokens);

        let content = reply["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                CategorizeError::Format("reply has no message content".to_string())
            })?;

        let categorization = parse_reply(content)?;
        Ok((categorization, cost))
    }

    /// Cost of a call in USD from reported token counts.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let input = input_tokens as f64 / 1_000_000.0 * self.config.input_price_per_million;
        let output = output_tokens as f64 / 1_000_000.0 * self.config.output_price_per_million;
        input + output
    }
}

/// Parse the model's reply content into a [`Categorization`].
pub fn parse_reply(content: &str) -> Result<Categorization, CategorizeError> {
    serde_json::from_str(content).map_err(|e| CategorizeError::Format(e.to_string()))
}

/// Replace an entry's annotations with a fully-successful categorization.
/// Wholesale replacement only — prior evidence is dropped, never merged.
pub fn apply(entry: &mut CatalogEntry, categorization: &Categorization, model: &str) {
    entry.annotations.categories = categorization.categories();
    entry.annotations.confidence = Some(categorization.confidence.clone());
    entry.annotations.evidence = vec![Evidence {
        kind: "llm_categorization".to_string(),
        model: model.to_string(),
        primary_category: Some(categorization.primary_category.clone()),
        reasoning: categorization.reasoning.clone(),
        tags: categorization.tags.clone(),
    }];
}

fn system_prompt() -> String {
    format!(
        "You are an expert at categorizing CI/CD actions.\n\
         Categorize actions into one or more of these categories:\n\
         {}\n\n\
         An action can belong to multiple categories. For example:\n\
         - \"AWS Assume Role\" would be both Authentication + Infrastructure\n\
         - \"Docker Login\" would be Authentication + Packaging\n\
         - \"Send Slack Notification\" would be Communication + Notification\n\n\
         Respond in JSON format with:\n\
         {{\n\
           \"primary_category\": \"...\",\n\
           \"secondary_categories\": [...],\n\
           \"all_categories\": [...],\n\
           \"confidence\": \"high|medium|low\",\n\
           \"reasoning\": \"...\",\n\
           \"tags\": [\"tag1\", \"tag2\", \"tag3\"]\n\
         }}\n\n\
         - primary_category: The most important category\n\
         - secondary_categories: Other relevant categories\n\
         - all_categories: All categories combined (for discovery)\n\
         - confidence: How confident you are in the categorization\n\
         - reasoning: 1-2 sentences explaining why\n\
         - tags: 3-5 searchable tags\n\n\
         Only respond with valid JSON, no other text.",
        CATEGORIES.join(", ")
    )
}

fn user_prompt(entry: &CatalogEntry) -> String {
    format!(
        "Categorize this action:\n\n{}\n\nProvide your categorization as JSON only.",
        summary(entry)
    )
}

/// Truncated summary of a normalized definition: name, description, author,
/// first few inputs, all outputs.
pub fn summary(entry: &CatalogEntry) -> String {
    let definition = &entry.definition;
    let inputs: Vec<_> = definition
        .inputs
        .iter()
        .take(SUMMARY_INPUT_LIMIT)
        .collect();
    let inputs_json =
        serde_json::to_string_pretty(&inputs).unwrap_or_else(|_| "[]".to_string());
    let outputs_json =
        serde_json::to_string_pretty(&definition.outputs).unwrap_or_else(|_| "[]".to_string());

    format!(
        "Action: {}\nName: {}\nDescription: {}\nAuthor: {}\n\n\
         Inputs ({} total):\n{}\n\nOutputs ({} total):\n{}",
        entry.action_id,
        definition.name,
        definition.description,
        definition.author,
        definition.inputs.len(),
        inputs_json,
        definition.outputs.len(),
        outputs_json,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Annotations, CacheInfo, Definition, InputSpec, SourceInfo, SourceKind,
    };
    use chrono::Utc;

    fn entry_with_inputs(count: usize) -> CatalogEntry {
        CatalogEntry {
            action_id: "marketplace/acme/deploy".to_string(),
            version_id: "abcdef012345".to_string(),
            source: SourceInfo {
                kind: SourceKind::Marketplace,
                path: "blueprints/marketplace/acme/deploy/action.yml".to_string(),
                origin: Some("github.com/acme/deploy".to_string()),
                publisher: Some("acme".to_string()),
                verified: false,
                latest_release: None,
            },
            definition: Definition {
                name: "Deploy".to_string(),
                description: "Deploys things".to_string(),
                author: "acme".to_string(),
                inputs: (0..count)
                    .map(|i| InputSpec {
                        name: format!("input{}", i),
                        required: false,
                        default: None,
                        description: String::new(),
                    })
                    .collect(),
                outputs: vec![],
                runs: serde_json::json!({}),
            },
            annotations: Annotations::default(),
            cache: CacheInfo {
                source_hash: "00".repeat(32),
                taxonomy_version: "0.0.1".to_string(),
                prompt_version: "v1".to_string(),
                generated_at: Utc::now(),
            },
        }
    }

    #[test]
    fn parses_well_formed_reply() {
        let reply = r#"{"primary_category":"Security","secondary_categories":["Authentication"],"all_categories":["Security","Authentication"],"confidence":"high","reasoning":"Handles credentials.","tags":["auth"]}"#;
        let categorization = parse_reply(reply).unwrap();
        assert_eq!(categorization.primary_category, "Security");
        assert_eq!(
            categorization.categories(),
            vec!["Security".to_string(), "Authentication".to_string()]
        );
        assert_eq!(categorization.confidence, "high");
    }

    #[test]
    fn non_json_reply_is_a_format_error() {
        let err = parse_reply("Sure! Here are the categories: Security.").unwrap_err();
        assert!(matches!(err, CategorizeError::Format(_)));
    }

    #[test]
    fn categories_fall_back_to_primary_plus_secondary() {
        let reply = r#"{"primary_category":"Build","secondary_categories":["Testing"],"confidence":"medium","reasoning":"Compiles and tests."}"#;
        let categorization = parse_reply(reply).unwrap();
        assert_eq!(
            categorization.categories(),
            vec!["Build".to_string(), "Testing".to_string()]
        );
        assert!(categorization.tags.is_empty());
    }

    #[test]
    fn apply_replaces_annotations_wholesale() {
        let mut entry = entry_with_inputs(0);
        entry.annotations.categories = vec!["Stale".to_string()];
        entry.annotations.evidence = vec![Evidence {
            kind: "llm_categorization".to_string(),
            model: "old-model".to_string(),
            primary_category: Some("Stale".to_string()),
            reasoning: "old".to_string(),
            tags: vec![],
        }];

        let categorization = parse_reply(
            r#"{"primary_category":"Security","all_categories":["Security","Authentication"],"confidence":"high","reasoning":"auth","tags":["auth"]}"#,
        )
        .unwrap();
        apply(&mut entry, &categorization, "gpt-4o-mini");

        assert_eq!(
            entry.annotations.categories,
            vec!["Security".to_string(), "Authentication".to_string()]
        );
        assert_eq!(entry.annotations.confidence.as_deref(), Some("high"));
        assert_eq!(entry.annotations.evidence.len(), 1);
        assert_eq!(entry.annotations.evidence[0].model, "gpt-4o-mini");
        assert_eq!(
            entry.annotations.evidence[0].primary_category.as_deref(),
            Some("Security")
        );
    }

    #[test]
    fn cost_uses_per_million_prices() {
        let categorizer =
            Categorizer::new(&CategorizeConfig::default(), "key".to_string()).unwrap();
        // 1M input at $0.15 + 1M output at $0.60
        let cost = categorizer.cost(1_000_000, 1_000_000);
        assert!((cost - 0.75).abs() < 1e-9);
        assert_eq!(categorizer.cost(0, 0), 0.0);
    }

    #[test]
    fn summary_truncates_inputs_but_reports_totals() {
        let entry = entry_with_inputs(7);
        let text = summary(&entry);
        assert!(text.contains("Inputs (7 total)"));
        assert!(text.contains("input2"));
        assert!(!text.contains("input3"));
    }

    #[test]
    fn vocabulary_has_fourteen_labels() {
        assert_eq!(CATEGORIES.len(), 14);
    }
}
