use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration for the `acat` binary.
///
/// Every section has defaults matching the conventional working-tree layout
/// (`blueprints/`, `catalog/`, `config/publishers.json`), so a missing
/// config file is not an error.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub categorize: CategorizeConfig,
    #[serde(default)]
    pub hosting: HostingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_blueprints_dir")]
    pub blueprints_dir: PathBuf,
    #[serde(default = "default_catalog_dir")]
    pub catalog_dir: PathBuf,
    #[serde(default = "default_publishers_file")]
    pub publishers_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            blueprints_dir: default_blueprints_dir(),
            catalog_dir: default_catalog_dir(),
            publishers_file: default_publishers_file(),
        }
    }
}

fn default_blueprints_dir() -> PathBuf {
    PathBuf::from("blueprints")
}
fn default_catalog_dir() -> PathBuf {
    PathBuf::from("catalog")
}
fn default_publishers_file() -> PathBuf {
    PathBuf::from("config/publishers.json")
}

/// Settings for the LLM categorization client.
#[derive(Debug, Deserialize, Clone)]
pub struct CategorizeConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// USD per million input tokens.
    #[serde(default = "default_input_price")]
    pub input_price_per_million: f64,
    /// USD per million output tokens.
    #[serde(default = "default_output_price")]
    pub output_price_per_million: f64,
    #[serde(default = "default_categorize_timeout")]
    pub timeout_secs: u64,
}

impl Default for CategorizeConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            input_price_per_million: default_input_price(),
            output_price_per_million: default_output_price(),
            timeout_secs: default_categorize_timeout(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_temperature() -> f64 {
    0.3
}
fn default_max_tokens() -> u32 {
    400
}
fn default_input_price() -> f64 {
    0.15
}
fn default_output_price() -> f64 {
    0.60
}
fn default_categorize_timeout() -> u64 {
    60
}

/// Settings for the remote VCS hosting API (releases, GraphQL).
#[derive(Debug, Deserialize, Clone)]
pub struct HostingConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,
    #[serde(default = "default_hosting_timeout")]
    pub timeout_secs: u64,
}

impl Default for HostingConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            graphql_url: default_graphql_url(),
            timeout_secs: default_hosting_timeout(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_graphql_url() -> String {
    "https://api.github.com/graphql".to_string()
}
fn default_hosting_timeout() -> u64 {
    10
}

/// Load configuration, falling back to built-in defaults when the file does
/// not exist. A file that exists but fails to parse is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.categorize.max_tokens == 0 {
        anyhow::bail!("categorize.max_tokens must be > 0");
    }
    if !(0.0..=2.0).contains(&config.categorize.temperature) {
        anyhow::bail!("categorize.temperature must be in [0.0, 2.0]");
    }
    if config.categorize.input_price_per_million < 0.0
        || config.categorize.output_price_per_million < 0.0
    {
        anyhow::bail!("categorize token prices must be >= 0");
    }
    if config.hosting.timeout_secs == 0 {
        anyhow::bail!("hosting.timeout_secs must be > 0");
    }

    Ok(config)
}
