//! # Action Catalog CLI (`acat`)
//!
//! The `acat` binary builds and maintains the action catalog. It provides
//! three independent workflows:
//!
//! | Command | Description |
//! |---------|-------------|
//! | `acat build` | Scan blueprints, rebuild changed entries, categorize |
//! | `acat fetch` | Populate blueprints from the remote hosting API |
//! | `acat publishers` | Discover publishers and write the snapshot file |
//!
//! ## Examples
//!
//! ```bash
//! # Discover publishers, fetch their definitions, build the catalog
//! acat publishers
//! acat fetch
//! acat build
//!
//! # Force a full rebuild without categorization
//! acat build --no-cache --no-categorize
//!
//! # Refresh only release information on existing entries
//! acat build --update-releases
//! ```
//!
//! ## Environment
//!
//! `GITHUB_TOKEN` enables release fetching and is required by `fetch` and
//! `publishers`. `OPENAI_API_KEY` enables categorization. Absence of either
//! degrades the build (no releases / no categories) rather than aborting it.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use action_catalog::build::{self, BuildOptions};
use action_catalog::config;
use action_catalog::fetch;
use action_catalog::publishers;

/// Action catalog builder — scan, hash, enrich, and categorize reusable
/// CI/CD action definitions.
#[derive(Parser)]
#[command(
    name = "acat",
    about = "Action catalog builder - scan, hash, enrich, and categorize CI/CD action definitions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file uses built-in
    /// defaults (blueprints/, catalog/, config/publishers.json).
    #[arg(long, global = true, default_value = "./config/acat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the catalog from the blueprints tree.
    ///
    /// Scans internal and marketplace definitions, rebuilds entries whose
    /// content hash changed, writes latest + version snapshots, then
    /// categorizes entries lacking annotations.
    Build {
        /// Ignore cached hashes — rebuild every entry.
        #[arg(long)]
        no_cache: bool,

        /// Skip the categorization pass.
        #[arg(long)]
        no_categorize: bool,

        /// Re-categorize entries that already have annotations.
        #[arg(long)]
        force_categorize: bool,

        /// Also rebuild unchanged marketplace entries whose publisher
        /// verification status differs from the stored value.
        #[arg(long)]
        force_publisher_update: bool,

        /// Only refresh release information on existing entries, then exit.
        #[arg(long)]
        update_releases: bool,
    },

    /// Fetch marketplace definitions from the remote hosting API.
    ///
    /// Driven by the publisher snapshot file; requires GITHUB_TOKEN.
    Fetch,

    /// Discover verified and community publishers and write the snapshot.
    ///
    /// Requires GITHUB_TOKEN.
    Publishers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Build {
            no_cache,
            no_categorize,
            force_categorize,
            force_publisher_update,
            update_releases,
        } => {
            if update_releases {
                build::run_update_releases(&cfg).await?;
            } else {
                let opts = BuildOptions {
                    no_cache,
                    no_categorize,
                    force_categorize,
                    force_publisher_update,
                };
                build::run_build(&cfg, &opts).await?;
            }
        }
        Commands::Fetch => {
            fetch::run_fetch(&cfg).await?;
        }
        Commands::Publishers => {
            publishers::run_discover(&cfg).await?;
        }
    }

    Ok(())
}
