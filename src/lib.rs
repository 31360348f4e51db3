//! # Action Catalog
//!
//! A catalog builder for reusable CI/CD action definitions. `acat` scans a
//! local blueprints tree for `action.yml` files, normalizes each definition
//! into a canonical JSON record, enriches it with publisher trust status and
//! the latest remote release, and persists it as a mutable latest record
//! plus immutable content-addressed version snapshots. A second pass
//! annotates entries with LLM-generated categories, tracking token cost.
//!
//! ## Pipeline
//!
//! ```text
//! ┌────────────┐   ┌───────────────┐   ┌─────────────┐   ┌─────────────┐
//! │  discover  │──▶│ parse+identity│──▶│   planner   │──▶│    store    │
//! │ blueprints │   │  (normalize,  │   │ skip/rebuild│   │ latest.json │
//! └────────────┘   │    SHA-256)   │   └─────────────┘   │ + snapshots │
//!                  └───────────────┘          │          └──────┬──────┘
//!                                     ┌───────┴───────┐         │
//!                                     │  enrichment   │   ┌─────▼──────┐
//!                                     │ registry +    │   │ categorize │
//!                                     │ release fetch │   │ (LLM pass) │
//!                                     └───────────────┘   └────────────┘
//! ```
//!
//! Incremental rebuilds are driven by content identity: the SHA-256 of the
//! raw definition bytes is compared against the hash cached in the existing
//! latest record, so unchanged entries are skipped entirely.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`discover`] | Blueprints tree scanning |
//! | [`parse`] | Definition normalization |
//! | [`identity`] | Content hashing |
//! | [`registry`] | Publisher trust registry |
//! | [`planner`] | Skip/rebuild decisions |
//! | [`store`] | Directory-per-entry persistence |
//! | [`release`] | Latest-release lookups |
//! | [`categorize`] | LLM categorization with cost tracking |
//! | [`build`] | Pipeline orchestration |
//! | [`fetch`] | Marketplace definition fetch |
//! | [`publishers`] | Publisher discovery |

pub mod build;
pub mod categorize;
pub mod config;
pub mod discover;
pub mod fetch;
pub mod identity;
pub mod models;
pub mod parse;
pub mod planner;
pub mod publishers;
pub mod registry;
pub mod release;
pub mod store;
