//! Shared types, error model, and configuration for ProxyHarvest.
//!
//! This crate is the foundation depended on by all other ProxyHarvest crates.
//! It provides:
//! - [`HarvestError`] — the unified error type
//! - Domain types ([`Category`], [`Record`], [`SourceSet`], [`RunOutcome`], [`RunId`])
//! - Configuration ([`AppConfig`], [`FetchConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FetchConfig, FetchSection, PathsConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{HarvestError, Result};
pub use types::{Category, Record, RunId, RunOutcome, SourceFailure, SourceSet};
