//! Shared types, error model, and configuration for repodocs.
//!
//! This crate is the foundation depended on by all other repodocs crates.
//! It provides:
//! - [`RepoDocsError`], the unified error type
//! - Domain types ([`Document`], [`ProjectInfo`], [`CommitSummary`])
//! - Configuration ([`AppConfig`], [`SiteConfig`], [`AiConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AiConfig, AppConfig, ScanConfig, SiteConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, load_site_config, resolve_api_key,
};
pub use error::{RepoDocsError, Result};
pub use types::{CommitSummary, Document, ProjectInfo};
