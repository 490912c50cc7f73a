//! Shared types, error model, and configuration for histmerge.
//!
//! This crate is the foundation depended on by all other histmerge crates.
//! It provides:
//! - [`HistmergeError`] — the unified error type
//! - Configuration ([`AppConfig`], config loading)
//! - Domain constants and the work-queue [`ResumeToken`]

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, RunConfig, SiteConfig, bot_password, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{HistmergeError, Result};
pub use types::{RECORD_TEMPLATE, ResumeToken, SOURCE_TEMPLATE_TAGS};
