//! Shared types, error model, and configuration for calmerge.
//!
//! This crate is the foundation depended on by all other calmerge crates.
//! It provides:
//! - [`CalMergeError`], the unified error type
//! - Domain types ([`FeedLink`], [`EventBlock`])
//! - Configuration ([`AppConfig`], [`MergeConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CalendarConfig, CalendarProperties, ConfigOverrides, FetchConfig, MergeConfig,
    OutputConfig, OutputTarget, SourceConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{CalMergeError, Result};
pub use types::{EventBlock, FeedLink};
