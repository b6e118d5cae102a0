//! Shared types, error model, and configuration for pbrtjson.
//!
//! This crate is the foundation depended on by all other pbrtjson crates.
//! It provides:
//! - [`ConvertError`]: the unified error type
//! - Domain types ([`Element`], [`Block`], [`Document`], [`Diagnostics`])
//! - Configuration ([`AppConfig`], [`ConvertOptions`], [`BatchConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AssetRule, BatchConfig, BatchSection, ConversionConfig, ConvertOptions,
    DEFAULT_PRETTY_THRESHOLD_BYTES, DefaultsConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, validate_config,
};
pub use error::{ConvertError, Result};
pub use types::{BLOCK_KEY_PREFIX, Block, Diagnostics, Document, Element, LENGTH_KEY};
