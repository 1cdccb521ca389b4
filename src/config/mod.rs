//! Configuration for batch runs
//!
//! Provides types, discovery and parsing for `atlas.toml`.

pub mod loader;
pub mod schema;

pub use loader::{find_config, find_config_from, load_config, load_config_file, ConfigError, LoadedConfig};
pub use schema::*;
