//! Utilities shared by the studio CLI, API client, and engine.

pub mod config;
pub mod date_handling;
pub mod flatten;
pub mod http;
pub mod table;
pub mod text_processing;

pub use config::{ConfigError, ConfigOverrides, ConfigStore, StudioConfig, expand_tilde};
pub use flatten::{DEFAULT_SEPARATOR, FlatParameters, FlattenError, flatten, unflatten};
pub use table::{Table, json_cell};
pub use text_processing::redact_sensitive;
