//! Parsing and validation of `kiln.toml` site configuration files.
//!
//! This crate reads the site configuration and produces a strongly-typed
//! [`SiteConfig`] with per-scope compilation settings: the extension-to-provider
//! mapping, batching controls, referenced modules, and case policy.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use resolve::{resolve_scope, ResolvedScope};
pub use types::*;
