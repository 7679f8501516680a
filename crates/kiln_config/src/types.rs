//! Configuration types deserialized from `kiln.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The top-level site configuration parsed from `kiln.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct SiteConfig {
    /// Site-wide compilation settings.
    #[serde(default)]
    pub compilation: CompilationConfig,
    /// Per-directory overrides, keyed by rooted virtual path prefix
    /// (e.g., `[scopes."/admin"]`).
    #[serde(default)]
    pub scopes: BTreeMap<String, ScopeOverride>,
}

/// Site-wide compilation settings.
#[derive(Debug, Deserialize)]
pub struct CompilationConfig {
    /// Whether sibling sources are batched into shared compiled modules.
    #[serde(default = "default_batch")]
    pub batch: bool,
    /// Maximum number of partial-type-producing code units per compiled module.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Whether virtual paths are compared case-insensitively.
    #[serde(default)]
    pub case_insensitive: bool,
    /// Extension-to-provider-kind mapping. Extensions are configured without
    /// a leading dot (e.g., `page = "markup"`).
    #[serde(default)]
    pub providers: BTreeMap<String, String>,
    /// Module names made available to every compilation.
    #[serde(default)]
    pub referenced_modules: Vec<String>,
    /// Virtual paths excluded from batch enumeration.
    #[serde(default)]
    pub ignore_paths: Vec<String>,
    /// Optional virtual path of a file listing further paths to ignore,
    /// one per line.
    #[serde(default)]
    pub ignore_file: Option<String>,
}

fn default_batch() -> bool {
    true
}

fn default_max_batch_size() -> usize {
    1000
}

impl Default for CompilationConfig {
    fn default() -> Self {
        Self {
            batch: default_batch(),
            max_batch_size: default_max_batch_size(),
            case_insensitive: false,
            providers: BTreeMap::new(),
            referenced_modules: Vec::new(),
            ignore_paths: Vec::new(),
            ignore_file: None,
        }
    }
}

/// Compilation settings overridden for one directory scope.
///
/// Absent fields inherit the site-wide value. The provider table is merged
/// additively: scope entries overlay the site-wide mapping.
#[derive(Debug, Default, Deserialize)]
pub struct ScopeOverride {
    /// Overrides [`CompilationConfig::batch`].
    pub batch: Option<bool>,
    /// Overrides [`CompilationConfig::max_batch_size`].
    pub max_batch_size: Option<usize>,
    /// Provider mappings overlaid on the site-wide table.
    #[serde(default)]
    pub providers: BTreeMap<String, String>,
    /// Module names referenced in addition to the site-wide list.
    #[serde(default)]
    pub referenced_modules: Vec<String>,
}
