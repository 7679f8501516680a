//! Scope resolution: merging site-wide and per-directory settings.

use crate::types::SiteConfig;
use kiln_common::VirtualPath;
use std::collections::BTreeMap;

/// Compilation settings fully resolved for one virtual path.
///
/// The site-wide settings form the base; the longest matching scope prefix
/// overlays its overrides. Provider mappings merge additively, referenced
/// modules append, and scalar settings replace.
#[derive(Debug)]
pub struct ResolvedScope {
    /// The matched scope prefix, if any.
    pub scope: Option<String>,
    /// Whether sibling batching is enabled here.
    pub batch: bool,
    /// Maximum partial-type producers per compiled module.
    pub max_batch_size: usize,
    /// Merged extension-to-provider-kind mapping.
    pub providers: BTreeMap<String, String>,
    /// Referenced module names (site-wide first, then scope additions).
    pub referenced_modules: Vec<String>,
}

impl ResolvedScope {
    /// Looks up the provider kind configured for an extension.
    ///
    /// Extensions are matched case-insensitively.
    pub fn provider_for(&self, extension: &str) -> Option<&str> {
        let folded = extension.to_ascii_lowercase();
        self.providers.get(&folded).map(String::as_str)
    }
}

/// Resolves the compilation settings that apply at `path`.
///
/// Scope prefixes match whole path segments: `/admin` applies to
/// `/admin/x.page` but not to `/administrata/x.page`. When several scopes
/// match, the longest prefix wins.
pub fn resolve_scope(config: &SiteConfig, path: &VirtualPath) -> ResolvedScope {
    let base = &config.compilation;

    let mut matched: Option<&str> = None;
    for scope in config.scopes.keys() {
        if !scope_matches(scope, path) {
            continue;
        }
        if matched.map_or(true, |m| scope.len() > m.len()) {
            matched = Some(scope);
        }
    }

    let mut providers: BTreeMap<String, String> = base
        .providers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
        .collect();
    let mut referenced = base.referenced_modules.clone();
    let mut batch = base.batch;
    let mut max_batch_size = base.max_batch_size;

    if let Some(scope) = matched {
        let over = &config.scopes[scope];
        if let Some(b) = over.batch {
            batch = b;
        }
        if let Some(m) = over.max_batch_size {
            max_batch_size = m;
        }
        for (k, v) in &over.providers {
            providers.insert(k.to_ascii_lowercase(), v.clone());
        }
        referenced.extend(over.referenced_modules.iter().cloned());
    }

    ResolvedScope {
        scope: matched.map(String::from),
        batch,
        max_batch_size,
        providers,
        referenced_modules: referenced,
    }
}

fn scope_matches(scope: &str, path: &VirtualPath) -> bool {
    path.as_str() == scope || path.starts_with(&format!("{scope}/"))
}
