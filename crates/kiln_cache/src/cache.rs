//! The artifact cache and its invalidation cascade.

use crate::entry::CacheEntry;
use kiln_common::ModuleRef;
use std::collections::HashMap;
use std::sync::Mutex;

/// Thread-safe cache mapping virtual-path keys to built artifacts.
///
/// All state lives behind one mutex and every operation is a short critical
/// section; expensive build work never runs under it. Keys are the
/// case-policy-resolved forms produced by
/// [`VirtualPath::cache_key`](kiln_common::VirtualPath::cache_key).
///
/// Besides the entry table, the cache owns the module reverse index (which
/// identifiers share which compiled module) and the registries of referenced
/// modules that the orchestrator folds into every compilation: dynamically
/// registered component modules, embedder-supplied top-level modules, and the
/// application entry module.
pub struct ArtifactCache {
    inner: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Secondary index restricted to entries that share a compiled module;
    /// scanned to find batched siblings when one of them is invalidated.
    module_index: HashMap<String, ModuleRef>,
    /// Modules produced by component builds, visible to all later builds.
    dynamic: Vec<ModuleRef>,
    /// Embedder-registered modules (shared code, resources).
    top_level: Vec<ModuleRef>,
    /// The module produced by the application entry build, if any.
    app_module: Option<ModuleRef>,
}

impl ArtifactCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CacheState::default()),
        }
    }

    /// Looks up the entry for `key`.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.inner.lock().unwrap().entries.get(key).cloned()
    }

    /// Returns `true` if an entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().unwrap().entries.contains_key(key)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts the entry for `key`, indexing its module for the invalidation
    /// cascade when `index_module` is set (non-synthetic builds).
    ///
    /// Idempotent: re-inserting for a key that already has an entry is a
    /// no-op and returns `false`.
    pub fn put(&self, key: &str, entry: CacheEntry, index_module: bool) -> bool {
        let mut state = self.inner.lock().unwrap();
        if state.entries.contains_key(key) {
            return false;
        }
        if index_module {
            if let Some(module) = &entry.module {
                state.module_index.insert(key.to_string(), module.clone());
            }
        }
        state.entries.insert(key.to_string(), entry);
        true
    }

    /// Removes the entry for `key` and cascades to every other identifier
    /// sharing its compiled module.
    ///
    /// The invalidated type must not survive in a still-referenced module, so
    /// the module is also dropped from the dynamic referenced list and every
    /// co-batched sibling is removed so it gets recompiled. Returns the number
    /// of *additional* identifiers removed by the cascade (zero when the key
    /// was absent or its module was unshared).
    pub fn invalidate(&self, key: &str) -> usize {
        let mut state = self.inner.lock().unwrap();
        if state.entries.remove(key).is_none() {
            return 0;
        }

        let Some(module) = state.module_index.remove(key) else {
            return 0;
        };
        state.dynamic.retain(|m| m != &module);

        let siblings: Vec<String> = state
            .module_index
            .iter()
            .filter(|(_, m)| **m == module)
            .map(|(k, _)| k.clone())
            .collect();

        let mut removed = 0;
        for sibling in siblings {
            state.module_index.remove(&sibling);
            if state.entries.remove(&sibling).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Registers a dynamically compiled module as referenced by all future
    /// builds. Duplicate registrations are ignored.
    pub fn register_referenced(&self, module: ModuleRef) {
        let mut state = self.inner.lock().unwrap();
        if !state.dynamic.contains(&module) {
            state.dynamic.push(module);
        }
    }

    /// Registers an embedder-supplied top-level module.
    pub fn add_top_level(&self, module: ModuleRef) {
        let mut state = self.inner.lock().unwrap();
        if !state.top_level.contains(&module) {
            state.top_level.push(module);
        }
    }

    /// Records the module produced by the application entry build.
    pub fn set_app_module(&self, module: Option<ModuleRef>) {
        self.inner.lock().unwrap().app_module = module;
    }

    /// Returns the application entry module, if one has been built.
    pub fn app_module(&self) -> Option<ModuleRef> {
        self.inner.lock().unwrap().app_module.clone()
    }

    /// Returns the embedder-supplied top-level modules in registration order.
    pub fn top_level_modules(&self) -> Vec<ModuleRef> {
        self.inner.lock().unwrap().top_level.clone()
    }

    /// Returns the dynamically registered modules in registration order.
    pub fn dynamic_modules(&self) -> Vec<ModuleRef> {
        self.inner.lock().unwrap().dynamic.clone()
    }
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new()
    }
}
