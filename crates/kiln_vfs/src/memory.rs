//! In-memory virtual filesystem.

use crate::{VfsError, VirtualFs};
use kiln_common::VirtualPath;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// A mutable in-memory filesystem keyed by normalized virtual path.
///
/// Files can be added and removed after construction, which makes this the
/// implementation of choice for tests exercising change invalidation. The
/// `BTreeMap` backing gives deterministic listing order.
pub struct MemoryFs {
    files: RwLock<BTreeMap<VirtualPath, String>>,
    default_listing: bool,
}

impl MemoryFs {
    /// Creates an empty in-memory filesystem with default listings.
    pub fn new() -> Self {
        Self {
            files: RwLock::new(BTreeMap::new()),
            default_listing: true,
        }
    }

    /// Overrides the default-listing capability flag.
    ///
    /// Passing `false` makes the filesystem present itself as an externally
    /// supplied listing backend, which disables sibling batching.
    pub fn with_default_listing(mut self, default_listing: bool) -> Self {
        self.default_listing = default_listing;
        self
    }

    /// Adds a file, replacing any previous contents at the same path.
    pub fn insert(&self, path: VirtualPath, contents: impl Into<String>) {
        self.files.write().unwrap().insert(path, contents.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_file(self, path: VirtualPath, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    /// Removes a file, returning `true` if it was present.
    pub fn remove(&self, path: &VirtualPath) -> bool {
        self.files.write().unwrap().remove(path).is_some()
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualFs for MemoryFs {
    fn file_exists(&self, path: &VirtualPath) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    fn dir_exists(&self, path: &VirtualPath) -> bool {
        if path.is_root() {
            return true;
        }
        let prefix = format!("{}/", path.as_str());
        self.files
            .read()
            .unwrap()
            .keys()
            .any(|k| k.starts_with(&prefix))
    }

    fn list_directory(&self, path: &VirtualPath) -> Option<Vec<VirtualPath>> {
        if !self.dir_exists(path) {
            return None;
        }
        let files = self.files.read().unwrap();
        Some(
            files
                .keys()
                .filter(|k| &k.directory() == path)
                .cloned()
                .collect(),
        )
    }

    fn read_file(&self, path: &VirtualPath) -> Result<String, VfsError> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| VfsError::NotFound {
                path: path.as_str().to_string(),
            })
    }

    fn default_listing(&self) -> bool {
        self.default_listing
    }
}
