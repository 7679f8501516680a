//! Virtual filesystem abstraction for the Kiln compilation engine.
//!
//! The build pipeline never touches storage directly; it goes through the
//! [`VirtualFs`] trait, which hosts implement to serve sources from disk,
//! memory, archives, or any other backing store. Two implementations ship
//! with the crate: [`MemoryFs`] for tests and embedded sites, and [`DiskFs`]
//! mapping the virtual root onto a physical directory.

#![warn(missing_docs)]

pub mod disk;
pub mod memory;

use kiln_common::VirtualPath;
use std::path::PathBuf;

pub use disk::DiskFs;
pub use memory::MemoryFs;

/// Errors produced by virtual filesystem reads.
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    /// The requested file does not exist in the backing store.
    #[error("virtual file '{path}' does not exist")]
    NotFound {
        /// The missing virtual path.
        path: String,
    },

    /// An I/O error occurred in the backing store.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        /// The real path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// A read-only view of the virtual source namespace.
///
/// Implementations only ever see virtual-namespace paths; synthetic targets
/// are resolved against the host filesystem by the orchestrator and never
/// reach a `VirtualFs`.
pub trait VirtualFs: Send + Sync {
    /// Returns `true` if a file exists at `path`.
    fn file_exists(&self, path: &VirtualPath) -> bool;

    /// Returns `true` if a directory exists at `path`.
    fn dir_exists(&self, path: &VirtualPath) -> bool;

    /// Lists the files directly inside `path`, in stable sorted order.
    ///
    /// Returns `None` when the directory does not exist. Subdirectories are
    /// not included.
    fn list_directory(&self, path: &VirtualPath) -> Option<Vec<VirtualPath>>;

    /// Reads the full contents of the file at `path`.
    fn read_file(&self, path: &VirtualPath) -> Result<String, VfsError>;

    /// Whether directory listings come from the default, trustworthy
    /// implementation.
    ///
    /// Externally supplied listing backends are not guaranteed to be
    /// exhaustive or stable, so sibling batching is disabled over them.
    fn default_listing(&self) -> bool {
        true
    }
}
