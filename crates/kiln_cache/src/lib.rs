//! Build artifact cache for the Kiln compilation engine.
//!
//! This crate owns the persistent half of a build pass: the map from virtual
//! path to compiled artifact, the module reverse index that ties batched
//! siblings together, the registries of referenced modules, and the cascade
//! that invalidates every co-batched artifact when any one of them changes.

#![warn(missing_docs)]

pub mod cache;
pub mod entry;
pub mod notify;

pub use cache::ArtifactCache;
pub use entry::CacheEntry;
pub use notify::{ChangeNotifier, RecordingNotifier};
