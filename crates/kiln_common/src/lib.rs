//! Shared foundational types used across the Kiln compilation engine.
//!
//! This crate provides normalized virtual-path identifiers with configurable
//! case handling, and the cheap shared handles for compiled modules and the
//! types they export.

#![warn(missing_docs)]

pub mod module;
pub mod vpath;

pub use module::{ModuleRef, TypeRef};
pub use vpath::{CasePolicy, PathError, VirtualPath, SYNTHETIC_PREFIX};
