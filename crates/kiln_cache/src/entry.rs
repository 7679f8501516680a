//! The cached record for one built virtual path.

use kiln_common::{ModuleRef, TypeRef};

/// A persistent cache record created by a successful build pass.
///
/// `module` is absent when the source was a declarative stub whose slot
/// produced no compiled output; the entry still exists so later lookups are
/// cache hits. Several entries share one `module` when their sources were
/// batched into the same compiled unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    /// The compiled module holding this artifact, if one was produced.
    pub module: Option<ModuleRef>,
    /// The generated type for this artifact within the module.
    pub generated_type: Option<TypeRef>,
    /// Provider-defined descriptor string persisted alongside the artifact.
    pub custom: Option<String>,
}

impl CacheEntry {
    /// Creates an entry with no compiled output (declarative stub).
    pub fn empty() -> Self {
        Self {
            module: None,
            generated_type: None,
            custom: None,
        }
    }
}
