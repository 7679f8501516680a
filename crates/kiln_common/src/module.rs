//! Shared handles for compiled modules and generated types.

use std::fmt;
use std::sync::Arc;

/// A cheap, clonable reference to a loaded compiled module.
///
/// Module names are unique within a process (compiler backends mint fresh
/// names for every module they produce), so equality and hashing go by name.
/// Many virtual paths may share one `ModuleRef` when their sources were
/// batched into the same compiled unit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleRef {
    name: Arc<str>,
}

impl ModuleRef {
    /// Creates a reference to the module with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().into(),
        }
    }

    /// Returns the module name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A reference to a generated type living inside a compiled module.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeRef {
    /// The module containing the type.
    pub module: ModuleRef,
    /// The type name within the module.
    pub name: String,
}

impl TypeRef {
    /// Creates a type reference.
    pub fn new(module: ModuleRef, name: impl Into<String>) -> Self {
        Self {
            module,
            name: name.into(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_by_name() {
        let a = ModuleRef::new("pages_0");
        let b = ModuleRef::new("pages_0");
        let c = ModuleRef::new("pages_1");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn clone_shares_name() {
        let a = ModuleRef::new("theme_dark");
        let b = a.clone();
        assert_eq!(a.name(), b.name());
    }

    #[test]
    fn type_ref_display() {
        let t = TypeRef::new(ModuleRef::new("pages_0"), "IndexPage");
        assert_eq!(t.to_string(), "pages_0::IndexPage");
    }
}
