//! The compiler backend seam.
//!
//! Kiln does not compile anything itself. Each [`ModuleSlot`](crate::planner::ModuleSlot)
//! produced by the batch planner is handed to a [`CompileBackend`] as a
//! [`CompileBatch`], together with the full referenced-module closure. The
//! backend either produces a loadable [`CompiledModule`], produces nothing
//! (a batch of declarative stubs), or fails with a diagnostic.

use crate::unit::CodeUnit;
use kiln_common::ModuleRef;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Default backend kind tag used by the stock providers.
pub const TEMPLATE_BACKEND: &str = "template";

/// One compilation unit submitted to a backend.
#[derive(Clone, Debug)]
pub struct CompileBatch {
    /// Base name for the produced module. Backends mint a unique final name
    /// from it.
    pub base_name: String,
    /// The code units merged into this module.
    pub units: Vec<CodeUnit>,
}

/// A diagnostic from a failed backend invocation.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    /// The backend's diagnostic text.
    pub message: String,
}

impl BackendError {
    /// Creates a diagnostic from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The result of a successful backend invocation.
#[derive(Clone, Debug)]
pub struct CompiledModule {
    /// Handle to the loaded module.
    pub reference: ModuleRef,
    /// Names of the types compiled into the module.
    pub types: BTreeSet<String>,
}

/// An opaque compiler service turning code units into loadable modules.
///
/// `Ok(None)` is not an error: a batch holding only declarative stubs adds no
/// code and yields no module, but its sources still get cache entries.
pub trait CompileBackend: Send + Sync {
    /// Compiles one batch against the given referenced modules.
    fn compile(
        &self,
        batch: &CompileBatch,
        referenced: &[ModuleRef],
    ) -> Result<Option<CompiledModule>, BackendError>;
}

/// Registry mapping backend kind tags to backend implementations.
///
/// Populated once at startup from configuration; looked up by tag when a
/// slot is submitted. No runtime type construction is involved.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn CompileBackend>>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a backend under a kind tag, replacing any previous one.
    pub fn register(&mut self, kind: impl Into<String>, backend: Arc<dyn CompileBackend>) {
        self.backends.insert(kind.into(), backend);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, kind: impl Into<String>, backend: Arc<dyn CompileBackend>) -> Self {
        self.register(kind, backend);
        self
    }

    /// Looks up the backend for a kind tag.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn CompileBackend>> {
        self.backends.get(kind).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullBackend;

    impl CompileBackend for NullBackend {
        fn compile(
            &self,
            _batch: &CompileBatch,
            _referenced: &[ModuleRef],
        ) -> Result<Option<CompiledModule>, BackendError> {
            Ok(None)
        }
    }

    #[test]
    fn registry_lookup() {
        let registry = BackendRegistry::new().with(TEMPLATE_BACKEND, Arc::new(NullBackend));
        assert!(registry.get(TEMPLATE_BACKEND).is_some());
        assert!(registry.get("native").is_none());
    }

    #[test]
    fn backend_error_display() {
        let err = BackendError::new("duplicate member `Render`");
        assert_eq!(err.to_string(), "duplicate member `Render`");
    }
}
