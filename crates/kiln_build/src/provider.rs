//! Build providers: the components that turn a source into a code unit.

use crate::error::BuildError;
use crate::manager::BuildContext;
use crate::unit::CodeUnit;
use kiln_common::VirtualPath;
use kiln_config::ResolvedScope;
use std::collections::HashMap;

/// Turns one virtual-path source into generated code.
///
/// A provider is created per candidate per build pass and discarded with it.
/// `generate_code` receives a [`BuildContext`] through which it reads its
/// source and may trigger nested builds of other artifacts it depends on.
pub trait BuildProvider {
    /// The source this provider was created for.
    fn virtual_path(&self) -> &VirtualPath;

    /// The backend kind tag this provider's generated code requires.
    ///
    /// Candidates requiring different backends never share a compiled module.
    fn backend_kind(&self) -> &str;

    /// Generates the code unit for the source.
    fn generate_code(&mut self, ctx: &BuildContext<'_>) -> Result<CodeUnit, BuildError>;

    /// The virtual paths this source depends on, the source itself included.
    ///
    /// Registered with the change notifier so edits to any of them invalidate
    /// the cached artifact.
    fn dependencies(&self, ctx: &BuildContext<'_>) -> Result<Vec<VirtualPath>, BuildError> {
        let _ = ctx;
        Ok(vec![self.virtual_path().clone()])
    }

    /// Name of the generated type for this source, once code generation ran.
    fn generated_type_name(&self) -> Option<String> {
        None
    }

    /// Provider-defined descriptor string persisted with the cache entry.
    fn custom_descriptor(&self) -> Option<String> {
        None
    }
}

impl std::fmt::Debug for dyn BuildProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildProvider")
            .field("virtual_path", &self.virtual_path())
            .field("backend_kind", &self.backend_kind())
            .finish()
    }
}

/// Factory producing a provider for one source path.
pub type ProviderFactory = Box<dyn Fn(VirtualPath) -> Box<dyn BuildProvider> + Send + Sync>;

/// Registry mapping provider kind tags to factories.
///
/// Populated at startup; the configuration's extension table refers to these
/// tags. Resolution is a plain lookup, never runtime type construction.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the stock providers registered:
    /// `"markup"` and `"directive"`.
    pub fn with_stock() -> Self {
        let mut registry = Self::new();
        registry.register(
            "markup",
            Box::new(|path| -> Box<dyn BuildProvider> {
                Box::new(crate::stock::MarkupProvider::new(path))
            }),
        );
        registry.register(
            "directive",
            Box::new(|path| -> Box<dyn BuildProvider> {
                Box::new(crate::stock::DirectiveProvider::new(path))
            }),
        );
        registry
    }

    /// Registers a factory under a kind tag, replacing any previous one.
    pub fn register(&mut self, kind: impl Into<String>, factory: ProviderFactory) {
        self.factories.insert(kind.into(), factory);
    }

    /// Whether a kind tag is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Instantiates the provider of the given kind for a path.
    pub fn create(&self, kind: &str, path: VirtualPath) -> Option<Box<dyn BuildProvider>> {
        self.factories.get(kind).map(|factory| factory(path))
    }
}

/// Resolves the provider for `path` from the scope's extension table.
///
/// With `tolerate_missing` (used for incidental siblings during batch
/// enumeration) an unmapped extension yields `Ok(None)`; for the direct build
/// target it is a [`BuildError::NoProvider`]. An extension mapped to an
/// unregistered kind is a configuration error either way.
pub(crate) fn resolve_provider(
    registry: &ProviderRegistry,
    scope: &ResolvedScope,
    path: &VirtualPath,
    tolerate_missing: bool,
) -> Result<Option<Box<dyn BuildProvider>>, BuildError> {
    let extension = path.extension().unwrap_or("");
    let Some(kind) = scope.provider_for(extension) else {
        if tolerate_missing {
            return Ok(None);
        }
        return Err(BuildError::NoProvider {
            extension: extension.to_string(),
        });
    };

    match registry.create(kind, path.clone()) {
        Some(provider) => Ok(Some(provider)),
        None => Err(BuildError::UnknownProviderKind {
            extension: extension.to_string(),
            kind: kind.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_config::{load_config_from_str, resolve_scope};

    fn vp(s: &str) -> VirtualPath {
        VirtualPath::new(s).unwrap()
    }

    fn scope() -> ResolvedScope {
        let config = load_config_from_str(
            r#"
[compilation.providers]
page = "markup"
svc = "directive"
rpt = "bogus"
"#,
        )
        .unwrap();
        resolve_scope(&config, &vp("/site/a.page"))
    }

    #[test]
    fn stock_registry_contains_expected_kinds() {
        let registry = ProviderRegistry::with_stock();
        assert!(registry.contains("markup"));
        assert!(registry.contains("directive"));
        assert!(!registry.contains("native"));
    }

    #[test]
    fn resolves_mapped_extension() {
        let registry = ProviderRegistry::with_stock();
        let provider = resolve_provider(&registry, &scope(), &vp("/site/a.page"), false)
            .unwrap()
            .unwrap();
        assert_eq!(provider.virtual_path(), &vp("/site/a.page"));
    }

    #[test]
    fn unmapped_extension_is_fatal_for_target() {
        let registry = ProviderRegistry::with_stock();
        let err = resolve_provider(&registry, &scope(), &vp("/site/a.css"), false).unwrap_err();
        assert!(matches!(err, BuildError::NoProvider { extension } if extension == "css"));
    }

    #[test]
    fn unmapped_extension_is_skipped_for_siblings() {
        let registry = ProviderRegistry::with_stock();
        let provider = resolve_provider(&registry, &scope(), &vp("/site/a.css"), true).unwrap();
        assert!(provider.is_none());
    }

    #[test]
    fn unknown_kind_is_always_fatal() {
        let registry = ProviderRegistry::with_stock();
        let err = resolve_provider(&registry, &scope(), &vp("/site/a.rpt"), true).unwrap_err();
        assert!(matches!(err, BuildError::UnknownProviderKind { .. }));
    }
}
