//! The compilation orchestrator.
//!
//! [`BuildManager`] drives a build pass end to end: existence check, scope
//! ticketing, double-checked cache probe, candidate enumeration, provider
//! resolution, batch planning, backend submission, and cache population. It
//! is constructed once at startup with its collaborators and is shared across
//! request worker threads; all mutable state lives in the artifact cache and
//! the ticket table, each behind its own short-held lock.

use crate::backend::{BackendRegistry, CompileBatch};
use crate::classify::{classify_and_enumerate, Candidates};
use crate::error::BuildError;
use crate::kind::BuildKind;
use crate::planner::{plan_batches, BatchPlan, BuildItem};
use crate::provider::{resolve_provider, ProviderRegistry};
use crate::session::BuildSession;
use crate::stock::{AppEntryProvider, ThemeProvider};
use crate::tickets::{Ticket, TicketTable};
use kiln_cache::{ArtifactCache, CacheEntry, ChangeNotifier};
use kiln_common::{CasePolicy, ModuleRef, TypeRef, VirtualPath};
use kiln_config::{resolve_scope, ResolvedScope, SiteConfig};
use kiln_vfs::{VfsError, VirtualFs};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

/// The dynamic build-and-load cache.
///
/// Public lookups hit the artifact cache first; on a miss they run a build
/// pass for the target's directory and re-check. Concurrent requests for the
/// same directory serialize on its compilation ticket so sibling sources
/// merge into shared compiled modules; unrelated directories build in
/// parallel.
pub struct BuildManager {
    vfs: Arc<dyn VirtualFs>,
    config: SiteConfig,
    case_policy: CasePolicy,
    providers: ProviderRegistry,
    backends: BackendRegistry,
    cache: ArtifactCache,
    tickets: TicketTable,
    notifier: Option<Arc<dyn ChangeNotifier>>,
    ignore: OnceLock<HashSet<String>>,
}

impl BuildManager {
    /// Creates a manager over its collaborators.
    ///
    /// Fails with [`BuildError::UnknownProviderKind`] when the configuration
    /// maps an extension to a provider kind missing from the registry.
    pub fn new(
        vfs: Arc<dyn VirtualFs>,
        config: SiteConfig,
        providers: ProviderRegistry,
        backends: BackendRegistry,
    ) -> Result<Self, BuildError> {
        let scope_tables = config.scopes.values().map(|over| &over.providers);
        for table in std::iter::once(&config.compilation.providers).chain(scope_tables) {
            for (extension, kind) in table {
                if !providers.contains(kind) {
                    return Err(BuildError::UnknownProviderKind {
                        extension: extension.clone(),
                        kind: kind.clone(),
                    });
                }
            }
        }

        let case_policy = if config.compilation.case_insensitive {
            CasePolicy::Insensitive
        } else {
            CasePolicy::Sensitive
        };

        Ok(Self {
            vfs,
            config,
            case_policy,
            providers,
            backends,
            cache: ArtifactCache::new(),
            tickets: TicketTable::new(),
            notifier: None,
            ignore: OnceLock::new(),
        })
    }

    /// Attaches the dependency-change notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// The case policy in effect for identifier comparison.
    pub fn case_policy(&self) -> CasePolicy {
        self.case_policy
    }

    /// Returns the compiled module for `path`, building on a cache miss.
    ///
    /// `Ok(None)` means the build pass completed without producing a module
    /// for this identifier (declarative stub, or an ignored/unenumerated
    /// target).
    pub fn get_compiled_module(&self, path: &str) -> Result<Option<ModuleRef>, BuildError> {
        let path = VirtualPath::new(path)?;
        let session = BuildSession::new();
        self.ensure_built(&path, &session)?;
        Ok(self.cache.get(&self.key(&path)).and_then(|e| e.module))
    }

    /// Returns the generated type for `path`, building on a cache miss.
    pub fn get_compiled_type(&self, path: &str) -> Result<Option<TypeRef>, BuildError> {
        let path = VirtualPath::new(path)?;
        let session = BuildSession::new();
        self.ensure_built(&path, &session)?;
        Ok(self
            .cache
            .get(&self.key(&path))
            .and_then(|e| e.generated_type))
    }

    /// Returns the provider-defined descriptor for `path`, building on a
    /// cache miss.
    pub fn get_custom_descriptor(&self, path: &str) -> Result<Option<String>, BuildError> {
        let path = VirtualPath::new(path)?;
        let session = BuildSession::new();
        self.ensure_built(&path, &session)?;
        Ok(self.cache.get(&self.key(&path)).and_then(|e| e.custom))
    }

    /// Returns the virtual paths `path` depends on, or `None` when no
    /// provider is configured for its extension.
    pub fn get_virtual_path_dependencies(
        &self,
        path: &str,
    ) -> Result<Option<Vec<VirtualPath>>, BuildError> {
        let path = VirtualPath::new(path)?;
        let scope = resolve_scope(&self.config, &path);
        let Some(provider) = resolve_provider(&self.providers, &scope, &path, true)? else {
            return Ok(None);
        };
        let session = BuildSession::new();
        let ctx = BuildContext {
            manager: self,
            session: &session,
        };
        Ok(Some(provider.dependencies(&ctx)?))
    }

    /// The ordered referenced-module closure: configured modules first, then
    /// embedder-registered top-level modules, then dynamically compiled
    /// components, then the application entry module.
    pub fn list_referenced_modules(&self) -> Vec<ModuleRef> {
        let scope = resolve_scope(&self.config, &VirtualPath::root());
        self.referenced_for(&scope)
    }

    /// Registers an embedder-supplied module visible to every build.
    pub fn add_top_level_module(&self, module: ModuleRef) {
        self.cache.add_top_level(module);
    }

    /// Dependency-change entry point: invalidates the cached artifact for
    /// `path` and cascades to every identifier sharing its module.
    ///
    /// Returns the number of additional identifiers invalidated.
    pub fn on_changed(&self, path: &str) -> Result<usize, BuildError> {
        let path = VirtualPath::new(path)?;
        Ok(self.cache.invalidate(&self.key(&path)))
    }

    /// Dry-runs the batch planning a build of `path` would perform right now,
    /// without invoking the compiler backend or populating the cache.
    ///
    /// Candidates that are already cached are excluded, exactly as a real
    /// pass would exclude them. Nested builds triggered by `#require`
    /// directives do run for real.
    pub fn plan(&self, path: &str) -> Result<PlanReport, BuildError> {
        let path = VirtualPath::new(path)?;
        let session = BuildSession::new();
        self.assert_exists(&path)?;
        let scope = resolve_scope(&self.config, &path);

        let scope_key = path.directory().cache_key(self.case_policy);
        let _scope_lock = ScopeLock::acquire(&self.tickets, &session, scope_key);

        let (kind, items, plan) = self.plan_pass(&path, &scope, &session)?;
        let slots = plan
            .slots()
            .iter()
            .map(|slot| SlotReport {
                backend_kind: slot.backend_kind().to_string(),
                base_name: slot.base_name().to_string(),
                members: slot
                    .members()
                    .iter()
                    .map(|&i| items[i].path.as_str().to_string())
                    .collect(),
            })
            .collect();

        Ok(PlanReport {
            target: path.as_str().to_string(),
            kind,
            slots,
        })
    }

    fn key(&self, path: &VirtualPath) -> String {
        path.cache_key(self.case_policy)
    }

    /// Builds `path` unless an artifact for it is already cached.
    fn ensure_built(&self, path: &VirtualPath, session: &BuildSession) -> Result<(), BuildError> {
        if self.cache.contains(&self.key(path)) {
            return Ok(());
        }
        self.build(path, session)
    }

    /// Runs one build pass for `path`'s directory.
    fn build(&self, path: &VirtualPath, session: &BuildSession) -> Result<(), BuildError> {
        self.assert_exists(path)?;
        let scope = resolve_scope(&self.config, path);

        let scope_key = path.directory().cache_key(self.case_policy);
        let _scope_lock = if session.holds(&scope_key) {
            // Re-entry from a nested build in the same directory; the chain
            // already owns the ticket.
            None
        } else {
            Some(ScopeLock::acquire(&self.tickets, session, scope_key))
        };

        // Another request may have finished this build while we waited.
        if self.cache.contains(&self.key(path)) {
            return Ok(());
        }

        let (kind, items, plan) = self.plan_pass(path, &scope, session)?;
        if items.is_empty() {
            return Ok(());
        }

        let ctx = BuildContext {
            manager: self,
            session,
        };

        for slot in plan.slots() {
            let backend =
                self.backends
                    .get(slot.backend_kind())
                    .ok_or_else(|| BuildError::NoBackend {
                        kind: slot.backend_kind().to_string(),
                    })?;

            let units = slot
                .members()
                .iter()
                .filter_map(|&i| items[i].unit.clone())
                .collect();
            let batch = CompileBatch {
                base_name: slot.base_name().to_string(),
                units,
            };

            // Recomputed per slot: a component module compiled by an earlier
            // slot is already visible to later ones.
            let referenced = self.referenced_for(&scope);
            let compiled =
                backend
                    .compile(&batch, &referenced)
                    .map_err(|source| BuildError::Compilation {
                        path: path.as_str().to_string(),
                        source,
                    })?;
            let module = compiled.map(|m| m.reference);

            match kind {
                BuildKind::Component => {
                    if let Some(module) = &module {
                        self.cache.register_referenced(module.clone());
                    }
                }
                BuildKind::AppEntry => self.cache.set_app_module(module.clone()),
                _ => {}
            }

            for &i in slot.members() {
                let item = &items[i];
                let item_key = self.key(&item.path);
                if self.cache.contains(&item_key) {
                    continue;
                }

                if let Some(notifier) = &self.notifier {
                    let dependencies = item.provider.dependencies(&ctx)?;
                    notifier.watch(&item.path, &dependencies);
                }

                let generated_type = match (&module, item.provider.generated_type_name()) {
                    (Some(module), Some(name)) => Some(TypeRef::new(module.clone(), name)),
                    _ => None,
                };
                let entry = CacheEntry {
                    module: module.clone(),
                    generated_type,
                    custom: item.provider.custom_descriptor(),
                };
                self.cache
                    .put(&item_key, entry, kind != BuildKind::Synthetic);
            }
        }

        Ok(())
    }

    /// Enumerates candidates, resolves providers, and plans the batch slots.
    /// Must run under the scope ticket.
    fn plan_pass(
        &self,
        path: &VirtualPath,
        scope: &ResolvedScope,
        session: &BuildSession,
    ) -> Result<(BuildKind, Vec<BuildItem>, BatchPlan), BuildError> {
        let Candidates {
            kind,
            files,
            kind_guard: _kind_guard,
        } = classify_and_enumerate(path, self.vfs.as_ref(), scope, session)?;

        let mut items = self.resolve_items(path, kind, files, scope)?;

        let ctx = BuildContext {
            manager: self,
            session,
        };
        let base_name = match kind {
            BuildKind::Theme => Some("theme"),
            BuildKind::AppEntry => Some("app"),
            _ => None,
        };
        // A nested recursive build may have compiled one of our component
        // candidates into a different module while the directory scan was in
        // flight, so re-filter against the cache immediately before slotting.
        let recheck_cache = kind == BuildKind::Component;

        let plan = plan_batches(
            &mut items,
            scope.max_batch_size,
            base_name,
            |item| recheck_cache && self.cache.contains(&self.key(&item.path)),
            |item| item.provider.generate_code(&ctx),
        )?;

        Ok((kind, items, plan))
    }

    /// Creates the build items for the candidate set.
    ///
    /// For batching kinds, ignored, already-cached, duplicate, and
    /// provider-less sibling files are skipped; a missing provider is fatal
    /// only for the direct target.
    fn resolve_items(
        &self,
        target: &VirtualPath,
        kind: BuildKind,
        files: Vec<VirtualPath>,
        scope: &ResolvedScope,
    ) -> Result<Vec<BuildItem>, BuildError> {
        match kind {
            BuildKind::Theme => Ok(vec![BuildItem::new(
                target.clone(),
                Box::new(ThemeProvider::new(target.clone())),
            )]),
            BuildKind::AppEntry => Ok(vec![BuildItem::new(
                target.clone(),
                Box::new(AppEntryProvider::new(target.clone())),
            )]),
            BuildKind::Synthetic => {
                let provider = resolve_provider(&self.providers, scope, target, false)?;
                Ok(provider
                    .map(|p| vec![BuildItem::new(target.clone(), p)])
                    .unwrap_or_default())
            }
            _ => {
                let ignore = self.ignore_set();
                let target_key = self.key(target);
                let mut seen = HashSet::new();
                let mut items = Vec::new();

                for file in files {
                    let file_key = self.key(&file);
                    if ignore.contains(&file_key)
                        || self.cache.contains(&file_key)
                        || !seen.insert(file_key.clone())
                    {
                        continue;
                    }
                    let is_target = file_key == target_key;
                    if let Some(provider) =
                        resolve_provider(&self.providers, scope, &file, !is_target)?
                    {
                        items.push(BuildItem::new(file, provider));
                    }
                }

                Ok(items)
            }
        }
    }

    /// Fails with [`BuildError::NotFound`] unless the target exists, before
    /// any lock is taken.
    fn assert_exists(&self, path: &VirtualPath) -> Result<(), BuildError> {
        let exists = match path.synthetic_target() {
            Some(real) => std::path::Path::new(real).exists(),
            None => self.vfs.file_exists(path) || self.vfs.dir_exists(path),
        };
        if exists {
            Ok(())
        } else {
            Err(BuildError::NotFound {
                path: path.as_str().to_string(),
            })
        }
    }

    /// The referenced-module closure for one scope, deduplicated in order.
    fn referenced_for(&self, scope: &ResolvedScope) -> Vec<ModuleRef> {
        let mut modules: Vec<ModuleRef> = Vec::new();
        let mut push = |module: ModuleRef, modules: &mut Vec<ModuleRef>| {
            if !modules.contains(&module) {
                modules.push(module);
            }
        };

        for name in &scope.referenced_modules {
            push(ModuleRef::new(name.clone()), &mut modules);
        }
        for module in self.cache.top_level_modules() {
            push(module, &mut modules);
        }
        for module in self.cache.dynamic_modules() {
            push(module, &mut modules);
        }
        if let Some(module) = self.cache.app_module() {
            push(module, &mut modules);
        }
        modules
    }

    /// The resolved ignore set, loaded once on first use from the configured
    /// list and the optional ignore file. Unparsable entries are dropped.
    fn ignore_set(&self) -> &HashSet<String> {
        self.ignore.get_or_init(|| {
            let mut set = HashSet::new();
            for raw in &self.config.compilation.ignore_paths {
                if let Ok(path) = VirtualPath::new(raw) {
                    set.insert(path.cache_key(self.case_policy));
                }
            }
            if let Some(file) = &self.config.compilation.ignore_file {
                if let Ok(path) = VirtualPath::new(file) {
                    if let Ok(contents) = self.vfs.read_file(&path) {
                        for line in contents.lines() {
                            let line = line.trim();
                            if line.is_empty() {
                                continue;
                            }
                            if let Ok(path) = VirtualPath::new(line) {
                                set.insert(path.cache_key(self.case_policy));
                            }
                        }
                    }
                }
            }
            set
        })
    }
}

/// Handle given to providers during code generation.
///
/// Lets a provider read its source and trigger nested builds for artifacts it
/// depends on, continuing the current build chain's recursion bookkeeping.
pub struct BuildContext<'a> {
    pub(crate) manager: &'a BuildManager,
    pub(crate) session: &'a BuildSession,
}

impl BuildContext<'_> {
    /// The virtual filesystem serving this site.
    pub fn vfs(&self) -> &dyn VirtualFs {
        self.manager.vfs.as_ref()
    }

    /// Reads a source, resolving synthetic targets against the host
    /// filesystem.
    pub fn read_source(&self, path: &VirtualPath) -> Result<String, BuildError> {
        match path.synthetic_target() {
            Some(real) => std::fs::read_to_string(real).map_err(|source| {
                BuildError::Vfs(VfsError::Io {
                    path: real.into(),
                    source,
                })
            }),
            None => Ok(self.manager.vfs.read_file(path)?),
        }
    }

    /// Returns the compiled module for `path`, building it within the current
    /// chain if needed.
    pub fn compiled_module(&self, path: &VirtualPath) -> Result<Option<ModuleRef>, BuildError> {
        self.manager.ensure_built(path, self.session)?;
        Ok(self
            .manager
            .cache
            .get(&self.manager.key(path))
            .and_then(|e| e.module))
    }

    /// Returns the generated type for `path`, building it within the current
    /// chain if needed.
    pub fn compiled_type(&self, path: &VirtualPath) -> Result<Option<TypeRef>, BuildError> {
        self.manager.ensure_built(path, self.session)?;
        Ok(self
            .manager
            .cache
            .get(&self.manager.key(path))
            .and_then(|e| e.generated_type))
    }
}

/// RAII claim on a directory's compilation ticket.
///
/// Acquisition order: table entry claim (short table-wide lock), then the
/// long-held ticket itself, then the session's held-scope record. Dropped in
/// reverse on all paths, including failures.
struct ScopeLock<'a> {
    tickets: &'a TicketTable,
    session: &'a BuildSession,
    key: String,
    ticket: Arc<Ticket>,
}

impl<'a> ScopeLock<'a> {
    fn acquire(tickets: &'a TicketTable, session: &'a BuildSession, key: String) -> Self {
        let (ticket, _created) = tickets.acquire(&key);
        ticket.lock();
        session.hold(key.clone());
        Self {
            tickets,
            session,
            key,
            ticket,
        }
    }
}

impl Drop for ScopeLock<'_> {
    fn drop(&mut self) {
        self.session.release(&self.key);
        self.ticket.unlock();
        self.tickets.release(&self.key);
    }
}

/// A dry-run description of the slots one build pass would compile.
#[derive(Debug, Serialize)]
pub struct PlanReport {
    /// The normalized build target.
    pub target: String,
    /// The target's classification.
    pub kind: BuildKind,
    /// Planned compiled-module slots, in creation order.
    pub slots: Vec<SlotReport>,
}

/// One planned compiled-module slot.
#[derive(Debug, Serialize)]
pub struct SlotReport {
    /// The backend kind this slot compiles with.
    pub backend_kind: String,
    /// The module base name the backend will mint from.
    pub base_name: String,
    /// Virtual paths of the member sources, in acceptance order.
    pub members: Vec<String>,
}
