//! Source classification and sibling candidate enumeration.

use crate::error::BuildError;
use crate::kind::{BuildKind, THEME_PREFIX};
use crate::session::{BuildSession, KindGuard};
use kiln_common::VirtualPath;
use kiln_config::ResolvedScope;
use kiln_vfs::VirtualFs;

/// Classifies an identifier into its [`BuildKind`].
///
/// The synthetic prefix wins over everything; then the fixed extension table;
/// then the themed-directory prefix for unmapped extensions (and
/// extension-less directories); everything else is [`BuildKind::Unknown`].
pub fn classify(path: &VirtualPath) -> BuildKind {
    if path.is_synthetic() {
        return BuildKind::Synthetic;
    }
    if let Some(kind) = path.extension().and_then(BuildKind::from_extension) {
        return kind;
    }
    if path.starts_with(THEME_PREFIX) {
        return BuildKind::Theme;
    }
    BuildKind::Unknown
}

/// The candidate set for one build pass.
#[derive(Debug)]
pub(crate) struct Candidates<'a> {
    /// The target's classification.
    pub kind: BuildKind,
    /// Candidate source files, in enumeration order. Empty for synthetic
    /// targets (resolved by direct provider lookup) and for theme /
    /// application-entry targets (which build from the target alone).
    pub files: Vec<VirtualPath>,
    /// Pops the recursion-stack entry when the pass ends.
    pub kind_guard: KindGuard<'a>,
}

/// Classifies `path` and enumerates its batch candidates.
///
/// For batching kinds, the session's kind stack is pushed so that nested
/// builds of the same kind suppress their own batching (a unit must not be
/// absorbed into a sibling batch while its own directory scan is still in
/// progress). Batching is also suppressed when the scope disables it and
/// when the directory listing comes from a non-default listing backend.
pub(crate) fn classify_and_enumerate<'a>(
    path: &VirtualPath,
    vfs: &dyn VirtualFs,
    scope: &ResolvedScope,
    session: &'a BuildSession,
) -> Result<Candidates<'a>, BuildError> {
    let kind = classify(path);

    if kind == BuildKind::Synthetic {
        return Ok(Candidates {
            kind,
            files: Vec::new(),
            kind_guard: KindGuard::empty(),
        });
    }
    if !kind.batches() {
        return Ok(Candidates {
            kind,
            files: vec![path.clone()],
            kind_guard: KindGuard::empty(),
        });
    }

    let mut batch = scope.batch;
    if session.top() == Some(kind) {
        batch = false;
    }
    let guard = session.push(kind);

    if batch && !vfs.default_listing() {
        batch = false;
    }

    let files = if batch {
        let dir = path.directory();
        let listing = vfs.list_directory(&dir).ok_or_else(|| BuildError::NotFound {
            path: dir.as_str().to_string(),
        })?;
        listing
            .into_iter()
            .filter(|f| classify(f) == kind)
            .collect()
    } else {
        if !vfs.file_exists(path) {
            return Err(BuildError::NotFound {
                path: path.as_str().to_string(),
            });
        }
        vec![path.clone()]
    };

    Ok(Candidates {
        kind,
        files,
        kind_guard: guard,
    })
}
