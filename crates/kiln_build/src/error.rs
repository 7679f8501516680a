//! Error types for the build pipeline.

use crate::backend::BackendError;
use kiln_common::PathError;
use kiln_config::ConfigError;
use kiln_vfs::VfsError;

/// Errors surfaced by build orchestration.
///
/// Every failure carries the identifier it concerns. The only silent case in
/// the pipeline is skipping an incidental sibling with no configured provider
/// during batch enumeration; everything else propagates as one of these.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The build target is absent from the backing store. Checked before any
    /// lock is taken.
    #[error("virtual path '{path}' does not exist")]
    NotFound {
        /// The missing virtual path or directory.
        path: String,
    },

    /// The target's extension has no provider mapping in its scope.
    #[error("no build provider configured for extension '{extension}'")]
    NoProvider {
        /// The unmapped extension (may be empty for extension-less paths).
        extension: String,
    },

    /// The configuration maps an extension to a provider kind that is not
    /// registered. Detected when the manager is constructed.
    #[error("extension '{extension}' is mapped to unknown provider kind '{kind}'")]
    UnknownProviderKind {
        /// The configured extension.
        extension: String,
        /// The unregistered provider kind tag.
        kind: String,
    },

    /// No compiler backend is registered for a provider's backend kind.
    #[error("no compiler backend registered for kind '{kind}'")]
    NoBackend {
        /// The missing backend kind tag.
        kind: String,
    },

    /// The compiler backend rejected a compilation unit. Never retried.
    #[error("compilation failed for virtual path '{path}'")]
    Compilation {
        /// The identifier whose build pass failed.
        path: String,
        /// The backend diagnostic.
        #[source]
        source: BackendError,
    },

    /// A virtual path failed to parse or normalize.
    #[error(transparent)]
    Path(#[from] PathError),

    /// The virtual filesystem failed to read a source.
    #[error(transparent)]
    Vfs(#[from] VfsError),

    /// The site configuration is malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
