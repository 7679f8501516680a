//! Normalized virtual-path identifiers.
//!
//! A [`VirtualPath`] names a source artifact or directory in the virtual
//! namespace served by the host application. Paths are always absolute and
//! normalized before any cache lookup, so that two spellings of the same
//! artifact hit the same cache slot. Case handling is a deployment policy,
//! applied when deriving lookup keys rather than baked into the value.

use std::fmt;

/// Reserved prefix marking a synthetic build target.
///
/// A synthetic path wraps an on-disk real path rather than an entry in the
/// virtual namespace; it is used for out-of-band compilation requests. The
/// tail after the prefix is preserved verbatim.
pub const SYNTHETIC_PREFIX: &str = "/@@direct@@";

/// How virtual paths are compared and keyed.
///
/// Under [`CasePolicy::Insensitive`] two paths differing only in letter case
/// address the same artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CasePolicy {
    /// Paths are compared byte-for-byte.
    Sensitive,
    /// Paths are case-folded before comparison.
    Insensitive,
}

/// Errors produced when constructing a [`VirtualPath`].
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// The input did not start with `/`.
    #[error("virtual path '{0}' is not rooted")]
    NotRooted(String),

    /// A `..` segment would have escaped the virtual root.
    #[error("virtual path '{0}' escapes the virtual root")]
    EscapesRoot(String),
}

/// A normalized, absolute virtual path.
///
/// Construction collapses empty and `.` segments, resolves `..` (rejecting
/// traversal above the root), and strips trailing slashes. Equality and
/// ordering are byte-wise on the normalized form; use
/// [`cache_key`](Self::cache_key) when a [`CasePolicy`]-aware key is needed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualPath {
    raw: String,
}

impl VirtualPath {
    /// Parses and normalizes a rooted virtual path.
    ///
    /// Synthetic paths (under [`SYNTHETIC_PREFIX`]) are kept verbatim, since
    /// their tail is an opaque real path owned by the host filesystem.
    pub fn new(path: &str) -> Result<Self, PathError> {
        if path.starts_with(SYNTHETIC_PREFIX) {
            return Ok(Self {
                raw: path.to_string(),
            });
        }
        if !path.starts_with('/') {
            return Err(PathError::NotRooted(path.to_string()));
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    if segments.pop().is_none() {
                        return Err(PathError::EscapesRoot(path.to_string()));
                    }
                }
                other => segments.push(other),
            }
        }

        let mut raw = String::with_capacity(path.len());
        for segment in &segments {
            raw.push('/');
            raw.push_str(segment);
        }
        if raw.is_empty() {
            raw.push('/');
        }

        Ok(Self { raw })
    }

    /// The virtual root `/`.
    pub fn root() -> Self {
        Self {
            raw: "/".to_string(),
        }
    }

    /// Wraps an on-disk real path as a synthetic build target.
    pub fn synthetic(real_path: &str) -> Self {
        let raw = if real_path.starts_with('/') {
            format!("{SYNTHETIC_PREFIX}{real_path}")
        } else {
            format!("{SYNTHETIC_PREFIX}/{real_path}")
        };
        Self { raw }
    }

    /// Returns the normalized path string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns `true` if this is the virtual root `/`.
    pub fn is_root(&self) -> bool {
        self.raw == "/"
    }

    /// Returns `true` if this path carries the synthetic prefix.
    pub fn is_synthetic(&self) -> bool {
        self.raw.starts_with(SYNTHETIC_PREFIX)
    }

    /// Returns the real path wrapped by a synthetic target, if any.
    pub fn synthetic_target(&self) -> Option<&str> {
        self.raw.strip_prefix(SYNTHETIC_PREFIX)
    }

    /// Returns the last path segment, or `""` for the root.
    pub fn file_name(&self) -> &str {
        match self.raw.rfind('/') {
            Some(idx) => &self.raw[idx + 1..],
            None => "",
        }
    }

    /// Returns the file name with its extension removed.
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(idx) => &name[..idx],
        }
    }

    /// Returns the extension of the last segment, without the dot.
    ///
    /// Dot-files (`.hidden`) have no extension.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// Returns the containing directory; the root is its own parent.
    pub fn directory(&self) -> VirtualPath {
        match self.raw.rfind('/') {
            Some(0) | None => VirtualPath {
                raw: "/".to_string(),
            },
            Some(idx) => VirtualPath {
                raw: self.raw[..idx].to_string(),
            },
        }
    }

    /// Appends a single file name segment.
    pub fn join(&self, name: &str) -> VirtualPath {
        let raw = if self.raw.ends_with('/') {
            format!("{}{}", self.raw, name)
        } else {
            format!("{}/{}", self.raw, name)
        };
        VirtualPath { raw }
    }

    /// Returns `true` if the normalized path starts with `prefix`.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.raw.starts_with(prefix)
    }

    /// Derives the cache lookup key for this path under the given policy.
    pub fn cache_key(&self, policy: CasePolicy) -> String {
        match policy {
            CasePolicy::Sensitive => self.raw.clone(),
            CasePolicy::Insensitive => self.raw.to_lowercase(),
        }
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_redundant_segments() {
        let vp = VirtualPath::new("/a//b/./c/").unwrap();
        assert_eq!(vp.as_str(), "/a/b/c");
    }

    #[test]
    fn resolves_parent_segments() {
        let vp = VirtualPath::new("/a/b/../c.page").unwrap();
        assert_eq!(vp.as_str(), "/a/c.page");
    }

    #[test]
    fn rejects_unrooted() {
        let err = VirtualPath::new("a/b.page").unwrap_err();
        assert!(matches!(err, PathError::NotRooted(_)));
    }

    #[test]
    fn rejects_escape_above_root() {
        let err = VirtualPath::new("/../etc/passwd").unwrap_err();
        assert!(matches!(err, PathError::EscapesRoot(_)));
    }

    #[test]
    fn root_is_its_own_parent() {
        let root = VirtualPath::new("/").unwrap();
        assert!(root.is_root());
        assert_eq!(root, VirtualPath::root());
        assert_eq!(root.directory(), root);
        assert_eq!(root.file_name(), "");
    }

    #[test]
    fn file_parts() {
        let vp = VirtualPath::new("/site/index.page").unwrap();
        assert_eq!(vp.file_name(), "index.page");
        assert_eq!(vp.file_stem(), "index");
        assert_eq!(vp.extension(), Some("page"));
        assert_eq!(vp.directory().as_str(), "/site");
    }

    #[test]
    fn dot_file_has_no_extension() {
        let vp = VirtualPath::new("/site/.hidden").unwrap();
        assert_eq!(vp.extension(), None);
        assert_eq!(vp.file_stem(), ".hidden");
    }

    #[test]
    fn join_appends_segment() {
        let dir = VirtualPath::new("/site").unwrap();
        assert_eq!(dir.join("a.page").as_str(), "/site/a.page");
        let root = VirtualPath::new("/").unwrap();
        assert_eq!(root.join("a.page").as_str(), "/a.page");
    }

    #[test]
    fn cache_key_honors_policy() {
        let vp = VirtualPath::new("/Site/Index.Page").unwrap();
        assert_eq!(vp.cache_key(CasePolicy::Sensitive), "/Site/Index.Page");
        assert_eq!(vp.cache_key(CasePolicy::Insensitive), "/site/index.page");
    }

    #[test]
    fn synthetic_round_trip() {
        let vp = VirtualPath::synthetic("/tmp/out/gen.page");
        assert!(vp.is_synthetic());
        assert_eq!(vp.synthetic_target(), Some("/tmp/out/gen.page"));
        assert_eq!(vp.extension(), Some("page"));
    }

    #[test]
    fn synthetic_tail_is_not_normalized() {
        let raw = format!("{SYNTHETIC_PREFIX}/tmp//odd/../x.frag");
        let vp = VirtualPath::new(&raw).unwrap();
        assert_eq!(vp.as_str(), raw);
    }
}
