//! Disk-backed virtual filesystem.

use crate::{VfsError, VirtualFs};
use kiln_common::VirtualPath;
use std::path::{Path, PathBuf};

/// A virtual filesystem mapping the virtual root onto a physical directory.
///
/// A virtual path `/a/b.page` resolves to `<root>/a/b.page`. Entries with
/// non-UTF-8 names are skipped during listing.
pub struct DiskFs {
    root: PathBuf,
}

impl DiskFs {
    /// Creates a disk filesystem rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a virtual path to its real location under the root.
    pub fn real_path(&self, path: &VirtualPath) -> PathBuf {
        self.root.join(path.as_str().trim_start_matches('/'))
    }

    /// Returns the physical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl VirtualFs for DiskFs {
    fn file_exists(&self, path: &VirtualPath) -> bool {
        self.real_path(path).is_file()
    }

    fn dir_exists(&self, path: &VirtualPath) -> bool {
        self.real_path(path).is_dir()
    }

    fn list_directory(&self, path: &VirtualPath) -> Option<Vec<VirtualPath>> {
        let real = self.real_path(path);
        let entries = std::fs::read_dir(&real).ok()?;

        let mut files = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                files.push(path.join(name));
            }
        }
        files.sort();
        Some(files)
    }

    fn read_file(&self, path: &VirtualPath) -> Result<String, VfsError> {
        let real = self.real_path(path);
        if !real.is_file() {
            return Err(VfsError::NotFound {
                path: path.as_str().to_string(),
            });
        }
        std::fs::read_to_string(&real).map_err(|source| VfsError::Io { path: real, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp(s: &str) -> VirtualPath {
        VirtualPath::new(s).unwrap()
    }

    fn site() -> (tempfile::TempDir, DiskFs) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("site/sub")).unwrap();
        std::fs::write(dir.path().join("site/a.page"), "#page A").unwrap();
        std::fs::write(dir.path().join("site/b.frag"), "#fragment B").unwrap();
        std::fs::write(dir.path().join("site/sub/c.page"), "#page C").unwrap();
        let fs = DiskFs::new(dir.path());
        (dir, fs)
    }

    #[test]
    fn existence_checks() {
        let (_dir, fs) = site();
        assert!(fs.file_exists(&vp("/site/a.page")));
        assert!(!fs.file_exists(&vp("/site/missing.page")));
        assert!(fs.dir_exists(&vp("/site")));
        assert!(!fs.dir_exists(&vp("/site/a.page")));
    }

    #[test]
    fn read_round_trip() {
        let (_dir, fs) = site();
        assert_eq!(fs.read_file(&vp("/site/a.page")).unwrap(), "#page A");
        let err = fs.read_file(&vp("/site/missing.page")).unwrap_err();
        assert!(matches!(err, VfsError::NotFound { .. }));
    }

    #[test]
    fn listing_skips_subdirectories() {
        let (_dir, fs) = site();
        let listed = fs.list_directory(&vp("/site")).unwrap();
        let names: Vec<&str> = listed.iter().map(|p| p.file_name()).collect();
        assert_eq!(names, vec!["a.page", "b.frag"]);
    }

    #[test]
    fn listing_missing_directory_is_absent() {
        let (_dir, fs) = site();
        assert!(fs.list_directory(&vp("/nope")).is_none());
    }
}
