//! Dependency-change subscription.

use kiln_common::VirtualPath;
use std::sync::Mutex;

/// Receives dependency registrations from the build orchestrator.
///
/// After a successful build, the orchestrator registers each built identifier
/// with the set of source files it depends on. The notifier (typically a file
/// watcher owned by the host) is expected to call back into
/// `BuildManager::on_changed` with the identifier when any of those files
/// changes; the cache consumes that callback as an invalidation. The cache
/// itself never polls.
pub trait ChangeNotifier: Send + Sync {
    /// Registers interest in `dependencies` on behalf of `identifier`.
    fn watch(&self, identifier: &VirtualPath, dependencies: &[VirtualPath]);
}

/// A [`ChangeNotifier`] that records registrations.
///
/// Used by tests and by hosts that drive invalidation from their own polling
/// loop instead of a native watcher.
#[derive(Default)]
pub struct RecordingNotifier {
    watches: Mutex<Vec<(VirtualPath, Vec<VirtualPath>)>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all registrations made so far.
    pub fn watches(&self) -> Vec<(VirtualPath, Vec<VirtualPath>)> {
        self.watches.lock().unwrap().clone()
    }

    /// Returns the registered dependency set for `identifier`, if any.
    pub fn dependencies_of(&self, identifier: &VirtualPath) -> Option<Vec<VirtualPath>> {
        self.watches
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, deps)| deps.clone())
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn watch(&self, identifier: &VirtualPath, dependencies: &[VirtualPath]) {
        self.watches
            .lock()
            .unwrap()
            .push((identifier.clone(), dependencies.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp(s: &str) -> VirtualPath {
        VirtualPath::new(s).unwrap()
    }

    #[test]
    fn records_watches() {
        let notifier = RecordingNotifier::new();
        notifier.watch(&vp("/a.page"), &[vp("/a.page"), vp("/h.frag")]);

        let watches = notifier.watches();
        assert_eq!(watches.len(), 1);
        assert_eq!(
            notifier.dependencies_of(&vp("/a.page")).unwrap(),
            vec![vp("/a.page"), vp("/h.frag")]
        );
        assert!(notifier.dependencies_of(&vp("/b.page")).is_none());
    }
}
