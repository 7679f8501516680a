//! Per-invocation build session state.
//!
//! One `BuildSession` exists per logical build call chain: it is created at a
//! public entry point and threaded through every nested build triggered from
//! providers. It carries the recursion kind stack (used to suppress batching
//! on same-kind re-entry) and the set of scope keys whose tickets this chain
//! already holds (used to re-enter the same directory without self-deadlock).

use crate::kind::BuildKind;
use std::cell::RefCell;
use std::collections::HashSet;

/// Recursion bookkeeping for one logical build invocation.
///
/// Lives on a single thread for the duration of the call chain; nested builds
/// borrow it rather than creating their own.
#[derive(Default, Debug)]
pub(crate) struct BuildSession {
    kinds: RefCell<Vec<BuildKind>>,
    held_scopes: RefCell<HashSet<String>>,
}

impl BuildSession {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// The kind of the innermost in-progress build, if any.
    pub fn top(&self) -> Option<BuildKind> {
        self.kinds.borrow().last().copied()
    }

    /// Pushes a kind for an in-progress build pass; popped when the returned
    /// guard drops.
    pub fn push(&self, kind: BuildKind) -> KindGuard<'_> {
        self.kinds.borrow_mut().push(kind);
        KindGuard {
            session: Some(self),
        }
    }

    /// Whether this chain already holds the ticket for `scope_key`.
    pub fn holds(&self, scope_key: &str) -> bool {
        self.held_scopes.borrow().contains(scope_key)
    }

    /// Records that this chain holds the ticket for `scope_key`.
    pub fn hold(&self, scope_key: String) {
        self.held_scopes.borrow_mut().insert(scope_key);
    }

    /// Forgets a held scope ticket.
    pub fn release(&self, scope_key: &str) {
        self.held_scopes.borrow_mut().remove(scope_key);
    }
}

/// Pops one kind-stack entry on drop.
#[derive(Debug)]
pub(crate) struct KindGuard<'a> {
    session: Option<&'a BuildSession>,
}

impl KindGuard<'_> {
    /// A guard that pops nothing, for kinds that never push.
    pub fn empty() -> Self {
        Self { session: None }
    }
}

impl Drop for KindGuard<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.session {
            session.kinds.borrow_mut().pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_pop_via_guard() {
        let session = BuildSession::new();
        assert_eq!(session.top(), None);
        {
            let _outer = session.push(BuildKind::Page);
            assert_eq!(session.top(), Some(BuildKind::Page));
            {
                let _inner = session.push(BuildKind::Component);
                assert_eq!(session.top(), Some(BuildKind::Component));
            }
            assert_eq!(session.top(), Some(BuildKind::Page));
        }
        assert_eq!(session.top(), None);
    }

    #[test]
    fn empty_guard_pops_nothing() {
        let session = BuildSession::new();
        let _outer = session.push(BuildKind::Page);
        {
            let _noop = KindGuard::empty();
        }
        assert_eq!(session.top(), Some(BuildKind::Page));
    }

    #[test]
    fn scope_holding() {
        let session = BuildSession::new();
        assert!(!session.holds("/site"));
        session.hold("/site".to_string());
        assert!(session.holds("/site"));
        session.release("/site");
        assert!(!session.holds("/site"));
    }
}
