//! Resolution chain for the ambient authority and identity.
//!
//! Lookup order for the authority: the thread binding, then the process-wide
//! fallback held by an [`AuthorityResolver`]. The identity is looked up on the
//! thread and, when missing, built by the resolved authority and bound.
//!
//! The process-wide fallback exists for bootstrap and compatibility. Embedding
//! frameworks should prefer scoping an authority explicitly (binding it per
//! unit of work, or owning an [`AuthorityResolver`] instance) over the global.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::authority::Authority;
use crate::error::UnavailableAuthority;
use crate::identity::{Identity, IdentityBuildContext};
use crate::thread_context;

static GLOBAL: AuthorityResolver = AuthorityResolver::new();

/// Holder of a process-wide fallback authority plus the resolution logic.
pub struct AuthorityResolver {
    fallback: RwLock<Option<Arc<dyn Authority>>>,
}

impl AuthorityResolver {
    /// Resolver with no fallback.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fallback: RwLock::new(None),
        }
    }

    /// The process-global resolver used by the free functions of this module.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    #[must_use]
    pub fn with_fallback(authority: Arc<dyn Authority>) -> Self {
        Self {
            fallback: RwLock::new(Some(authority)),
        }
    }

    /// Replace the fallback, returning the previous one.
    pub fn set_fallback(&self, authority: Option<Arc<dyn Authority>>) -> Option<Arc<dyn Authority>> {
        std::mem::replace(&mut *self.fallback.write(), authority)
    }

    pub fn clear_fallback(&self) -> Option<Arc<dyn Authority>> {
        self.set_fallback(None)
    }

    #[must_use]
    pub fn fallback(&self) -> Option<Arc<dyn Authority>> {
        self.fallback.read().clone()
    }

    /// Install `authority` as the fallback until the returned guard drops,
    /// at which point the previous fallback (possibly none) is reinstated.
    pub fn install(&self, authority: Arc<dyn Authority>) -> FallbackGuard<'_> {
        let previous = self.set_fallback(Some(authority));
        debug!(replaced = previous.is_some(), "Installed fallback authority");
        FallbackGuard {
            resolver: self,
            previous,
        }
    }

    /// Thread-bound authority, else the fallback.
    ///
    /// # Errors
    ///
    /// [`UnavailableAuthority`] when neither lookup point has an authority.
    pub fn resolve_authority(&self) -> Result<Arc<dyn Authority>, UnavailableAuthority> {
        if let Some(authority) = thread_context::authority() {
            trace!("Resolved thread-bound authority");
            return Ok(authority);
        }
        if let Some(authority) = self.fallback() {
            trace!("Resolved fallback authority");
            return Ok(authority);
        }
        warn!("No authority bound to the thread context and no fallback installed");
        Err(UnavailableAuthority)
    }

    /// Thread-bound identity, else a fresh one built by the resolved authority
    /// and bound to the current thread.
    ///
    /// # Errors
    ///
    /// [`UnavailableAuthority`] when no identity is bound and no authority can
    /// be resolved to build one.
    pub fn resolve_identity(&self) -> Result<Identity, UnavailableAuthority> {
        if let Some(identity) = thread_context::identity() {
            return Ok(identity);
        }

        let authority = self.resolve_authority()?;
        let context = IdentityBuildContext::default().with_authority(Arc::clone(&authority));
        let identity = authority.create_identity(context);
        thread_context::bind_identity(identity.clone());
        debug!(state = ?identity.state(), "Bound new identity to thread");
        Ok(identity)
    }
}

impl Default for AuthorityResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AuthorityResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorityResolver")
            .field("fallback", &self.fallback.read().is_some())
            .finish()
    }
}

/// Reinstates the previous fallback authority on drop.
#[must_use = "the fallback is removed again when the guard is dropped"]
pub struct FallbackGuard<'a> {
    resolver: &'a AuthorityResolver,
    previous: Option<Arc<dyn Authority>>,
}

impl Drop for FallbackGuard<'_> {
    fn drop(&mut self) {
        self.resolver.set_fallback(self.previous.take());
    }
}

/// Resolve the ambient authority through the global resolver.
///
/// # Errors
///
/// See [`AuthorityResolver::resolve_authority`].
pub fn resolve_authority() -> Result<Arc<dyn Authority>, UnavailableAuthority> {
    GLOBAL.resolve_authority()
}

/// Resolve (or lazily build and bind) the ambient identity through the global resolver.
///
/// # Errors
///
/// See [`AuthorityResolver::resolve_identity`].
pub fn resolve_identity() -> Result<Identity, UnavailableAuthority> {
    GLOBAL.resolve_identity()
}

/// Replace the process-wide fallback authority.
///
/// Bootstrap hook for standalone programs; see the module docs.
pub fn set_fallback_authority(authority: Arc<dyn Authority>) {
    GLOBAL.set_fallback(Some(authority));
}

pub fn clear_fallback_authority() {
    GLOBAL.clear_fallback();
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::identity::IdentityState;
    use crate::testing::stub_authority;
    use tracing_test::traced_test;

    #[test]
    fn unavailable_without_binding_or_fallback() {
        thread_context::clear();
        let resolver = AuthorityResolver::new();

        assert!(resolver.resolve_authority().is_err());
        assert!(resolver.resolve_identity().is_err());
        assert!(thread_context::is_empty());
    }

    #[traced_test]
    #[test]
    fn unavailable_authority_is_logged() {
        thread_context::clear();
        assert!(AuthorityResolver::new().resolve_authority().is_err());
        assert!(logs_contain("no fallback installed"));
    }

    #[test]
    fn fallback_used_when_thread_is_unbound() {
        thread_context::clear();
        let fallback = stub_authority();
        let resolver = AuthorityResolver::with_fallback(Arc::clone(&fallback));

        let resolved = resolver.resolve_authority().unwrap();
        assert!(Arc::ptr_eq(&resolved, &fallback));
    }

    #[test]
    fn thread_binding_wins_over_fallback() {
        thread_context::clear();
        let fallback = stub_authority();
        let bound = stub_authority();
        let resolver = AuthorityResolver::with_fallback(fallback);
        thread_context::bind_authority(Arc::clone(&bound));

        let resolved = resolver.resolve_authority().unwrap();
        assert!(Arc::ptr_eq(&resolved, &bound));
        thread_context::clear();
    }

    #[test]
    fn resolve_identity_builds_binds_and_reuses() {
        thread_context::clear();
        let resolver = AuthorityResolver::with_fallback(stub_authority());

        let first = resolver.resolve_identity().unwrap();
        let second = resolver.resolve_identity().unwrap();

        assert!(first.ptr_eq(&second));
        assert_eq!(first.state(), IdentityState::Anonymous);
        assert!(thread_context::identity().unwrap().ptr_eq(&first));
        thread_context::clear();
    }

    #[test]
    fn resolve_identity_uses_resolved_authority() {
        thread_context::clear();
        let bound = stub_authority();
        thread_context::bind_authority(Arc::clone(&bound));

        let identity = AuthorityResolver::new().resolve_identity().unwrap();
        assert!(Arc::ptr_eq(&identity.authority(), &bound));
        thread_context::clear();
    }

    #[test]
    fn bound_identity_needs_no_authority() {
        thread_context::clear();
        let identity = crate::testing::anonymous_identity();
        thread_context::bind_identity(identity.clone());

        let resolved = AuthorityResolver::new().resolve_identity().unwrap();
        assert!(resolved.ptr_eq(&identity));
        thread_context::clear();
    }

    #[test]
    fn install_guard_restores_previous_fallback() {
        let original = stub_authority();
        let resolver = AuthorityResolver::with_fallback(Arc::clone(&original));

        {
            let _guard = resolver.install(stub_authority());
            assert!(!Arc::ptr_eq(&resolver.fallback().unwrap(), &original));
        }

        assert!(Arc::ptr_eq(&resolver.fallback().unwrap(), &original));
        resolver.clear_fallback();
        assert!(resolver.fallback().is_none());
    }
}
