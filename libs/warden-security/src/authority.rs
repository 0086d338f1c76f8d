//! The authority facade and the collaborator contracts it is assembled from.
//!
//! - [`Authenticator`] - verifies a [`Credential`]
//! - [`Authorizer`] - permission and role checks over a [`PrincipalCollection`]
//! - [`SessionManager`] - session lifecycle keyed by [`SessionId`]
//! - [`RememberMeManager`] - optional persistence of principals between logins
//! - [`Authority`] - the union of the above plus identity lifecycle
//!
//! Implementations are consumed, not provided: see `DefaultAuthority` for the
//! composition and the static realm crate for development collaborators.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::credential::{AuthenticationInfo, Credential};
use crate::error::{AuthenticationError, AuthorizationError, SessionError};
use crate::identity::{Identity, IdentityBuildContext};
use crate::principal::PrincipalCollection;
use crate::session::{Session, SessionContext, SessionId};

/// Opaque permission descriptor such as `printer:print:lp7`.
///
/// Interpretation belongs entirely to the [`Authorizer`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    #[must_use]
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self(descriptor.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Permission {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Permission {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Verifies credentials.
pub trait Authenticator: Send + Sync {
    /// Authenticate `credential` and return the principals it proves.
    ///
    /// # Errors
    ///
    /// An [`AuthenticationError`] for unknown accounts, bad secrets, locked,
    /// disabled or expired accounts.
    fn authenticate(&self, credential: &Credential)
    -> Result<AuthenticationInfo, AuthenticationError>;
}

/// Permission and role evaluation.
///
/// Only [`is_permitted`](Self::is_permitted) and [`has_role`](Self::has_role)
/// are required; the aggregate and `check_*` forms derive from them.
pub trait Authorizer: Send + Sync {
    fn is_permitted(&self, principals: &PrincipalCollection, permission: &Permission) -> bool;

    fn has_role(&self, principals: &PrincipalCollection, role: &str) -> bool;

    fn is_permitted_all(&self, principals: &PrincipalCollection, permissions: &[Permission]) -> bool {
        permissions.iter().all(|p| self.is_permitted(principals, p))
    }

    fn has_all_roles(&self, principals: &PrincipalCollection, roles: &[&str]) -> bool {
        roles.iter().all(|r| self.has_role(principals, r))
    }

    /// # Errors
    ///
    /// `Unauthenticated` when `principals` is empty, `Unauthorized` when the
    /// permission is not granted.
    fn check_permission(
        &self,
        principals: &PrincipalCollection,
        permission: &Permission,
    ) -> Result<(), AuthorizationError> {
        if principals.is_empty() {
            return Err(AuthorizationError::Unauthenticated);
        }
        if self.is_permitted(principals, permission) {
            Ok(())
        } else {
            Err(AuthorizationError::Unauthorized(format!(
                "missing permission [{permission}]"
            )))
        }
    }

    /// # Errors
    ///
    /// The first failing [`check_permission`](Self::check_permission).
    fn check_permissions(
        &self,
        principals: &PrincipalCollection,
        permissions: &[Permission],
    ) -> Result<(), AuthorizationError> {
        permissions
            .iter()
            .try_for_each(|p| self.check_permission(principals, p))
    }

    /// # Errors
    ///
    /// `Unauthenticated` when `principals` is empty, `Unauthorized` when the
    /// role is not held.
    fn check_role(&self, principals: &PrincipalCollection, role: &str) -> Result<(), AuthorizationError> {
        if principals.is_empty() {
            return Err(AuthorizationError::Unauthenticated);
        }
        if self.has_role(principals, role) {
            Ok(())
        } else {
            Err(AuthorizationError::Unauthorized(format!("missing role [{role}]")))
        }
    }

    /// # Errors
    ///
    /// The first failing [`check_role`](Self::check_role).
    fn check_roles(&self, principals: &PrincipalCollection, roles: &[&str]) -> Result<(), AuthorizationError> {
        roles.iter().try_for_each(|r| self.check_role(principals, r))
    }
}

/// Session lifecycle.
///
/// # Errors
///
/// Operations on an unknown id fail with [`SessionError::Unknown`]; operations
/// on a session whose idle timeout elapsed fail with [`SessionError::Expired`]
/// and the session is discarded.
pub trait SessionManager: Send + Sync {
    fn start(&self, context: &SessionContext) -> Result<Session, SessionError>;

    /// `Ok(None)` for ids that were never issued or were stopped.
    fn get_session(&self, id: SessionId) -> Result<Option<Session>, SessionError>;

    fn touch(&self, id: SessionId) -> Result<(), SessionError>;

    /// Invalidate the session.
    fn stop(&self, id: SessionId) -> Result<(), SessionError>;

    fn set_attribute(
        &self,
        id: SessionId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), SessionError>;

    fn remove_attribute(&self, id: SessionId, key: &str) -> Result<Option<serde_json::Value>, SessionError>;
}

/// Persists principals across logins (the source of *remembered* identities).
pub trait RememberMeManager: Send + Sync {
    /// Principals remembered for the interaction described by `context`.
    fn remembered_principals(&self, context: &IdentityBuildContext) -> Option<PrincipalCollection>;

    fn on_successful_login(&self, identity: &Identity, credential: &Credential, info: &AuthenticationInfo);

    fn on_failed_login(&self, identity: &Identity, credential: &Credential, error: &AuthenticationError);

    fn on_logout(&self, identity: &Identity);
}

/// Authentication, authorization, session management and identity lifecycle
/// behind one contract.
///
/// At most one authority is current for a resolution: a thread-bound instance
/// wins over the process-wide fallback (see [`crate::resolver`]).
pub trait Authority: Authenticator + Authorizer + SessionManager {
    /// Authenticate `credential` on behalf of `identity`.
    ///
    /// Returns a new *authenticated* identity carrying the credential's
    /// principals and reusing `identity`'s session. `identity` itself is not
    /// modified; [`Identity::login`] adopts the result.
    ///
    /// # Errors
    ///
    /// The authenticator's [`AuthenticationError`]. The input identity and any
    /// thread binding are left untouched.
    fn login(&self, identity: &Identity, credential: &Credential) -> Result<Identity, AuthenticationError>;

    /// Invalidate `identity`'s session and authenticated state, unbinding it
    /// from the current thread if it is the bound identity. No-op for an
    /// anonymous identity.
    fn logout(&self, identity: &Identity);

    /// Build an identity from `context`. Never binds anything.
    fn create_identity(self: Arc<Self>, context: IdentityBuildContext) -> Identity;
}

impl fmt::Debug for dyn Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Authority")
    }
}
