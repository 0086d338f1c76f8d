//! The identity delegate: "who is acting" within one logical interaction.
//!
//! An [`Identity`] holds principals, the authenticated flag, the originating
//! host and an optional session id. Every authorization or session query is
//! forwarded to the owning [`Authority`], which makes the actual decision.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::authority::{Authority, Permission};
use crate::credential::Credential;
use crate::error::{AuthenticationError, AuthorizationError, SessionError};
use crate::principal::{Principal, PrincipalCollection};
use crate::session::{Session, SessionContext, SessionId};
use crate::transport::TransportExchange;

/// Which of the three identity variants an instance currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityState {
    /// No principals, not authenticated.
    Anonymous,
    /// Principals recovered from persisted state, not authenticated in this interaction.
    Remembered,
    /// Principals proven by a successful login.
    Authenticated,
}

/// Everything needed to construct an [`Identity`]. Pure data.
#[derive(Clone)]
pub struct IdentityBuildContext {
    pub principals: PrincipalCollection,
    pub authenticated: bool,
    pub host: Option<String>,
    pub session_id: Option<SessionId>,
    /// Whether the identity may start a session on demand. Defaults to `true`.
    pub session_creation_enabled: bool,
    /// Owning authority. Filled in by the authority building the identity when absent.
    pub authority: Option<Arc<dyn Authority>>,
    pub transport: Option<Arc<dyn TransportExchange>>,
}

impl Default for IdentityBuildContext {
    fn default() -> Self {
        Self {
            principals: PrincipalCollection::new(),
            authenticated: false,
            host: None,
            session_id: None,
            session_creation_enabled: true,
            authority: None,
            transport: None,
        }
    }
}

impl IdentityBuildContext {
    #[must_use]
    pub fn with_principals(mut self, principals: PrincipalCollection) -> Self {
        self.principals = principals;
        self
    }

    #[must_use]
    pub fn with_authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    #[must_use]
    pub fn with_session_creation_enabled(mut self, enabled: bool) -> Self {
        self.session_creation_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_authority(mut self, authority: Arc<dyn Authority>) -> Self {
        self.authority = Some(authority);
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn TransportExchange>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Host from the context, else the transport's remote host.
    #[must_use]
    pub fn resolve_host(&self) -> Option<String> {
        self.host
            .clone()
            .or_else(|| self.transport.as_ref().and_then(|t| t.remote_host()))
    }
}

impl fmt::Debug for IdentityBuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityBuildContext")
            .field("principals", &self.principals)
            .field("authenticated", &self.authenticated)
            .field("host", &self.host)
            .field("session_id", &self.session_id)
            .field("session_creation_enabled", &self.session_creation_enabled)
            .field("authority", &self.authority.is_some())
            .field("transport", &self.transport)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
struct IdentityData {
    principals: PrincipalCollection,
    authenticated: bool,
    host: Option<String>,
    session_id: Option<SessionId>,
}

struct IdentityInner {
    data: RwLock<IdentityData>,
    session_creation_enabled: bool,
    authority: Arc<dyn Authority>,
    transport: Option<Arc<dyn TransportExchange>>,
}

/// Handle to one identity. Clones share state; compare instances with [`Identity::ptr_eq`].
#[derive(Clone)]
pub struct Identity {
    inner: Arc<IdentityInner>,
}

impl Identity {
    /// Build an identity owned by `authority`.
    ///
    /// `context.authority` is ignored in favour of the explicit argument. An
    /// identity without principals is never authenticated.
    #[must_use]
    pub fn from_context(authority: Arc<dyn Authority>, context: IdentityBuildContext) -> Self {
        let authenticated = context.authenticated && !context.principals.is_empty();
        let host = context.resolve_host();
        Self {
            inner: Arc::new(IdentityInner {
                data: RwLock::new(IdentityData {
                    principals: context.principals,
                    authenticated,
                    host,
                    session_id: context.session_id,
                }),
                session_creation_enabled: context.session_creation_enabled,
                authority,
                transport: context.transport,
            }),
        }
    }

    /// Whether both handles refer to the same identity instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn principals(&self) -> PrincipalCollection {
        self.inner.data.read().principals.clone()
    }

    #[must_use]
    pub fn primary_principal(&self) -> Option<Principal> {
        self.inner.data.read().principals.primary().cloned()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.data.read().authenticated
    }

    /// Principals are present but were not proven in this interaction.
    #[must_use]
    pub fn is_remembered(&self) -> bool {
        self.state() == IdentityState::Remembered
    }

    #[must_use]
    pub fn state(&self) -> IdentityState {
        let data = self.inner.data.read();
        if data.authenticated {
            IdentityState::Authenticated
        } else if data.principals.is_empty() {
            IdentityState::Anonymous
        } else {
            IdentityState::Remembered
        }
    }

    #[must_use]
    pub fn host(&self) -> Option<String> {
        self.inner.data.read().host.clone()
    }

    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.data.read().session_id
    }

    #[must_use]
    pub fn is_session_creation_enabled(&self) -> bool {
        self.inner.session_creation_enabled
    }

    /// The authority this identity delegates to.
    #[must_use]
    pub fn authority(&self) -> Arc<dyn Authority> {
        Arc::clone(&self.inner.authority)
    }

    #[must_use]
    pub fn transport(&self) -> Option<Arc<dyn TransportExchange>> {
        self.inner.transport.clone()
    }

    /// Context handed to the session manager when this identity starts a session.
    ///
    /// Transport-aware identities inject their exchange so the session manager
    /// can read request metadata such as the remote host.
    #[must_use]
    pub fn create_session_context(&self) -> SessionContext {
        let host = self.host();
        match &self.inner.transport {
            Some(transport) => SessionContext {
                host: host.or_else(|| transport.remote_host()),
                transport: Some(Arc::clone(transport)),
            },
            None => SessionContext {
                host,
                transport: None,
            },
        }
    }

    /// Current session, starting one when `create` is set and none exists.
    ///
    /// A session id that the manager no longer knows (stopped or expired) is
    /// dropped and treated as absent.
    ///
    /// # Errors
    ///
    /// [`SessionError::CreationDisabled`] when a session must be created but
    /// this identity disallows it; any other session manager failure.
    pub fn session(&self, create: bool) -> Result<Option<Session>, SessionError> {
        if let Some(id) = self.session_id() {
            match self.inner.authority.get_session(id) {
                Ok(Some(session)) => return Ok(Some(session)),
                Ok(None) | Err(SessionError::Expired(_) | SessionError::Unknown(_)) => {
                    debug!(session_id = %id, "Dropping stale session reference");
                    self.inner.data.write().session_id = None;
                }
                Err(e) => return Err(e),
            }
        }

        if !create {
            return Ok(None);
        }
        if !self.inner.session_creation_enabled {
            return Err(SessionError::CreationDisabled);
        }

        let session = self.inner.authority.start(&self.create_session_context())?;
        debug!(session_id = %session.id, "Started session for identity");
        self.inner.data.write().session_id = Some(session.id);
        Ok(Some(session))
    }

    /// Refresh the session's last-access time. No-op without a session.
    ///
    /// # Errors
    ///
    /// The session manager's error, e.g. [`SessionError::Expired`].
    pub fn touch_session(&self) -> Result<(), SessionError> {
        match self.session_id() {
            Some(id) => self.inner.authority.touch(id),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn is_permitted(&self, permission: &Permission) -> bool {
        let principals = self.principals();
        !principals.is_empty() && self.inner.authority.is_permitted(&principals, permission)
    }

    #[must_use]
    pub fn is_permitted_all(&self, permissions: &[Permission]) -> bool {
        let principals = self.principals();
        !principals.is_empty() && self.inner.authority.is_permitted_all(&principals, permissions)
    }

    /// # Errors
    ///
    /// `Unauthenticated` for an anonymous identity, `Unauthorized` when the
    /// authority denies the permission.
    pub fn check_permission(&self, permission: &Permission) -> Result<(), AuthorizationError> {
        self.inner
            .authority
            .check_permission(&self.principals(), permission)
    }

    /// # Errors
    ///
    /// See [`check_permission`](Self::check_permission).
    pub fn check_permissions(&self, permissions: &[Permission]) -> Result<(), AuthorizationError> {
        self.inner
            .authority
            .check_permissions(&self.principals(), permissions)
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        let principals = self.principals();
        !principals.is_empty() && self.inner.authority.has_role(&principals, role)
    }

    #[must_use]
    pub fn has_all_roles(&self, roles: &[&str]) -> bool {
        let principals = self.principals();
        !principals.is_empty() && self.inner.authority.has_all_roles(&principals, roles)
    }

    /// # Errors
    ///
    /// `Unauthenticated` for an anonymous identity, `Unauthorized` when the
    /// role is not held.
    pub fn check_role(&self, role: &str) -> Result<(), AuthorizationError> {
        self.inner.authority.check_role(&self.principals(), role)
    }

    /// # Errors
    ///
    /// See [`check_role`](Self::check_role).
    pub fn check_roles(&self, roles: &[&str]) -> Result<(), AuthorizationError> {
        self.inner.authority.check_roles(&self.principals(), roles)
    }

    /// Log in through the owning authority and adopt the resulting state.
    ///
    /// On success this handle (and every clone, including a thread-bound one)
    /// becomes *authenticated*.
    ///
    /// # Errors
    ///
    /// The authority's [`AuthenticationError`]; this identity is unchanged.
    pub fn login(&self, credential: &Credential) -> Result<(), AuthenticationError> {
        let authority = self.authority();
        let logged_in = authority.login(self, credential)?;
        let adopted = logged_in.inner.data.read().clone();
        *self.inner.data.write() = adopted;
        Ok(())
    }

    /// Log out through the owning authority and reset to *anonymous*.
    ///
    /// An anonymous identity is left exactly as it is, session included.
    pub fn logout(&self) {
        if self.state() == IdentityState::Anonymous {
            debug!("Logout of anonymous identity ignored");
            return;
        }
        let authority = self.authority();
        authority.logout(self);

        let mut data = self.inner.data.write();
        data.principals = PrincipalCollection::new();
        data.authenticated = false;
        data.session_id = None;
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.data.read();
        f.debug_struct("Identity")
            .field("principals", &data.principals)
            .field("authenticated", &data.authenticated)
            .field("host", &data.host)
            .field("session_id", &data.session_id)
            .finish_non_exhaustive()
    }
}
