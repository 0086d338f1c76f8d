//! [`Authority`] assembled from pluggable collaborators.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::authority::{
    Authenticator, Authority, Authorizer, Permission, RememberMeManager, SessionManager,
};
use crate::credential::{AuthenticationInfo, Credential};
use crate::error::{AuthenticationError, AuthorizationError, SessionError};
use crate::identity::{Identity, IdentityBuildContext, IdentityState};
use crate::principal::PrincipalCollection;
use crate::session::{
    AUTHENTICATED_SESSION_KEY, PRINCIPALS_SESSION_KEY, Session, SessionContext, SessionId,
};
use crate::thread_context;

/// Authority delegating to an authenticator, an authorizer, a session manager
/// and, optionally, a remember-me manager.
///
/// Identities it builds keep their principals and authenticated flag in their
/// session, so an identity rebuilt from a session id alone (the next request
/// of the same client, say) comes back in the same state.
pub struct DefaultAuthority {
    authenticator: Arc<dyn Authenticator>,
    authorizer: Arc<dyn Authorizer>,
    sessions: Arc<dyn SessionManager>,
    remember_me: Option<Arc<dyn RememberMeManager>>,
}

impl DefaultAuthority {
    #[must_use]
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        authorizer: Arc<dyn Authorizer>,
        sessions: Arc<dyn SessionManager>,
    ) -> Self {
        Self {
            authenticator,
            authorizer,
            sessions,
            remember_me: None,
        }
    }

    #[must_use]
    pub fn with_remember_me(mut self, remember_me: Arc<dyn RememberMeManager>) -> Self {
        self.remember_me = Some(remember_me);
        self
    }

    fn build_identity(
        &self,
        authority: Arc<dyn Authority>,
        mut context: IdentityBuildContext,
    ) -> Identity {
        let session = self.resolve_session(&mut context);
        if context.principals.is_empty() {
            self.resolve_principals(&mut context, session.as_ref());
        }

        let identity = Identity::from_context(authority, context);
        self.save(&identity);
        identity
    }

    fn resolve_session(&self, context: &mut IdentityBuildContext) -> Option<Session> {
        let id = context.session_id?;
        match self.sessions.get_session(id) {
            Ok(Some(session)) => Some(session),
            Ok(None) => {
                debug!(session_id = %id, "Session referenced by build context no longer exists");
                context.session_id = None;
                None
            }
            Err(e) => {
                debug!(session_id = %id, error = %e, "Ignoring unusable session in build context");
                context.session_id = None;
                None
            }
        }
    }

    fn resolve_principals(&self, context: &mut IdentityBuildContext, session: Option<&Session>) {
        let stored = session
            .and_then(|s| s.attribute(PRINCIPALS_SESSION_KEY))
            .and_then(|v| serde_json::from_value::<PrincipalCollection>(v.clone()).ok())
            .filter(|p| !p.is_empty());

        if let Some(principals) = stored {
            context.authenticated = session
                .and_then(|s| s.attribute(AUTHENTICATED_SESSION_KEY))
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            context.principals = principals;
            return;
        }

        if let Some(remembered) = self
            .remember_me
            .as_ref()
            .and_then(|rm| rm.remembered_principals(context))
            .filter(|p| !p.is_empty())
        {
            debug!(principal = ?remembered.primary(), "Using remembered principals");
            context.principals = remembered;
            context.authenticated = false;
        }
    }

    /// Mirror the identity's principals into its session.
    fn save(&self, identity: &Identity) {
        let principals = identity.principals();
        if principals.is_empty() {
            if let Some(id) = identity.session_id() {
                for key in [PRINCIPALS_SESSION_KEY, AUTHENTICATED_SESSION_KEY] {
                    if let Err(e) = self.sessions.remove_attribute(id, key) {
                        debug!(session_id = %id, error = %e, "Unable to clear session principals");
                    }
                }
            }
            return;
        }

        let session = match identity.session(identity.is_session_creation_enabled()) {
            Ok(Some(session)) => session,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Unable to obtain session to store principals");
                return;
            }
        };

        let value = match serde_json::to_value(&principals) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Unable to serialize principals");
                return;
            }
        };
        let stored = self
            .sessions
            .set_attribute(session.id, PRINCIPALS_SESSION_KEY, value)
            .and_then(|()| {
                self.sessions.set_attribute(
                    session.id,
                    AUTHENTICATED_SESSION_KEY,
                    serde_json::Value::Bool(identity.is_authenticated()),
                )
            });
        if let Err(e) = stored {
            warn!(session_id = %session.id, error = %e, "Unable to store principals in session");
        }
    }
}

impl fmt::Debug for DefaultAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultAuthority")
            .field("remember_me", &self.remember_me.is_some())
            .finish_non_exhaustive()
    }
}

impl Authenticator for DefaultAuthority {
    fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<AuthenticationInfo, AuthenticationError> {
        self.authenticator.authenticate(credential)
    }
}

impl Authorizer for DefaultAuthority {
    fn is_permitted(&self, principals: &PrincipalCollection, permission: &Permission) -> bool {
        self.authorizer.is_permitted(principals, permission)
    }

    fn has_role(&self, principals: &PrincipalCollection, role: &str) -> bool {
        self.authorizer.has_role(principals, role)
    }

    fn is_permitted_all(&self, principals: &PrincipalCollection, permissions: &[Permission]) -> bool {
        self.authorizer.is_permitted_all(principals, permissions)
    }

    fn has_all_roles(&self, principals: &PrincipalCollection, roles: &[&str]) -> bool {
        self.authorizer.has_all_roles(principals, roles)
    }

    fn check_permission(
        &self,
        principals: &PrincipalCollection,
        permission: &Permission,
    ) -> Result<(), AuthorizationError> {
        self.authorizer.check_permission(principals, permission)
    }

    fn check_permissions(
        &self,
        principals: &PrincipalCollection,
        permissions: &[Permission],
    ) -> Result<(), AuthorizationError> {
        self.authorizer.check_permissions(principals, permissions)
    }

    fn check_role(&self, principals: &PrincipalCollection, role: &str) -> Result<(), AuthorizationError> {
        self.authorizer.check_role(principals, role)
    }

    fn check_roles(&self, principals: &PrincipalCollection, roles: &[&str]) -> Result<(), AuthorizationError> {
        self.authorizer.check_roles(principals, roles)
    }
}

impl SessionManager for DefaultAuthority {
    fn start(&self, context: &SessionContext) -> Result<Session, SessionError> {
        self.sessions.start(context)
    }

    fn get_session(&self, id: SessionId) -> Result<Option<Session>, SessionError> {
        self.sessions.get_session(id)
    }

    fn touch(&self, id: SessionId) -> Result<(), SessionError> {
        self.sessions.touch(id)
    }

    fn stop(&self, id: SessionId) -> Result<(), SessionError> {
        self.sessions.stop(id)
    }

    fn set_attribute(
        &self,
        id: SessionId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), SessionError> {
        self.sessions.set_attribute(id, key, value)
    }

    fn remove_attribute(&self, id: SessionId, key: &str) -> Result<Option<serde_json::Value>, SessionError> {
        self.sessions.remove_attribute(id, key)
    }
}

impl Authority for DefaultAuthority {
    #[tracing::instrument(skip_all, fields(principal = %credential.principal()))]
    fn login(&self, identity: &Identity, credential: &Credential) -> Result<Identity, AuthenticationError> {
        let info = match self.authenticator.authenticate(credential) {
            Ok(info) => info,
            Err(e) => {
                info!(error = %e, "Authentication failed");
                if let Some(rm) = &self.remember_me {
                    rm.on_failed_login(identity, credential, &e);
                }
                return Err(e);
            }
        };

        let context = IdentityBuildContext {
            principals: info.principals.clone(),
            authenticated: true,
            host: credential.host().map(str::to_owned).or_else(|| identity.host()),
            session_id: identity.session_id(),
            session_creation_enabled: identity.is_session_creation_enabled(),
            authority: Some(identity.authority()),
            transport: identity.transport(),
        };
        let logged_in = self.build_identity(identity.authority(), context);

        if let Some(rm) = &self.remember_me {
            rm.on_successful_login(&logged_in, credential, &info);
        }
        info!(session_id = ?logged_in.session_id(), "Login succeeded");
        Ok(logged_in)
    }

    fn logout(&self, identity: &Identity) {
        if identity.state() == IdentityState::Anonymous {
            debug!("Logout of anonymous identity ignored");
            return;
        }

        if let Some(rm) = &self.remember_me {
            rm.on_logout(identity);
        }
        if let Some(id) = identity.session_id()
            && let Err(e) = self.sessions.stop(id)
        {
            debug!(session_id = %id, error = %e, "Session already gone at logout");
        }
        if thread_context::identity().is_some_and(|bound| bound.ptr_eq(identity)) {
            thread_context::unbind_identity();
        }
        info!(principal = ?identity.primary_principal(), "Logged out");
    }

    fn create_identity(self: Arc<Self>, context: IdentityBuildContext) -> Identity {
        let authority = context
            .authority
            .clone()
            .unwrap_or_else(|| Arc::clone(&self) as Arc<dyn Authority>);
        self.build_identity(authority, context)
    }
}
