//! In-crate collaborators for unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use secrecy::ExposeSecret;

use crate::authority::{Authenticator, Authority, Authorizer, Permission, SessionManager};
use crate::credential::{AuthenticationInfo, Credential};
use crate::default_authority::DefaultAuthority;
use crate::error::{AuthenticationError, SessionError};
use crate::identity::{Identity, IdentityBuildContext};
use crate::principal::PrincipalCollection;
use crate::session::{Session, SessionContext, SessionId};

pub const ALICE: &str = "alice";
pub const ALICE_SECRET: &str = "wonderland";

/// Accepts `alice` / `wonderland` only.
pub struct StubAuthenticator;

impl Authenticator for StubAuthenticator {
    fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<AuthenticationInfo, AuthenticationError> {
        if credential.principal() != ALICE {
            return Err(AuthenticationError::UnknownAccount(
                credential.principal().to_owned(),
            ));
        }
        if credential.secret().expose_secret() != ALICE_SECRET {
            return Err(AuthenticationError::IncorrectCredentials(ALICE.to_owned()));
        }
        Ok(AuthenticationInfo {
            principals: PrincipalCollection::single("stub", ALICE),
        })
    }
}

/// Alice is a `reader`; readers may `docs:read`.
pub struct StubAuthorizer;

impl Authorizer for StubAuthorizer {
    fn is_permitted(&self, principals: &PrincipalCollection, permission: &Permission) -> bool {
        self.has_role(principals, "reader") && permission.as_str() == "docs:read"
    }

    fn has_role(&self, principals: &PrincipalCollection, role: &str) -> bool {
        role == "reader" && principals.iter().any(|p| p.value() == ALICE)
    }
}

#[derive(Default)]
pub struct MemorySessions {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl SessionManager for MemorySessions {
    fn start(&self, context: &SessionContext) -> Result<Session, SessionError> {
        let session = Session::start(context.effective_host(), None);
        self.sessions.lock().insert(session.id, session.clone());
        Ok(session)
    }

    fn get_session(&self, id: SessionId) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.lock().get(&id).cloned())
    }

    fn touch(&self, id: SessionId) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::Unknown(id))?;
        session.last_access_at = Utc::now();
        Ok(())
    }

    fn stop(&self, id: SessionId) -> Result<(), SessionError> {
        self.sessions
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or(SessionError::Unknown(id))
    }

    fn set_attribute(
        &self,
        id: SessionId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::Unknown(id))?;
        session.attributes.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove_attribute(
        &self,
        id: SessionId,
        key: &str,
    ) -> Result<Option<serde_json::Value>, SessionError> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::Unknown(id))?;
        Ok(session.attributes.remove(key))
    }
}

pub fn stub_authority() -> Arc<dyn Authority> {
    Arc::new(DefaultAuthority::new(
        Arc::new(StubAuthenticator),
        Arc::new(StubAuthorizer),
        Arc::new(MemorySessions::default()),
    ))
}

pub fn anonymous_identity() -> Identity {
    stub_authority().create_identity(IdentityBuildContext::default())
}
