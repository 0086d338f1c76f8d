//! In-memory session manager with an optional idle timeout.

use chrono::{TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use tracing::{debug, info};
use warden_security::{Session, SessionContext, SessionError, SessionId, SessionManager};

/// Sessions held in a concurrent map.
///
/// Expiry is checked lazily on access: an expired session is removed and
/// reported as [`SessionError::Expired`] exactly once, after which its id is
/// unknown. [`purge_expired`](Self::purge_expired) sweeps the rest.
#[derive(Debug, Default)]
pub struct MemorySessionManager {
    sessions: DashMap<SessionId, Session>,
    timeout: Option<TimeDelta>,
}

impl MemorySessionManager {
    #[must_use]
    pub fn new(timeout: Option<TimeDelta>) -> Self {
        Self {
            sessions: DashMap::new(),
            timeout,
        }
    }

    /// Manager whose sessions expire after `secs` seconds of inactivity.
    ///
    /// A timeout too large for [`TimeDelta`] is treated as no timeout.
    #[must_use]
    pub fn with_timeout_secs(secs: Option<u64>) -> Self {
        let timeout = secs
            .and_then(|s| i64::try_from(s).ok())
            .and_then(TimeDelta::try_seconds);
        Self::new(timeout)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Remove every expired session, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            info!(purged, "Purged expired sessions");
        }
        purged
    }

    fn live(&self, id: SessionId) -> Result<RefMut<'_, SessionId, Session>, SessionError> {
        let entry = self.sessions.get_mut(&id).ok_or(SessionError::Unknown(id))?;
        if entry.is_expired_at(Utc::now()) {
            drop(entry);
            self.sessions.remove(&id);
            debug!(session_id = %id, "Session expired");
            return Err(SessionError::Expired(id));
        }
        Ok(entry)
    }
}

impl SessionManager for MemorySessionManager {
    fn start(&self, context: &SessionContext) -> Result<Session, SessionError> {
        let session = Session::start(context.effective_host(), self.timeout);
        debug!(session_id = %session.id, host = ?session.host, "Session started");
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    fn get_session(&self, id: SessionId) -> Result<Option<Session>, SessionError> {
        match self.live(id) {
            Ok(session) => Ok(Some(session.clone())),
            Err(SessionError::Unknown(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn touch(&self, id: SessionId) -> Result<(), SessionError> {
        self.live(id)?.last_access_at = Utc::now();
        Ok(())
    }

    fn stop(&self, id: SessionId) -> Result<(), SessionError> {
        if self.sessions.remove(&id).is_none() {
            return Err(SessionError::Unknown(id));
        }
        debug!(session_id = %id, "Session stopped");
        Ok(())
    }

    fn set_attribute(
        &self,
        id: SessionId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), SessionError> {
        self.live(id)?.attributes.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove_attribute(
        &self,
        id: SessionId,
        key: &str,
    ) -> Result<Option<serde_json::Value>, SessionError> {
        Ok(self.live(id)?.attributes.remove(key))
    }
}
