//! Session values exchanged with a [`SessionManager`](crate::SessionManager).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transport::TransportExchange;

/// Session attribute holding the serialized principal collection.
pub const PRINCIPALS_SESSION_KEY: &str = "warden.principals";

/// Session attribute holding the authenticated flag.
pub const AUTHENTICATED_SESSION_KEY: &str = "warden.authenticated";

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of a session as held by the session manager.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub host: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_access_at: DateTime<Utc>,
    /// Idle timeout. `None` means the session never expires.
    pub timeout: Option<TimeDelta>,
    pub attributes: HashMap<String, serde_json::Value>,
}

impl Session {
    /// Fresh session started now.
    #[must_use]
    pub fn start(host: Option<String>, timeout: Option<TimeDelta>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new_v4(),
            host,
            started_at: now,
            last_access_at: now,
            timeout,
            attributes: HashMap::new(),
        }
    }

    /// Whether the idle timeout has elapsed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.timeout
            .is_some_and(|timeout| now - self.last_access_at >= timeout)
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }
}

/// Input to [`SessionManager::start`](crate::SessionManager::start).
///
/// A transport-aware identity injects its exchange so the session manager can
/// see request metadata without the caller passing it along.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub host: Option<String>,
    pub transport: Option<Arc<dyn TransportExchange>>,
}

impl SessionContext {
    #[must_use]
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            transport: None,
        }
    }

    /// Host recorded on the context, else the transport's remote host.
    #[must_use]
    pub fn effective_host(&self) -> Option<String> {
        self.host
            .clone()
            .or_else(|| self.transport.as_ref().and_then(|t| t.remote_host()))
    }
}
