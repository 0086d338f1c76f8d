#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Static realm for `warden-security`
//!
//! Accounts, roles and permissions come from configuration; sessions and
//! remember-me state live in memory.
//!
//! Development and test use only. Nothing is persisted, sessions are lost on
//! restart and passwords sit in configuration as plain text. Production
//! deployments plug their own `Authenticator`, `Authorizer` and
//! `SessionManager` into `DefaultAuthority`.
//!
//! ## Configuration
//!
//! ```yaml
//! name: corp
//! accounts:
//!   - username: alice
//!     password: wonderland
//!     roles: [reader]
//! roles:
//!   reader: ["docs:read"]
//!   admin: ["*"]
//! session:
//!   timeout_secs: 1800
//! remember_me:
//!   enabled: false
//! ```
//!
//! Every value can be overridden with `WARDEN_`-prefixed environment
//! variables, nested keys separated by `__`.

pub mod config;
pub mod domain;

use std::sync::Arc;

use tracing::info;
use warden_security::DefaultAuthority;

pub use config::StaticRealmConfig;
pub use domain::{
    MemoryRememberMe, MemorySessionManager, StaticAuthenticator, StaticAuthorizer,
    WildcardPermission,
};

/// All collaborators of one configured realm.
pub struct StaticRealm {
    pub authenticator: Arc<StaticAuthenticator>,
    pub authorizer: Arc<StaticAuthorizer>,
    pub sessions: Arc<MemorySessionManager>,
    pub remember_me: Option<Arc<MemoryRememberMe>>,
}

impl StaticRealm {
    #[must_use]
    pub fn from_config(cfg: &StaticRealmConfig) -> Self {
        Self {
            authenticator: Arc::new(StaticAuthenticator::from_config(cfg)),
            authorizer: Arc::new(StaticAuthorizer::from_config(cfg)),
            sessions: Arc::new(MemorySessionManager::with_timeout_secs(
                cfg.session.timeout_secs,
            )),
            remember_me: cfg
                .remember_me
                .enabled
                .then(|| Arc::new(MemoryRememberMe::new())),
        }
    }

    /// Assemble a [`DefaultAuthority`] over these collaborators.
    #[must_use]
    pub fn into_authority(self) -> DefaultAuthority {
        let authority = DefaultAuthority::new(self.authenticator, self.authorizer, self.sessions);
        match self.remember_me {
            Some(remember_me) => authority.with_remember_me(remember_me),
            None => authority,
        }
    }
}

/// Build a ready-to-use authority from configuration.
#[must_use]
pub fn build_authority(cfg: &StaticRealmConfig) -> Arc<DefaultAuthority> {
    let realm = StaticRealm::from_config(cfg);
    info!(
        realm = %cfg.name,
        accounts = realm.authenticator.account_count(),
        roles = cfg.roles.len(),
        session_timeout_secs = ?cfg.session.timeout_secs,
        remember_me = cfg.remember_me.enabled,
        "Static realm initialized"
    );
    Arc::new(realm.into_authority())
}
