//! Remember-me store keyed by client host.

use dashmap::DashMap;
use tracing::debug;
use warden_security::{
    AuthenticationError, AuthenticationInfo, Credential, Identity, IdentityBuildContext,
    PrincipalCollection, RememberMeManager,
};

/// Remembers the principals of logins that asked for it, per originating host.
///
/// Interactions without a resolvable host are never remembered.
#[derive(Debug, Default)]
pub struct MemoryRememberMe {
    by_host: DashMap<String, PrincipalCollection>,
}

impl MemoryRememberMe {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_remembered(&self, host: &str) -> bool {
        self.by_host.contains_key(host)
    }

    fn forget(&self, host: Option<String>) {
        if let Some(host) = host
            && self.by_host.remove(&host).is_some()
        {
            debug!(host = %host, "Forgot remembered principals");
        }
    }
}

fn login_host(identity: &Identity, credential: &Credential) -> Option<String> {
    credential.host().map(str::to_owned).or_else(|| identity.host())
}

impl RememberMeManager for MemoryRememberMe {
    fn remembered_principals(&self, context: &IdentityBuildContext) -> Option<PrincipalCollection> {
        let host = context.resolve_host()?;
        self.by_host.get(&host).map(|entry| entry.value().clone())
    }

    fn on_successful_login(&self, identity: &Identity, credential: &Credential, info: &AuthenticationInfo) {
        let host = login_host(identity, credential);
        if !credential.remember_me() {
            self.forget(host);
            return;
        }
        if let Some(host) = host {
            debug!(host = %host, principal = %credential.principal(), "Remembering principals");
            self.by_host.insert(host, info.principals.clone());
        }
    }

    fn on_failed_login(&self, identity: &Identity, credential: &Credential, _error: &AuthenticationError) {
        self.forget(login_host(identity, credential));
    }

    fn on_logout(&self, identity: &Identity) {
        self.forget(identity.host());
    }
}
