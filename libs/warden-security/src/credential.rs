//! Credentials submitted at login and the information an authenticator returns.

use secrecy::SecretString;

use crate::principal::PrincipalCollection;

/// A login attempt: who claims to be acting and the secret proving it.
///
/// The secret is wrapped in `SecretString` so `Debug` output redacts it.
#[derive(Debug, Clone)]
pub struct Credential {
    principal: String,
    secret: SecretString,
    host: Option<String>,
    remember_me: bool,
}

impl Credential {
    /// Username/password style credential with no host and remember-me off.
    #[must_use]
    pub fn new(principal: impl Into<String>, secret: impl Into<SecretString>) -> Self {
        Self {
            principal: principal.into(),
            secret: secret.into(),
            host: None,
            remember_me: false,
        }
    }

    /// Host the attempt originates from.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }

    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    #[must_use]
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    #[must_use]
    pub fn remember_me(&self) -> bool {
        self.remember_me
    }
}

/// Outcome of a successful authentication.
#[derive(Debug, Clone)]
pub struct AuthenticationInfo {
    /// Principals derived from the credential. Never empty for a successful attempt.
    pub principals: PrincipalCollection,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn debug_redacts_secret() {
        let credential = Credential::new("alice", "hunter2".to_owned());
        let debug = format!("{credential:?}");
        assert!(!debug.contains("hunter2"));
        assert_eq!(credential.secret().expose_secret(), "hunter2");
    }

    #[test]
    fn builder_sets_host_and_remember_me() {
        let credential = Credential::new("alice", "pw".to_owned())
            .with_host("10.0.0.7")
            .with_remember_me(true);

        assert_eq!(credential.principal(), "alice");
        assert_eq!(credential.host(), Some("10.0.0.7"));
        assert!(credential.remember_me());
    }
}
