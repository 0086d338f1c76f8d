//! Username/password authentication against configured accounts.

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use warden_security::{
    AuthenticationError, AuthenticationInfo, Authenticator, Credential, PrincipalCollection,
};

use crate::config::{AccountConfig, StaticRealmConfig};

struct Account {
    password: SecretString,
    principals: PrincipalCollection,
    locked: bool,
    disabled: bool,
    credentials_expired: bool,
}

/// Authenticator backed by the realm's static account list.
pub struct StaticAuthenticator {
    accounts: HashMap<String, Account>,
}

impl StaticAuthenticator {
    #[must_use]
    pub fn from_config(cfg: &StaticRealmConfig) -> Self {
        let accounts = cfg
            .accounts
            .iter()
            .map(|account| (account.username.clone(), Account::from_config(&cfg.name, account)))
            .collect();
        Self { accounts }
    }

    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

impl Account {
    fn from_config(realm: &str, cfg: &AccountConfig) -> Self {
        let mut principals = PrincipalCollection::single(realm, cfg.username.as_str());
        for extra in &cfg.principals {
            principals = principals.with(extra.realm.as_str(), extra.value.as_str());
        }
        Self {
            password: cfg.password.clone(),
            principals,
            locked: cfg.locked,
            disabled: cfg.disabled,
            credentials_expired: cfg.credentials_expired,
        }
    }
}

impl Authenticator for StaticAuthenticator {
    fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<AuthenticationInfo, AuthenticationError> {
        let username = credential.principal();
        let account = self
            .accounts
            .get(username)
            .ok_or_else(|| AuthenticationError::UnknownAccount(username.to_owned()))?;

        if account.locked {
            return Err(AuthenticationError::LockedAccount(username.to_owned()));
        }
        if account.disabled {
            return Err(AuthenticationError::DisabledAccount(username.to_owned()));
        }
        if account.credentials_expired {
            return Err(AuthenticationError::ExpiredCredentials(username.to_owned()));
        }
        if account.password.expose_secret() != credential.secret().expose_secret() {
            return Err(AuthenticationError::IncorrectCredentials(username.to_owned()));
        }

        debug!(principal = %username, "Static account authenticated");
        Ok(AuthenticationInfo {
            principals: account.principals.clone(),
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn authenticator() -> StaticAuthenticator {
        let cfg = StaticRealmConfig::from_yaml(
            r#"
name: corp
accounts:
  - username: alice
    password: wonderland
    principals:
      - realm: email
        value: alice@example.com
  - username: locked
    password: pw
    locked: true
  - username: disabled
    password: pw
    disabled: true
  - username: stale
    password: pw
    credentials_expired: true
"#,
        )
        .unwrap();
        StaticAuthenticator::from_config(&cfg)
    }

    #[test]
    fn valid_credentials_return_all_principals() {
        let info = authenticator()
            .authenticate(&Credential::new("alice", "wonderland".to_owned()))
            .unwrap();

        let primary = info.principals.primary().unwrap();
        assert_eq!((primary.realm(), primary.value()), ("corp", "alice"));
        assert_eq!(info.principals.in_realm("email").count(), 1);
    }

    #[test]
    fn failures_map_to_specific_errors() {
        let auth = authenticator();
        let attempt = |user: &str, pw: &str| auth.authenticate(&Credential::new(user, pw.to_owned()));

        assert_eq!(
            attempt("nobody", "pw").unwrap_err(),
            AuthenticationError::UnknownAccount("nobody".to_owned())
        );
        assert_eq!(
            attempt("alice", "rabbit").unwrap_err(),
            AuthenticationError::IncorrectCredentials("alice".to_owned())
        );
        assert!(matches!(attempt("locked", "pw"), Err(AuthenticationError::LockedAccount(_))));
        assert!(matches!(attempt("disabled", "pw"), Err(AuthenticationError::DisabledAccount(_))));
        assert!(matches!(attempt("stale", "pw"), Err(AuthenticationError::ExpiredCredentials(_))));
    }

    #[test]
    fn account_count_matches_config() {
        assert_eq!(authenticator().account_count(), 4);
    }
}
