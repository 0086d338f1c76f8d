#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use secrecy::ExposeSecret;
use static_realm::MemorySessionManager;
use warden_security::{
    AuthenticationError, AuthenticationInfo, Authenticator, Authority, Authorizer, Credential,
    DefaultAuthority, Permission, PrincipalCollection,
};

/// Serializes tests that touch the process-global fallback authority.
static GLOBAL_FALLBACK: Mutex<()> = Mutex::new(());

pub fn lock_global_fallback() -> MutexGuard<'static, ()> {
    GLOBAL_FALLBACK.lock()
}

/// username -> (password, roles)
pub struct Directory {
    users: HashMap<&'static str, (&'static str, Vec<&'static str>)>,
}

impl Directory {
    pub fn new() -> Self {
        let mut users = HashMap::new();
        users.insert("alice", ("wonderland", vec!["reader"]));
        users.insert("bob", ("builder", vec!["reader", "writer"]));
        Self { users }
    }
}

impl Authenticator for Directory {
    fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<AuthenticationInfo, AuthenticationError> {
        let (password, _) = self
            .users
            .get(credential.principal())
            .ok_or_else(|| AuthenticationError::UnknownAccount(credential.principal().to_owned()))?;
        if credential.secret().expose_secret() != *password {
            return Err(AuthenticationError::IncorrectCredentials(
                credential.principal().to_owned(),
            ));
        }
        Ok(AuthenticationInfo {
            principals: PrincipalCollection::single("directory", credential.principal()),
        })
    }
}

impl Authorizer for Directory {
    fn is_permitted(&self, principals: &PrincipalCollection, permission: &Permission) -> bool {
        let Some((_, action)) = permission.as_str().split_once(':') else {
            return false;
        };
        match action {
            "read" => self.has_role(principals, "reader"),
            "write" => self.has_role(principals, "writer"),
            _ => false,
        }
    }

    fn has_role(&self, principals: &PrincipalCollection, role: &str) -> bool {
        principals.iter().any(|p| {
            self.users
                .get(p.value())
                .is_some_and(|(_, roles)| roles.contains(&role))
        })
    }
}

pub fn authority() -> Arc<dyn Authority> {
    let directory = Arc::new(Directory::new());
    Arc::new(DefaultAuthority::new(
        directory.clone(),
        directory,
        Arc::new(MemorySessionManager::default()),
    ))
}

pub fn credential(user: &str, password: &str) -> Credential {
    Credential::new(user, password.to_owned())
}
