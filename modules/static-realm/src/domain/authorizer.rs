//! Role and wildcard-permission checks against the realm configuration.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};
use warden_security::{Authorizer, Permission, PrincipalCollection};

use super::wildcard::WildcardPermission;
use crate::config::StaticRealmConfig;

/// Authorizer resolving roles by username and permissions by role.
///
/// Only principals issued by this realm are considered, so principals from
/// another realm with a colliding username never gain its grants.
pub struct StaticAuthorizer {
    realm: String,
    roles_by_user: HashMap<String, HashSet<String>>,
    grants_by_role: HashMap<String, Vec<WildcardPermission>>,
}

impl StaticAuthorizer {
    /// Build from configuration. Unparseable permission strings are skipped
    /// with a warning.
    #[must_use]
    pub fn from_config(cfg: &StaticRealmConfig) -> Self {
        let roles_by_user = cfg
            .accounts
            .iter()
            .map(|a| (a.username.clone(), a.roles.iter().cloned().collect()))
            .collect();

        let grants_by_role = cfg
            .roles
            .iter()
            .map(|(role, raw)| {
                let grants = raw
                    .iter()
                    .filter_map(|p| match WildcardPermission::parse(p) {
                        Ok(parsed) => Some(parsed),
                        Err(e) => {
                            warn!(role = %role, error = %e, "Skipping invalid permission");
                            None
                        }
                    })
                    .collect();
                (role.clone(), grants)
            })
            .collect();

        Self {
            realm: cfg.name.clone(),
            roles_by_user,
            grants_by_role,
        }
    }

    fn roles_of<'a>(&'a self, principals: &'a PrincipalCollection) -> impl Iterator<Item = &'a String> + 'a {
        principals
            .in_realm(&self.realm)
            .filter_map(|p| self.roles_by_user.get(p.value()))
            .flatten()
    }
}

impl Authorizer for StaticAuthorizer {
    fn is_permitted(&self, principals: &PrincipalCollection, permission: &Permission) -> bool {
        let requested = match WildcardPermission::parse(permission.as_str()) {
            Ok(requested) => requested,
            Err(e) => {
                debug!(permission = %permission, error = %e, "Denying malformed permission");
                return false;
            }
        };

        self.roles_of(principals)
            .filter_map(|role| self.grants_by_role.get(role))
            .flatten()
            .any(|grant| grant.implies(&requested))
    }

    fn has_role(&self, principals: &PrincipalCollection, role: &str) -> bool {
        self.roles_of(principals).any(|r| r == role)
    }
}
