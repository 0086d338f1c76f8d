//! Configuration for the static realm.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use secrecy::SecretString;
use serde::Deserialize;

/// Prefix of environment variables overriding file values.
///
/// Nested keys are separated by `__`, e.g. `WARDEN_SESSION__TIMEOUT_SECS=900`.
pub const ENV_PREFIX: &str = "WARDEN_";

/// Realm configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticRealmConfig {
    /// Realm name recorded on every principal the realm issues.
    pub name: String,

    /// Known accounts.
    pub accounts: Vec<AccountConfig>,

    /// Role name to granted permission strings.
    pub roles: HashMap<String, Vec<String>>,

    pub session: SessionConfig,

    pub remember_me: RememberMeConfig,
}

impl Default for StaticRealmConfig {
    fn default() -> Self {
        Self {
            name: "static".to_owned(),
            accounts: Vec::new(),
            roles: HashMap::new(),
            session: SessionConfig::default(),
            remember_me: RememberMeConfig::default(),
        }
    }
}

impl StaticRealmConfig {
    /// Read `path` as YAML, then apply `WARDEN_*` environment overrides.
    ///
    /// # Errors
    ///
    /// When the file does not exist or the merged values do not match the schema.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        anyhow::ensure!(
            path.is_file(),
            "realm configuration {} not found",
            path.display()
        );
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("invalid realm configuration in {}", path.display()))
    }

    /// Parse a YAML document without environment overrides.
    ///
    /// # Errors
    ///
    /// When the document does not match the schema.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Figment::new()
            .merge(Yaml::string(yaml))
            .extract()
            .context("invalid realm configuration")
    }
}

/// One account of the realm.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    pub username: String,

    pub password: SecretString,

    #[serde(default)]
    pub roles: Vec<String>,

    /// Extra principals (`realm` → value) attached after the username.
    #[serde(default)]
    pub principals: Vec<PrincipalConfig>,

    #[serde(default)]
    pub locked: bool,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default)]
    pub credentials_expired: bool,
}

/// Additional principal carried by an account.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrincipalConfig {
    pub realm: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Idle timeout in seconds. Absent means sessions never expire.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RememberMeConfig {
    pub enabled: bool,
}
