use std::fmt;

use serde::{Deserialize, Serialize};

/// An identifying fact about an identity, tagged with the realm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    realm: String,
    value: String,
}

impl Principal {
    #[must_use]
    pub fn new(realm: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Ordered collection of principals. The first entry is the primary principal.
///
/// Stored in sessions as a JSON attribute, so it round-trips through serde.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalCollection {
    items: Vec<Principal>,
}

impl PrincipalCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection holding a single principal from `realm`.
    #[must_use]
    pub fn single(realm: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            items: vec![Principal::new(realm, value)],
        }
    }

    /// Appends a principal unless an equal one is already present.
    pub fn add(&mut self, principal: Principal) {
        if !self.items.contains(&principal) {
            self.items.push(principal);
        }
    }

    #[must_use]
    pub fn with(mut self, realm: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(Principal::new(realm, value));
        self
    }

    #[must_use]
    pub fn primary(&self) -> Option<&Principal> {
        self.items.first()
    }

    /// Principals contributed by one realm, in insertion order.
    pub fn in_realm<'a>(&'a self, realm: &'a str) -> impl Iterator<Item = &'a Principal> + 'a {
        self.items.iter().filter(move |p| p.realm == realm)
    }

    /// Distinct realm names, in first-seen order.
    #[must_use]
    pub fn realm_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for p in &self.items {
            if !names.contains(&p.realm.as_str()) {
                names.push(&p.realm);
            }
        }
        names
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Principal> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Principal> for PrincipalCollection {
    fn from_iter<I: IntoIterator<Item = Principal>>(iter: I) -> Self {
        let mut collection = Self::new();
        for p in iter {
            collection.add(p);
        }
        collection
    }
}

impl<'a> IntoIterator for &'a PrincipalCollection {
    type Item = &'a Principal;
    type IntoIter = std::slice::Iter<'a, Principal>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
