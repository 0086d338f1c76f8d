//! Wildcard permission strings such as `docs:read,write:*`.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

const WILDCARD: &str = "*";
const PART_DIVIDER: char = ':';
const SUBPART_DIVIDER: char = ',';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WildcardParseError {
    #[error("wildcard permission must not be empty")]
    Empty,

    #[error("wildcard permission [{0}] contains an empty part")]
    EmptyPart(String),
}

/// Parsed permission: ordered parts, each a set of case-folded sub-parts.
///
/// A granted permission implies a requested one when every requested part is
/// covered by the granted part at the same position (`*` covers anything).
/// Granted permissions shorter than the request imply all trailing parts;
/// longer ones only when the extra parts are `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPermission {
    parts: Vec<BTreeSet<String>>,
}

impl WildcardPermission {
    /// # Errors
    ///
    /// [`WildcardParseError`] for an empty string or an empty part/sub-part.
    pub fn parse(raw: &str) -> Result<Self, WildcardParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(WildcardParseError::Empty);
        }

        let mut parts = Vec::new();
        for part in raw.split(PART_DIVIDER) {
            let subparts: BTreeSet<String> = part
                .split(SUBPART_DIVIDER)
                .map(|s| s.trim().to_lowercase())
                .collect();
            if subparts.iter().any(String::is_empty) {
                return Err(WildcardParseError::EmptyPart(raw.to_owned()));
            }
            parts.push(subparts);
        }
        Ok(Self { parts })
    }

    #[must_use]
    pub fn implies(&self, requested: &Self) -> bool {
        for (i, wanted) in requested.parts.iter().enumerate() {
            let Some(granted) = self.parts.get(i) else {
                return true;
            };
            if !granted.contains(WILDCARD) && !granted.is_superset(wanted) {
                return false;
            }
        }

        self.parts
            .iter()
            .skip(requested.parts.len())
            .all(|granted| granted.contains(WILDCARD))
    }
}

impl FromStr for WildcardPermission {
    type Err = WildcardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for WildcardPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, "{PART_DIVIDER}")?;
            }
            let joined: Vec<&str> = part.iter().map(String::as_str).collect();
            f.write_str(&joined.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn p(raw: &str) -> WildcardPermission {
        WildcardPermission::parse(raw).unwrap()
    }

    #[test]
    fn exact_match_implies() {
        assert!(p("docs:read").implies(&p("docs:read")));
        assert!(!p("docs:read").implies(&p("docs:write")));
        assert!(!p("docs:read").implies(&p("printer:read")));
    }

    #[test]
    fn star_matches_any_subpart() {
        assert!(p("docs:*").implies(&p("docs:delete")));
        assert!(p("*:read").implies(&p("printer:read")));
        assert!(!p("*:read").implies(&p("printer:write")));
    }

    #[test]
    fn shorter_grant_implies_everything_below() {
        assert!(p("docs").implies(&p("docs:read:42")));
        assert!(!p("docs").implies(&p("mail:read")));
    }

    #[test]
    fn longer_grant_needs_trailing_wildcards() {
        assert!(!p("docs:read:42").implies(&p("docs:read")));
        assert!(p("docs:read:*").implies(&p("docs:read")));
    }

    #[test]
    fn subpart_lists_must_cover_request() {
        assert!(p("docs:read,write").implies(&p("docs:write")));
        assert!(p("docs:read,write").implies(&p("docs:read,write")));
        assert!(!p("docs:read").implies(&p("docs:read,write")));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(p("Docs:READ").implies(&p("docs:read")));
    }

    #[test]
    fn invalid_strings_are_rejected() {
        assert_eq!(WildcardPermission::parse("  "), Err(WildcardParseError::Empty));
        assert!(matches!(
            WildcardPermission::parse("docs::read"),
            Err(WildcardParseError::EmptyPart(_))
        ));
        assert!("docs:read,".parse::<WildcardPermission>().is_err());
    }

    #[test]
    fn display_is_normalized() {
        assert_eq!(p("Docs:write,read").to_string(), "docs:read,write");
    }
}
