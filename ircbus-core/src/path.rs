//! Validated hierarchical bus addresses
//!
//! Every session is published under a sub-path of the manager's base
//! path, and session names become path components. `BusPath` rejects
//! anything outside a deliberately small character set so a malformed or
//! adversarial session name can never reach the bus layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PathError;

/// Separator between path components.
pub const SEPARATOR: char = '/';

/// Returns true if `component` is a valid path component.
///
/// Components are non-empty and restricted to `[A-Za-z0-9_]`.
pub fn is_valid_component(component: &str) -> bool {
    !component.is_empty()
        && component
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// An absolute, validated bus object path.
///
/// Paths start with `/`, contain no trailing separator (except the root
/// path itself) and every component satisfies [`is_valid_component`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BusPath(String);

impl BusPath {
    /// The root path, `/`.
    pub fn root() -> Self {
        Self(String::from(SEPARATOR))
    }

    /// Compose a path from components, failing fast on the first invalid
    /// component. No partial path is ever constructed.
    pub fn new<S: AsRef<str>>(components: &[S]) -> Result<Self, PathError> {
        let mut path = String::new();
        for component in components {
            let component = component.as_ref();
            if !is_valid_component(component) {
                return Err(PathError::InvalidComponent(component.to_string()));
            }
            path.push(SEPARATOR);
            path.push_str(component);
        }

        if path.is_empty() {
            path.push(SEPARATOR);
        }

        Ok(Self(path))
    }

    /// Parse an absolute path string.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if !s.starts_with(SEPARATOR) {
            return Err(PathError::InvalidPath(s.to_string()));
        }
        if s.len() == 1 {
            return Ok(Self::root());
        }
        if s.ends_with(SEPARATOR) {
            return Err(PathError::InvalidPath(s.to_string()));
        }

        // A string starting with the separator always splits into at
        // least one component, the first of which is empty. Every
        // subsequent component must validate.
        for component in s.split(SEPARATOR).skip(1) {
            if !is_valid_component(component) {
                return Err(PathError::InvalidPath(s.to_string()));
            }
        }

        Ok(Self(s.to_string()))
    }

    /// Append a single validated component.
    pub fn join(&self, component: &str) -> Result<Self, PathError> {
        if !is_valid_component(component) {
            return Err(PathError::InvalidComponent(component.to_string()));
        }

        let mut path = if self.is_root() {
            String::new()
        } else {
            self.0.clone()
        };
        path.push(SEPARATOR);
        path.push_str(component);
        Ok(Self(path))
    }

    /// True for the root path `/`.
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// The path components, in order. Empty for the root path.
    pub fn components(&self) -> Vec<&str> {
        if self.is_root() {
            Vec::new()
        } else {
            self.0.split(SEPARATOR).skip(1).collect()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BusPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BusPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for BusPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Component Validation Tests ====================

    #[test]
    fn valid_components_accepted() {
        for component in ["freenode", "OFTC", "net_2", "a", "0", "___"] {
            assert!(is_valid_component(component), "{component:?}");
        }
    }

    #[test]
    fn invalid_components_rejected() {
        for component in ["", "bad name", "a/b", "a-b", "caf\u{e9}", "a\nb", "\t", "a\0"] {
            assert!(!is_valid_component(component), "{component:?}");
        }
    }

    // ==================== Compose Tests ====================

    #[test]
    fn new_composes_components() {
        let path = BusPath::new(&["net", "ircbus"]).unwrap();
        assert_eq!(path.as_str(), "/net/ircbus");
    }

    #[test]
    fn new_with_no_components_is_root() {
        let path = BusPath::new::<&str>(&[]).unwrap();
        assert!(path.is_root());
        assert_eq!(path.as_str(), "/");
    }

    #[test]
    fn new_rejects_invalid_component() {
        let result = BusPath::new(&["net", "bad name"]);
        assert!(matches!(result, Err(PathError::InvalidComponent(_))));
    }

    #[test]
    fn join_appends_component() {
        let base = BusPath::parse("/net/ircbus").unwrap();
        let session = base.join("freenode").unwrap();
        assert_eq!(session.as_str(), "/net/ircbus/freenode");
    }

    #[test]
    fn join_on_root_has_single_separator() {
        let path = BusPath::root().join("a").unwrap();
        assert_eq!(path.as_str(), "/a");
    }

    #[test]
    fn join_rejects_invalid_component() {
        let base = BusPath::parse("/net").unwrap();
        assert!(base.join("with space").is_err());
        assert!(base.join("").is_err());
        assert!(base.join("a/b").is_err());
    }

    // ==================== Parse Tests ====================

    #[test]
    fn parse_accepts_root() {
        let path = BusPath::parse("/").unwrap();
        assert!(path.is_root());
        assert!(path.components().is_empty());
    }

    #[test]
    fn parse_requires_leading_separator() {
        assert!(BusPath::parse("net/ircbus").is_err());
        assert!(BusPath::parse("").is_err());
    }

    #[test]
    fn parse_rejects_trailing_separator() {
        assert!(BusPath::parse("/net/").is_err());
    }

    #[test]
    fn parse_rejects_empty_component() {
        assert!(BusPath::parse("/net//ircbus").is_err());
    }

    #[test]
    fn parse_rejects_invalid_component() {
        assert!(BusPath::parse("/net/bad name").is_err());
    }

    #[test]
    fn parse_compose_round_trip() {
        let components = ["net", "ircbus", "freenode"];
        let composed = BusPath::new(&components).unwrap();
        let parsed = BusPath::parse(composed.as_str()).unwrap();
        assert_eq!(parsed.components(), components);
        assert_eq!(parsed, composed);
    }

    #[test]
    fn from_str_matches_parse() {
        let path: BusPath = "/net/ircbus".parse().unwrap();
        assert_eq!(path, BusPath::parse("/net/ircbus").unwrap());
    }

    #[test]
    fn serde_round_trip() {
        let path = BusPath::parse("/net/ircbus").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/net/ircbus\"");
        let parsed: BusPath = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, path);
    }

    #[test]
    fn deserialize_rejects_malformed_path() {
        let result: Result<BusPath, _> = serde_json::from_str("\"net\"");
        assert!(result.is_err());
    }
}
