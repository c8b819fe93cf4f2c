//! Route authorization rules
//!
//! An immutable table of path patterns and the roles allowed to reach them.
//! Patterns are compiled once when the index is built.
//!
//! Pattern syntax:
//! - `/**` matches `/` followed by anything, including further segments
//! - `/*` matches `/` followed by a single segment
//! - `{name}` matches one non-empty segment
//!
//! Everything else is matched literally and the whole path must match.

use regex::RegexSet;
use serde::Deserialize;
use std::collections::BTreeSet;
use thiserror::Error;

/// A single `(path pattern, required roles)` configuration entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteRule {
    pub path: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl RouteRule {
    pub fn new<I, S>(path: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

/// A rule pattern that cannot be compiled
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("unclosed placeholder in route pattern '{0}'")]
    UnclosedPlaceholder(String),

    #[error("invalid route pattern '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Translate a route pattern into an anchored regular expression
fn pattern_to_regex(pattern: &str) -> Result<String, PatternError> {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let mut rest = pattern;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("/**") {
            out.push_str("/.*");
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("/*") {
            out.push_str("/[^/]*");
            rest = tail;
        } else if rest.starts_with('{') {
            let end = rest
                .find('}')
                .ok_or_else(|| PatternError::UnclosedPlaceholder(pattern.to_string()))?;
            out.push_str("[^/]+");
            rest = &rest[end + 1..];
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
            }
            rest = chars.as_str();
        }
    }

    out.push('$');
    Ok(out)
}

/// Read-only lookup from request path to required roles.
///
/// Built once at startup. Lookups take `&self` only, so the index can be
/// shared across request tasks behind an `Arc` without locking.
#[derive(Debug, Clone)]
pub struct RouteAuthorizationIndex {
    rules: Vec<RouteRule>,
    matchers: RegexSet,
}

impl RouteAuthorizationIndex {
    /// Compile every rule's pattern
    pub fn new(rules: Vec<RouteRule>) -> Result<Self, PatternError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in &rules {
            let expr = pattern_to_regex(&rule.path)?;
            // Compile individually first so the error names the offending rule
            regex::Regex::new(&expr).map_err(|source| PatternError::Regex {
                pattern: rule.path.clone(),
                source,
            })?;
            compiled.push(expr);
        }

        let matchers = RegexSet::new(&compiled).map_err(|source| PatternError::Regex {
            pattern: compiled.join(" | "),
            source,
        })?;

        Ok(Self { rules, matchers })
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Union of roles over every rule whose pattern matches `path`.
    ///
    /// An unmatched path yields the empty set, which no role satisfies.
    pub fn required_roles(&self, path: &str) -> BTreeSet<String> {
        self.matchers
            .matches(path)
            .into_iter()
            .flat_map(|i| self.rules[i].roles.iter().cloned())
            .collect()
    }
}

/// True iff `role` is a member of `required`
pub fn authorize(role: &str, required: &BTreeSet<String>) -> bool {
    required.contains(role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn index(rules: Vec<RouteRule>) -> RouteAuthorizationIndex {
        RouteAuthorizationIndex::new(rules).unwrap()
    }

    fn roles(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn matches(pattern: &str, path: &str) -> bool {
        !index(vec![RouteRule::new(pattern, ["R"])])
            .required_roles(path)
            .is_empty()
    }

    #[test]
    fn test_recursive_wildcard() {
        assert!(matches("/manage/**", "/manage/seats/123"));
        assert!(matches("/manage/**", "/manage/x"));
        assert!(!matches("/manage/**", "/managers/1"));
    }

    #[test]
    fn test_single_segment_wildcard() {
        assert!(matches("/user/*", "/user/42"));
        assert!(!matches("/user/*", "/user/42/details"));
    }

    #[test]
    fn test_placeholder() {
        assert!(matches("/resource/{id}", "/resource/99"));
        assert!(!matches("/resource/{id}", "/resource/99/extra"));
        assert!(!matches("/resource/{id}", "/resource/"));
        assert!(matches("/orgs/{org}/users/{user}", "/orgs/acme/users/7"));
    }

    #[test]
    fn test_literal_match_is_anchored() {
        assert!(matches("/users/find", "/users/find"));
        assert!(!matches("/users/find", "/users/find/all"));
        assert!(!matches("/users/find", "/api/users/find"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(matches("/v1.0/items", "/v1.0/items"));
        assert!(!matches("/v1.0/items", "/v1x0/items"));
    }

    #[test]
    fn test_union_of_matching_rules() {
        let idx = index(vec![
            RouteRule::new("/manage/**", ["A"]),
            RouteRule::new("/manage/seats/*", ["B"]),
            RouteRule::new("/user/*", ["C"]),
        ]);
        assert_eq!(idx.required_roles("/manage/seats/1"), roles(&["A", "B"]));
    }

    #[test]
    fn test_rule_order_does_not_matter() {
        let forward = index(vec![
            RouteRule::new("/a/**", ["X"]),
            RouteRule::new("/a/{id}", ["Y"]),
        ]);
        let reverse = index(vec![
            RouteRule::new("/a/{id}", ["Y"]),
            RouteRule::new("/a/**", ["X"]),
        ]);
        assert_eq!(forward.required_roles("/a/1"), reverse.required_roles("/a/1"));
    }

    #[test]
    fn test_unmatched_path_denies_everyone() {
        let idx = index(vec![RouteRule::new("/manage/**", ["ROLE_ADMIN"])]);
        let required = idx.required_roles("/elsewhere");
        assert!(required.is_empty());
        assert!(!authorize("ROLE_ADMIN", &required));
        assert!(!authorize("", &required));
    }

    #[test]
    fn test_lookup_is_repeatable() {
        let idx = index(vec![
            RouteRule::new("/user/**", ["ROLE_USER", "ROLE_ADMIN"]),
            RouteRule::new("/user/{id}", ["ROLE_SUPPORT"]),
        ]);
        let first = idx.required_roles("/user/5");
        let second = idx.required_roles("/user/5");
        assert_eq!(first, second);
        assert_eq!(first, roles(&["ROLE_ADMIN", "ROLE_SUPPORT", "ROLE_USER"]));
    }

    #[test]
    fn test_authorize_membership() {
        let required = roles(&["ROLE_ADMIN", "ROLE_MANAGER"]);
        assert!(authorize("ROLE_ADMIN", &required));
        assert!(!authorize("ROLE_USER", &required));
        assert!(!authorize("role_admin", &required));
    }

    #[test]
    fn test_unclosed_placeholder_fails_to_build() {
        let err = RouteAuthorizationIndex::new(vec![RouteRule::new("/a/{id", ["X"])]).unwrap_err();
        assert!(matches!(err, PatternError::UnclosedPlaceholder(p) if p == "/a/{id"));
    }

    #[test]
    fn test_empty_index() {
        let idx = index(Vec::new());
        assert!(idx.required_roles("/anything").is_empty());
        assert!(idx.rules().is_empty());
    }
}
