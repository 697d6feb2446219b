//! Request-time route decisions.
//!
//! Order of checks:
//! 1. public prefix match → allow (before looking at the token at all)
//! 2. no valid token → redirect to login
//! 3. role requirement not met → redirect home
//! 4. otherwise allow
//!
//! "Valid" means present and not expired. Signature checks belong to the
//! backend that issued the token.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::{Principal, Role, Session};

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDecision {
    Allow,
    RedirectLogin,
    RedirectHome,
}

/// A set of path prefixes matched on segment boundaries.
///
/// `"/login"` matches `/login`, `/login/` and `/login/reset`, but not `/loginx`.
/// The root prefix `/` matches only `/` itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathPrefixes(Vec<String>);

impl PathPrefixes {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            prefixes
                .into_iter()
                .filter_map(|p| normalize_prefix(p.as_ref()))
                .collect(),
        )
    }

    pub fn matches(&self, path: &str) -> bool {
        self.0.iter().any(|prefix| prefix_matches(prefix, path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn normalize_prefix(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let mut prefix = if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{raw}")
    };
    while prefix.len() > 1 && prefix.ends_with('/') {
        prefix.pop();
    }
    Some(prefix)
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return path == "/";
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// What the guard knows about the caller's token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState<'a> {
    Absent,
    Expired,
    Valid(&'a Principal),
}

impl<'a> TokenState<'a> {
    pub fn of(session: Option<&'a Session>, now: DateTime<Utc>) -> Self {
        match session {
            None => Self::Absent,
            Some(s) if s.access_token().is_empty() => Self::Absent,
            Some(s) if s.expires_at() <= now => Self::Expired,
            Some(s) => Self::Valid(s.principal()),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// A role requirement attached to a path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRule {
    prefix: String,
    role: Role,
}

impl RoleRule {
    /// Returns `None` when `prefix` is blank.
    pub fn new(prefix: &str, role: Role) -> Option<Self> {
        normalize_prefix(prefix).map(|prefix| Self { prefix, role })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn role(&self) -> &Role {
        &self.role
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    public: PathPrefixes,
    role_rules: Vec<RoleRule>,
}

impl RouteGuard {
    pub fn new(public: PathPrefixes) -> Self {
        Self {
            public,
            role_rules: Vec::new(),
        }
    }

    pub fn with_role_rules(mut self, rules: impl IntoIterator<Item = RoleRule>) -> Self {
        self.role_rules.extend(rules);
        self
    }

    pub fn public_paths(&self) -> &PathPrefixes {
        &self.public
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.matches(path)
    }

    /// Role required by the first rule whose prefix covers `path`.
    pub fn required_role(&self, path: &str) -> Option<&Role> {
        self.role_rules
            .iter()
            .find(|rule| prefix_matches(&rule.prefix, path))
            .map(|rule| &rule.role)
    }

    /// Decide using the configured role rules.
    pub fn decide(&self, path: &str, token: &TokenState<'_>) -> RouteDecision {
        let decision = self.evaluate(path, token, self.required_role(path));
        debug!(path, ?decision, "route guard");
        decision
    }

    /// Role-scoped variant with an explicit requirement.
    pub fn decide_for_role(
        &self,
        path: &str,
        token: &TokenState<'_>,
        required: &Role,
    ) -> RouteDecision {
        self.evaluate(path, token, Some(required))
    }

    fn evaluate(
        &self,
        path: &str,
        token: &TokenState<'_>,
        required: Option<&Role>,
    ) -> RouteDecision {
        if self.is_public(path) {
            return RouteDecision::Allow;
        }
        let TokenState::Valid(principal) = token else {
            return RouteDecision::RedirectLogin;
        };
        match required {
            Some(role) if !principal.has_role(role) => RouteDecision::RedirectHome,
            _ => RouteDecision::Allow,
        }
    }
}
