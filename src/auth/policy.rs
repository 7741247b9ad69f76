//! Route-based authorization rules.
//!
//! A policy is an ordered list of `pattern => requirement` rules. The first
//! rule whose pattern matches the request path decides; a path no rule
//! matches requires an authenticated caller.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

use crate::error::AuthError;
use crate::models::{Identity, Role};

lazy_static! {
    static ref DEFAULT_RULES: Vec<Rule> = vec![
        Rule::public("/api/auth/login").expect("static pattern"),
        Rule::public("/health").expect("static pattern"),
        Rule::role("/admin/**", Role::Admin).expect("static pattern"),
    ];
}

/// The rule table used when none is configured.
pub fn default_rules() -> Vec<Rule> {
    DEFAULT_RULES.clone()
}

/// Errors raised while building rules from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    InvalidPattern { pattern: String, reason: String },
    InvalidRequirement(String),
    InvalidRule(String),
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::InvalidPattern { pattern, reason } => {
                write!(f, "invalid route pattern '{}': {}", pattern, reason)
            }
            PolicyError::InvalidRequirement(raw) => write!(
                f,
                "invalid requirement '{}', expected PUBLIC, AUTHENTICATED or ROLE(<role>)",
                raw
            ),
            PolicyError::InvalidRule(raw) => {
                write!(f, "invalid rule '{}', expected <pattern>=<requirement>", raw)
            }
        }
    }
}

impl std::error::Error for PolicyError {}

/// What a route demands of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Anyone, with or without a token.
    Public,
    /// Any caller with a valid token.
    Authenticated,
    /// A caller whose role is exactly this one.
    Role(Role),
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Public => f.write_str("PUBLIC"),
            Requirement::Authenticated => f.write_str("AUTHENTICATED"),
            Requirement::Role(role) => write!(f, "ROLE({})", role),
        }
    }
}

impl FromStr for Requirement {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "PUBLIC" => return Ok(Requirement::Public),
            "AUTHENTICATED" => return Ok(Requirement::Authenticated),
            _ => {}
        }
        upper
            .strip_prefix("ROLE(")
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(|role| role.parse::<Role>().ok())
            .map(Requirement::Role)
            .ok_or_else(|| PolicyError::InvalidRequirement(s.trim().to_string()))
    }
}

/// An Ant-style path pattern.
///
/// `?` matches one character other than `/`, `*` any run of characters other
/// than `/`, and `**` anything. A trailing `/**` also matches the bare prefix,
/// so `/admin/**` covers `/admin` itself.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
}

impl RoutePattern {
    pub fn new(pattern: &str) -> Result<Self, PolicyError> {
        if !pattern.starts_with('/') {
            return Err(PolicyError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "must start with '/'".into(),
            });
        }

        let mut re = String::from("^");
        let mut rest = pattern;
        while let Some(c) = rest.chars().next() {
            if let Some(tail) = rest.strip_prefix("/**") {
                re.push_str("(?:/.*)?");
                rest = tail;
            } else if let Some(tail) = rest.strip_prefix("**") {
                re.push_str(".*");
                rest = tail;
            } else if c == '*' {
                re.push_str("[^/]*");
                rest = &rest[1..];
            } else if c == '?' {
                re.push_str("[^/]");
                rest = &rest[1..];
            } else {
                let len = c.len_utf8();
                re.push_str(&regex::escape(&rest[..len]));
                rest = &rest[len..];
            }
        }
        re.push('$');

        let regex = Regex::new(&re).map_err(|e| PolicyError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for RoutePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for RoutePattern {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: RoutePattern,
    pub requirement: Requirement,
}

impl Rule {
    pub fn new(pattern: &str, requirement: Requirement) -> Result<Self, PolicyError> {
        Ok(Self {
            pattern: RoutePattern::new(pattern)?,
            requirement,
        })
    }

    pub fn public(pattern: &str) -> Result<Self, PolicyError> {
        Self::new(pattern, Requirement::Public)
    }

    pub fn role(pattern: &str, role: Role) -> Result<Self, PolicyError> {
        Self::new(pattern, Requirement::Role(role))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.pattern.as_str(), self.requirement)
    }
}

/// Parses `<pattern>=<requirement>`, e.g. `/admin/**=ROLE(ADMIN)`.
impl FromStr for Rule {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (pattern, requirement) = s
            .trim()
            .rsplit_once('=')
            .ok_or_else(|| PolicyError::InvalidRule(s.to_string()))?;
        Rule::new(pattern.trim(), requirement.parse()?)
    }
}

/// The ordered rule table consulted for every request.
#[derive(Debug, Clone)]
pub struct AuthorizationPolicy {
    rules: Vec<Rule>,
}

impl Default for AuthorizationPolicy {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl AuthorizationPolicy {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The requirement of the first rule matching `path`, or `Authenticated` if none does.
    pub fn requirement_for(&self, path: &str) -> Requirement {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map(|rule| rule.requirement)
            .unwrap_or(Requirement::Authenticated)
    }

    /// Decides whether `identity` (or an anonymous caller) may access `path`.
    pub fn evaluate(&self, path: &str, identity: Option<&Identity>) -> Result<(), AuthError> {
        match (self.requirement_for(path), identity) {
            (Requirement::Public, _) => Ok(()),
            (_, None) => Err(AuthError::Unauthorized),
            (Requirement::Authenticated, Some(_)) => Ok(()),
            (Requirement::Role(role), Some(identity)) if identity.has_role(role) => Ok(()),
            (Requirement::Role(_), Some(_)) => Err(AuthError::Forbidden),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn admin() -> Identity {
        Identity::new("admin", Role::Admin)
    }

    fn user() -> Identity {
        Identity::new("user", Role::User)
    }

    #[test_log::test]
    fn test_public_route_without_token_is_permitted() {
        let policy = AuthorizationPolicy::default();
        assert_eq!(policy.evaluate("/api/auth/login", None), Ok(()));
        assert_eq!(policy.evaluate("/health", None), Ok(()));
        assert_eq!(policy.evaluate("/health", Some(&user())), Ok(()));
    }

    #[test_log::test]
    fn test_role_route_denies_other_roles() {
        let policy = AuthorizationPolicy::default();
        assert_eq!(
            policy.evaluate("/admin/status", Some(&user())),
            Err(AuthError::Forbidden)
        );
        assert_eq!(policy.evaluate("/admin/status", Some(&admin())), Ok(()));
        assert_eq!(
            policy.evaluate("/admin/status", None),
            Err(AuthError::Unauthorized)
        );
    }

    #[test_log::test]
    fn test_unmatched_routes_require_authentication() {
        let policy = AuthorizationPolicy::default();
        assert_eq!(policy.requirement_for("/api/me"), Requirement::Authenticated);
        assert_eq!(policy.evaluate("/api/me", None), Err(AuthError::Unauthorized));
        assert_eq!(policy.evaluate("/api/me", Some(&user())), Ok(()));

        let empty = AuthorizationPolicy::new(Vec::new());
        assert_eq!(empty.evaluate("/anything", None), Err(AuthError::Unauthorized));
    }

    #[test]
    fn test_first_match_wins() {
        let policy = AuthorizationPolicy::new(vec![
            Rule::public("/admin/open").unwrap(),
            Rule::role("/admin/**", Role::Admin).unwrap(),
            Rule::public("/admin/**").unwrap(),
        ]);
        assert_eq!(policy.evaluate("/admin/open", None), Ok(()));
        assert_eq!(
            policy.evaluate("/admin/closed", None),
            Err(AuthError::Unauthorized)
        );
        assert_eq!(
            policy.evaluate("/admin/closed", Some(&user())),
            Err(AuthError::Forbidden)
        );
    }

    #[test]
    fn test_no_role_hierarchy() {
        let policy = AuthorizationPolicy::new(vec![Rule::role("/users/**", Role::User).unwrap()]);
        assert_eq!(
            policy.evaluate("/users/list", Some(&admin())),
            Err(AuthError::Forbidden)
        );
        assert_eq!(policy.evaluate("/users/list", Some(&user())), Ok(()));
    }

    #[test]
    fn test_pattern_matching() {
        let double = RoutePattern::new("/admin/**").unwrap();
        assert!(double.matches("/admin"));
        assert!(double.matches("/admin/"));
        assert!(double.matches("/admin/users/42"));
        assert!(!double.matches("/administrator"));
        assert!(!double.matches("/api/admin"));

        let single = RoutePattern::new("/api/users/*/tasks").unwrap();
        assert!(single.matches("/api/users/7/tasks"));
        assert!(!single.matches("/api/users/7/8/tasks"));

        let question = RoutePattern::new("/v?/status").unwrap();
        assert!(question.matches("/v1/status"));
        assert!(!question.matches("/v10/status"));

        let literal = RoutePattern::new("/api/auth/login").unwrap();
        assert!(literal.matches("/api/auth/login"));
        assert!(!literal.matches("/api/auth/login/extra"));
        assert!(!literal.matches("/api/auth/loginx"));

        let dotted = RoutePattern::new("/files/a.txt").unwrap();
        assert!(!dotted.matches("/files/abtxt"));

        let middle = RoutePattern::new("/api/**/tasks").unwrap();
        assert!(middle.matches("/api/users/1/tasks"));
        assert!(!middle.matches("/api/users/1/notes"));
    }

    #[test]
    fn test_pattern_must_be_absolute() {
        assert!(matches!(
            RoutePattern::new("admin/**"),
            Err(PolicyError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_rule_parsing() {
        let rule: Rule = "/admin/**=ROLE(ADMIN)".parse().unwrap();
        assert_eq!(rule, Rule::role("/admin/**", Role::Admin).unwrap());

        let rule: Rule = " /health = public ".parse().unwrap();
        assert_eq!(rule.requirement, Requirement::Public);
        assert_eq!(rule.pattern.as_str(), "/health");

        let rule: Rule = "/api/**=Authenticated".parse().unwrap();
        assert_eq!(rule.requirement, Requirement::Authenticated);

        let rule: Rule = "/ops/**=role(user)".parse().unwrap();
        assert_eq!(rule.requirement, Requirement::Role(Role::User));

        assert!("/no-requirement".parse::<Rule>().is_err());
        assert!("/x=ROLE(ROOT)".parse::<Rule>().is_err());
        assert!("/x=ROLE(ADMIN".parse::<Rule>().is_err());
        assert!("x=PUBLIC".parse::<Rule>().is_err());
    }

    #[test]
    fn test_rule_display_round_trips() {
        for rule in default_rules() {
            let reparsed: Rule = rule.to_string().parse().unwrap();
            assert_eq!(reparsed, rule);
        }
    }
}
