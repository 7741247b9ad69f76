//! Process-wide configuration.
//!
//! Everything here is read once at startup, validated, and then shared
//! immutably. A missing or unusable signing secret stops the process from
//! starting.

use chrono::Duration;
use std::collections::HashSet;
use std::env;
use std::fmt;

use crate::auth::policy::{default_rules, Rule};
use crate::models::Role;

/// Shortest accepted HS256 secret, in bytes.
pub const MIN_JWT_SECRET_LENGTH: usize = 32;
/// Default token lifetime (24 hours).
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60 * 24;

/// Reasons the configuration could not be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, reason } => write!(f, "{} is invalid: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

/// The HMAC signing secret. Its `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct JwtSecret(String);

impl JwtSecret {
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(invalid(
                "JWT_SECRET",
                format!("must be at least {} bytes", MIN_JWT_SECRET_LENGTH),
            ));
        }
        Ok(Self(secret))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JwtSecret(**redacted**)")
    }
}

/// An identity loaded into the in-memory store at startup.
#[derive(Clone)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    pub role: Role,
}

impl fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedUser")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Settings for the authentication layer.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: JwtSecret,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
    pub rules: Vec<Rule>,
}

impl AuthConfig {
    /// Builds a config with the default TTL, cost and rule table.
    pub fn new(jwt_secret: JwtSecret) -> Self {
        Self {
            jwt_secret,
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            rules: default_rules(),
        }
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }
}

pub struct Config {
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    pub auth: AuthConfig,
    pub seed_users: Vec<SeedUser>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = JwtSecret::new(get("JWT_SECRET").unwrap_or_default())?;

        let ttl_secs = match get("JWT_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|e| invalid("JWT_TTL_SECS", e.to_string()))?,
            None => DEFAULT_TOKEN_TTL_SECS,
        };
        if ttl_secs <= 0 {
            return Err(invalid("JWT_TTL_SECS", "must be greater than zero"));
        }
        let token_ttl = Duration::try_seconds(ttl_secs)
            .ok_or_else(|| invalid("JWT_TTL_SECS", "out of range"))?;

        let bcrypt_cost = match get("BCRYPT_COST") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|e| invalid("BCRYPT_COST", e.to_string()))?,
            None => bcrypt::DEFAULT_COST,
        };
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(invalid("BCRYPT_COST", "must be between 4 and 31"));
        }

        let rules = match get("AUTH_RULES") {
            Some(raw) if !raw.trim().is_empty() => parse_rules(&raw)?,
            _ => default_rules(),
        };

        let seed_users = match get("SEED_USERS") {
            Some(raw) => parse_seed_users(&raw)?,
            None => Vec::new(),
        };

        let server_port = match get("SERVER_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| invalid("SERVER_PORT", "must be a number"))?,
            None => 8080,
        };

        Ok(Self {
            database_url: get("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            server_port,
            server_host: get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            auth: AuthConfig::new(jwt_secret)
                .with_token_ttl(token_ttl)
                .with_bcrypt_cost(bcrypt_cost)
                .with_rules(rules),
            seed_users,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

/// Parses `pattern=requirement` entries separated by commas.
fn parse_rules(raw: &str) -> Result<Vec<Rule>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.parse::<Rule>().map_err(|e| invalid("AUTH_RULES", e.to_string())))
        .collect()
}

/// Parses `username:password:ROLE` entries separated by semicolons.
fn parse_seed_users(raw: &str) -> Result<Vec<SeedUser>, ConfigError> {
    let mut seen = HashSet::new();
    let mut users = Vec::new();
    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        // Passwords may contain ':'; the username ends at the first one and the role follows the last.
        let parsed = entry
            .split_once(':')
            .and_then(|(u, rest)| rest.rsplit_once(':').map(|(p, r)| (u, p, r)));
        let (username, password, role) = match parsed {
            Some((u, p, r)) if !u.is_empty() && !p.is_empty() => (u, p, r),
            _ => {
                return Err(invalid(
                    "SEED_USERS",
                    "entries must look like username:password:ROLE",
                ))
            }
        };
        let role = role
            .parse::<Role>()
            .map_err(|e| invalid("SEED_USERS", e.to_string()))?;
        if !seen.insert(username) {
            return Err(invalid(
                "SEED_USERS",
                format!("duplicate username '{}'", username),
            ));
        }
        users.push(SeedUser {
            username: username.to_string(),
            password: password.to_string(),
            role,
        });
    }
    Ok(users)
}
