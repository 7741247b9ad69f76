pub mod clock;
pub mod extractors;
pub mod layer;
pub mod login;
pub mod lookup;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

// Re-export necessary items
pub use clock::{Clock, ManualClock, SystemClock};
pub use extractors::AuthenticatedIdentity;
pub use layer::AuthLayer;
pub use login::LoginHandler;
pub use lookup::{IdentityLookup, InMemoryIdentityLookup, PgIdentityLookup};
pub use middleware::AccessFilter;
pub use password::PasswordVerifier;
pub use policy::{AuthorizationPolicy, Requirement, Rule};
pub use token::{Claims, TokenService};

pub use crate::error::AuthError;

lazy_static! {
    // Any printable characters except whitespace; keeps control characters out of logs.
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[^\s\p{Cc}]+$").unwrap();
}

/// Represents the payload for a user login request.
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    /// Account name, matched exactly against the credential store.
    #[validate(
        length(min = 1, max = 128),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must not contain whitespace or control characters"
        )
    )]
    pub username: String,
    /// Plaintext password. Never logged.
    #[validate(length(min = 1))]
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Response body of a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The signed bearer token.
    pub token: String,
}
