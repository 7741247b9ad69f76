use std::sync::Arc;

use super::lookup::IdentityLookup;
use super::password::PasswordVerifier;
use super::token::TokenService;
use crate::error::{AppError, AuthError};

/// Turns a username/password pair into a signed token.
///
/// An unknown username and a wrong password fail identically, and both run one
/// bcrypt verification: unknown users are checked against a throwaway hash.
pub struct LoginHandler {
    lookup: Arc<dyn IdentityLookup>,
    verifier: PasswordVerifier,
    tokens: Arc<TokenService>,
    dummy_hash: String,
}

impl LoginHandler {
    pub fn new(
        lookup: Arc<dyn IdentityLookup>,
        verifier: PasswordVerifier,
        tokens: Arc<TokenService>,
    ) -> Result<Self, AppError> {
        let dummy_hash = verifier.hash("taskgate-unknown-user")?;
        Ok(Self {
            lookup,
            verifier,
            tokens,
            dummy_hash,
        })
    }

    /// Returns a fresh token for `username` if `password` matches its stored hash.
    ///
    /// Every credential failure is `AppError::Unauthorized`; lookup or
    /// signing failures surface as server errors.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<String, AppError> {
        let credential = self.lookup.find_by_username(username).await?;

        let stored_hash = match &credential {
            Some(credential) => credential.password_hash.clone(),
            None => self.dummy_hash.clone(),
        };
        let password_matches = self.check_password(password, stored_hash).await?;

        match credential {
            Some(credential) if password_matches => {
                let token = self.tokens.generate(&credential.username)?;
                log::info!("User '{}' logged in", credential.username);
                Ok(token)
            }
            Some(_) => {
                log::debug!("Login rejected for '{}': wrong password", username);
                Err(AuthError::Unauthorized.into())
            }
            None => {
                log::debug!("Login rejected for '{}': unknown user", username);
                Err(AuthError::Unauthorized.into())
            }
        }
    }

    /// Runs bcrypt off the async workers. An unreadable stored hash counts as a mismatch.
    async fn check_password(&self, password: &str, stored_hash: String) -> Result<bool, AppError> {
        let verifier = self.verifier;
        let password = password.to_owned();
        let outcome = tokio::task::spawn_blocking(move || verifier.matches(&password, &stored_hash))
            .await
            .map_err(|e| AppError::InternalServerError(format!("Password check failed: {}", e)))?;

        match outcome {
            Ok(matches) => Ok(matches),
            Err(e) => {
                log::error!("Stored password hash could not be checked: {}", e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::lookup::InMemoryIdentityLookup;
    use crate::config::{AuthConfig, JwtSecret};
    use crate::models::{Credential, Role};

    const SECRET: &str = "login_handler_test_secret_0123456789";

    fn handler() -> (LoginHandler, Arc<TokenService>) {
        let verifier = PasswordVerifier::new(4);
        let lookup = InMemoryIdentityLookup::new([
            Credential::new("admin", verifier.hash("admin-pass").unwrap(), Role::Admin),
            Credential::new("user", verifier.hash("user-pass").unwrap(), Role::User),
            Credential::new("broken", "{bcrypt}$2a$10$", Role::User),
        ]);
        let config = AuthConfig::new(JwtSecret::new(SECRET).unwrap()).with_bcrypt_cost(4);
        let tokens = Arc::new(TokenService::new(&config));
        let handler = LoginHandler::new(Arc::new(lookup), verifier, tokens.clone()).unwrap();
        (handler, tokens)
    }

    #[actix_rt::test]
    async fn test_valid_credentials_yield_token_for_username() {
        let (handler, tokens) = handler();
        for (username, password) in [("admin", "admin-pass"), ("user", "user-pass")] {
            let token = handler.authenticate(username, password).await.unwrap();
            assert_eq!(tokens.validate(&token).unwrap(), username);
        }
    }

    #[actix_rt::test]
    async fn test_wrong_password_is_unauthorized() {
        let (handler, _) = handler();
        let result = handler.authenticate("admin", "user-pass").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[actix_rt::test]
    async fn test_unknown_user_is_unauthorized() {
        let (handler, _) = handler();
        let result = handler.authenticate("ghost", "admin-pass").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[actix_rt::test]
    async fn test_unreadable_stored_hash_is_unauthorized() {
        let (handler, _) = handler();
        let result = handler.authenticate("broken", "anything").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[actix_rt::test]
    async fn test_username_is_case_sensitive() {
        let (handler, _) = handler();
        let result = handler.authenticate("ADMIN", "admin-pass").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
