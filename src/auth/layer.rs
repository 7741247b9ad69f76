use actix_web::web;
use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::login::LoginHandler;
use super::lookup::IdentityLookup;
use super::middleware::AccessFilter;
use super::password::PasswordVerifier;
use super::policy::AuthorizationPolicy;
use super::token::TokenService;
use crate::config::AuthConfig;
use crate::error::AppError;

/// The authentication components of one process, built once at startup.
///
/// Cloning is cheap; every clone shares the same token keys, lookup and rules.
#[derive(Clone)]
pub struct AuthLayer {
    pub tokens: Arc<TokenService>,
    pub lookup: Arc<dyn IdentityLookup>,
    pub policy: Arc<AuthorizationPolicy>,
    pub login: Arc<LoginHandler>,
}

impl AuthLayer {
    pub fn new(config: &AuthConfig, lookup: Arc<dyn IdentityLookup>) -> Result<Self, AppError> {
        Self::with_clock(config, lookup, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: &AuthConfig,
        lookup: Arc<dyn IdentityLookup>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let tokens = Arc::new(TokenService::with_clock(config, clock));
        let policy = Arc::new(AuthorizationPolicy::new(config.rules.clone()));
        let login = Arc::new(LoginHandler::new(
            lookup.clone(),
            PasswordVerifier::new(config.bcrypt_cost),
            tokens.clone(),
        )?);

        log::debug!(
            "Auth layer ready: token ttl {}s, {} rules",
            tokens.ttl().num_seconds(),
            policy.rules().len()
        );

        Ok(Self {
            tokens,
            lookup,
            policy,
            login,
        })
    }

    /// The middleware to wrap an `App` with.
    pub fn filter(&self) -> AccessFilter {
        AccessFilter::new(self.tokens.clone(), self.lookup.clone(), self.policy.clone())
    }

    /// Registers the shared components as application data for handlers.
    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::from(self.login.clone()))
            .app_data(web::Data::from(self.policy.clone()))
            .app_data(web::Data::from(self.tokens.clone()));
    }
}
