use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use std::ops::Deref;

use crate::error::AppError;
use crate::models::Identity;

/// Extracts the caller's identity from request extensions.
///
/// `AccessFilter` inserts the identity for every request that presented a
/// valid token. Handlers behind a non-public rule can rely on it; on a public
/// route without a token the extractor fails with `AppError::Unauthorized`.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity(pub Identity);

impl Deref for AuthenticatedIdentity {
    type Target = Identity;

    fn deref(&self) -> &Identity {
        &self.0
    }
}

impl FromRequest for AuthenticatedIdentity {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Identity>().cloned() {
            Some(identity) => ready(Ok(AuthenticatedIdentity(identity))),
            None => {
                log::warn!(
                    "No identity attached to {}; is AccessFilter wrapping this route?",
                    req.path()
                );
                ready(Err(AppError::Unauthorized.into()))
            }
        }
    }
}
