use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderMap},
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::sync::Arc;

use super::lookup::IdentityLookup;
use super::policy::AuthorizationPolicy;
use super::token::TokenService;
use crate::error::{AppError, AuthError};
use crate::models::Identity;

/// Gates every request before it reaches a handler.
///
/// A bearer token, when present, must be valid; its subject is resolved to a
/// current `Identity`. The policy then decides on the request path. Approved
/// requests carry the identity in their extensions; denied ones never reach
/// the inner service.
#[derive(Clone)]
pub struct AccessFilter {
    tokens: Arc<TokenService>,
    lookup: Arc<dyn IdentityLookup>,
    policy: Arc<AuthorizationPolicy>,
}

impl AccessFilter {
    pub fn new(
        tokens: Arc<TokenService>,
        lookup: Arc<dyn IdentityLookup>,
        policy: Arc<AuthorizationPolicy>,
    ) -> Self {
        Self {
            tokens,
            lookup,
            policy,
        }
    }

    /// Resolves the caller of `req`. `Ok(None)` means no token was presented.
    async fn identify(&self, req: &ServiceRequest) -> Result<Option<Identity>, AppError> {
        let Some(token) = bearer_token(req.headers()) else {
            return Ok(None);
        };

        let subject = self.tokens.validate(token)?;

        match self.lookup.find_by_username(&subject).await? {
            Some(credential) => Ok(Some(Identity::from(&credential))),
            None => {
                log::debug!("Token subject '{}' no longer exists", subject);
                Err(AuthError::Unauthorized.into())
            }
        }
    }

    async fn admit(&self, req: &ServiceRequest) -> Result<Option<Identity>, AppError> {
        let identity = self.identify(req).await?;

        // Decide on the decoded path the router will match, not the raw request target.
        let path = req.match_info().as_str();
        if let Err(denied) = self.policy.evaluate(path, identity.as_ref()) {
            log::debug!(
                "{} {} denied for {}: {}",
                req.method(),
                req.path(),
                identity
                    .as_ref()
                    .map(|i| i.username.as_str())
                    .unwrap_or("anonymous"),
                denied
            );
            return Err(denied.into());
        }
        Ok(identity)
    }
}

/// Extracts the credentials of an `Authorization: Bearer <token>` header.
///
/// Any other scheme, or a header that isn't valid ASCII, counts as no token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ').unwrap_or((value.trim(), ""));
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim())
    } else {
        None
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessFilter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AccessFilterService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AccessFilterService {
            service: Rc::new(service),
            filter: self.clone(),
        }))
    }
}

pub struct AccessFilterService<S> {
    service: Rc<S>,
    filter: AccessFilter,
}

impl<S, B> Service<ServiceRequest> for AccessFilterService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let filter = self.filter.clone();

        Box::pin(async move {
            // AppError converts into actix_web::Error through ResponseError.
            let identity = filter.admit(&req).await?;
            if let Some(identity) = identity {
                req.extensions_mut().insert(identity);
            }
            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Bearer   padded  ")), Some("padded"));
        assert_eq!(bearer_token(&headers("Bearer")), Some(""));
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
