use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;

use crate::auth::{AuthenticatedIdentity, AuthorizationPolicy, TokenService};

/// Administrative status
///
/// Reports the active rule table and token lifetime. Gated to `ADMIN` by the
/// default `/admin/**` rule.
#[get("/status")]
pub async fn status(
    identity: AuthenticatedIdentity,
    policy: web::Data<AuthorizationPolicy>,
    tokens: web::Data<TokenService>,
) -> impl Responder {
    let rules: Vec<String> = policy.rules().iter().map(ToString::to_string).collect();
    HttpResponse::Ok().json(json!({
        "admin": identity.username,
        "token_ttl_secs": tokens.ttl().num_seconds(),
        "rules": rules,
    }))
}
