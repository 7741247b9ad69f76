use actix_web::{get, HttpResponse, Responder};

use crate::auth::AuthenticatedIdentity;

/// Current caller
///
/// Returns the username and role the presented token resolved to.
#[get("/me")]
pub async fn me(identity: AuthenticatedIdentity) -> impl Responder {
    HttpResponse::Ok().json(&identity.0)
}
