pub mod admin;
pub mod auth;
pub mod health;
pub mod me;

use actix_web::web;

use crate::error::AppError;

/// Body parsing failures answer 400 with the same `{"error": ...}` shape as other client errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// Registers every route. Access to each one is decided by `AccessFilter`
/// from the configured rule table, not here.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(health::health)
        .service(
            web::scope("/api")
                .service(web::scope("/auth").service(auth::login))
                .service(me::me),
        )
        .service(web::scope("/admin").service(admin::status));
}
