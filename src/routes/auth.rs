use crate::{
    auth::{AuthResponse, LoginHandler, LoginRequest},
    error::AppError,
};
use actix_web::{post, web, HttpResponse, Responder};
use validator::Validate;

/// Login user
///
/// Exchanges a username and password for a bearer token.
///
/// ## Responses:
/// - `200 OK`: `{"token": "<jwt>"}`.
/// - `400 Bad Request`: the body is not the expected JSON.
/// - `401 Unauthorized`: unknown user or wrong password, empty body either way.
/// - `422 Unprocessable Entity`: an empty or unusable field.
#[post("/login")]
pub async fn login(
    handler: web::Data<LoginHandler>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let token = handler
        .authenticate(&login_data.username, &login_data.password)
        .await?;

    Ok(HttpResponse::Ok().json(AuthResponse { token }))
}
