use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::App;

use crate::auth::AuthLayer;
use crate::routes;

/// Builds the application served by the binary.
///
/// Middleware runs outermost first: `NormalizePath`, `Cors`, `Logger`, then
/// `AccessFilter`.
pub fn build_app(
    auth: AuthLayer,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .configure(|cfg| auth.register(cfg))
        .wrap(auth.filter())
        .wrap(Logger::default())
        .wrap(
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600),
        )
        .wrap(NormalizePath::trim())
        .configure(routes::config)
}
