use actix_web::HttpServer;
use sqlx::PgPool;
use std::io;
use std::sync::Arc;

use taskgate::auth::{
    AuthLayer, IdentityLookup, InMemoryIdentityLookup, PasswordVerifier, PgIdentityLookup,
};
use taskgate::build_app;
use taskgate::config::Config;

fn startup_error(context: &str, error: impl std::fmt::Display) -> io::Error {
    log::error!("{}: {}", context, error);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, error))
}

async fn identity_lookup(config: &Config) -> io::Result<Arc<dyn IdentityLookup>> {
    if let Some(database_url) = &config.database_url {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| startup_error("Failed to connect to database", e))?;
        log::info!("Resolving identities from the users table");
        return Ok(Arc::new(PgIdentityLookup::new(pool)));
    }

    let verifier = PasswordVerifier::new(config.auth.bcrypt_cost);
    let store = InMemoryIdentityLookup::from_seed(&config.seed_users, &verifier)
        .map_err(|e| startup_error("Failed to seed identities", e))?;
    if store.is_empty() {
        log::warn!("DATABASE_URL and SEED_USERS are both unset; no one can log in");
    } else {
        log::info!("Resolving identities from {} seeded users", store.len());
    }
    Ok(Arc::new(store))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| startup_error("Invalid configuration", e))?;
    let lookup = identity_lookup(&config).await?;
    let auth = AuthLayer::new(&config.auth, lookup)
        .map_err(|e| startup_error("Failed to initialise authentication", e))?;

    log::info!("Starting taskgate server at {}", config.server_url());
    HttpServer::new(move || build_app(auth.clone()))
        .bind((config.server_host.as_str(), config.server_port))?
        .run()
        .await
}
