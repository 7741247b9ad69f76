use actix_web::{rt, HttpServer};
use serde_json::json;
use std::net::TcpListener;
use std::sync::Arc;
use taskgate::auth::{AuthLayer, AuthResponse, InMemoryIdentityLookup, PasswordVerifier};
use taskgate::build_app;
use taskgate::config::Config;

fn config() -> Config {
    Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some("server_test_secret_0123456789abcdefgh".to_string()),
        "BCRYPT_COST" => Some("4".to_string()),
        "SEED_USERS" => Some("admin:admin:pass:ADMIN;user:user-pass:USER".to_string()),
        _ => None,
    })
    .expect("test configuration is valid")
}

#[actix_rt::test]
async fn test_login_and_access_over_http() {
    let config = config();
    let verifier = PasswordVerifier::new(config.auth.bcrypt_cost);
    let lookup = InMemoryIdentityLookup::from_seed(&config.seed_users, &verifier)
        .expect("Failed to seed identities");
    let auth = AuthLayer::new(&config.auth, Arc::new(lookup)).expect("Failed to build auth layer");

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server = HttpServer::new(move || build_app(auth.clone()))
        .workers(1)
        .listen(listener)
        .expect("Failed to listen")
        .run();
    let handle = server.handle();
    let server_task = rt::spawn(server);

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{}", port);

    let resp = client
        .get(format!("{}/health", base))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    // The admin password contains a ':' and must survive SEED_USERS parsing.
    let resp = client
        .post(format!("{}/api/auth/login", base))
        .json(&json!({ "username": "admin", "password": "admin:pass" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let login: AuthResponse = resp.json().await.expect("Failed to parse login response");

    let resp = client
        .get(format!("{}/admin/status", base))
        .bearer_auth(&login.token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let resp = client
        .get(format!("{}/admin/status", base))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(resp.text().await.unwrap(), "");

    let resp = client
        .post(format!("{}/api/auth/login", base))
        .json(&json!({ "username": "user", "password": "user-pass" }))
        .send()
        .await
        .expect("Failed to send request");
    let user_login: AuthResponse = resp.json().await.expect("Failed to parse login response");

    let resp = client
        .get(format!("{}/admin/status", base))
        .bearer_auth(&user_login.token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
    assert_eq!(resp.text().await.unwrap(), "");

    handle.stop(false).await;
    let _ = server_task.await;
}
