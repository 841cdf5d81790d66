use std::sync::Arc;

use chrono::Duration;
use expense_auth::auth::store::CredentialStore;
use expense_auth::auth::{AuthConfig, AuthError, AuthState, MemoryCredentialStore};
use expense_auth::test_support::TestRocketBuilder;
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use rocket::serde::json::{Value, json};

const TEST_JWT_SECRET: &str = "auth-routes-test-secret-0123456789abcdef";

async fn auth_client() -> (Client, AuthState, Arc<MemoryCredentialStore>) {
    let store = Arc::new(MemoryCredentialStore::new());
    let config = AuthConfig::new(TEST_JWT_SECRET, Duration::hours(1)).expect("auth config");
    let state = AuthState::new(config, store.clone()).expect("auth state");
    let client = TestRocketBuilder::new()
        .with_auth_service(state.clone())
        .async_client()
        .await;
    (client, state, store)
}

async fn register(client: &Client, username: &str, email: &str, password: &str) -> (Status, Value) {
    let response = client
        .post("/api/auth/register")
        .header(ContentType::JSON)
        .body(json!({ "username": username, "email": email, "password": password }).to_string())
        .dispatch()
        .await;
    let status = response.status();
    let body = response.into_json::<Value>().await.expect("JSON body");
    (status, body)
}

async fn validate(client: &Client, token: &str) -> (Status, Value) {
    let response = client
        .post("/api/auth/validate")
        .header(Header::new("Authorization", format!("Bearer {token}")))
        .dispatch()
        .await;
    let status = response.status();
    let body = response.into_json::<Value>().await.expect("JSON body");
    (status, body)
}

#[rocket::async_test]
async fn register_then_validate_returns_the_account() {
    let (client, _, _) = auth_client().await;

    let (status, body) = register(&client, "alice", "Alice@X.com", "pw123456").await;
    assert_eq!(status, Status::Created);
    assert_eq!(body["type"], "Bearer");
    assert_eq!(body["subject"], "alice");
    assert_eq!(body["email"], "alice@x.com");
    let token = body["token"].as_str().expect("token string");

    let (status, body) = validate(&client, token).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["subject"], "alice");
    assert_eq!(body["email"], "alice@x.com");
}

#[rocket::async_test]
async fn disabled_account_fails_remote_but_passes_local_validation() {
    let (client, state, store) = auth_client().await;

    let (_, body) = register(&client, "alice", "alice@x.com", "pw123456").await;
    let token = body["token"].as_str().expect("token string").to_string();

    assert!(store.set_enabled("alice", false).await.expect("disable"));

    let (status, body) = validate(&client, &token).await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["status"], 401);

    assert!(matches!(
        state.issuer.validate_remote(&token).await,
        Err(AuthError::AccountDisabledOrMissing)
    ));
    let identity = state
        .issuer
        .validator()
        .validate_local(&token)
        .expect("signature and expiry still hold");
    assert_eq!(identity.subject, "alice");
}

#[rocket::async_test]
async fn duplicate_registration_is_rejected() {
    let (client, _, store) = auth_client().await;

    let (status, _) = register(&client, "alice", "alice@x.com", "pw123456").await;
    assert_eq!(status, Status::Created);

    let (status, body) = register(&client, "alice", "other@x.com", "pw123456").await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["status"], 400);

    let (status, _) = register(&client, "bob", "ALICE@x.com", "pw123456").await;
    assert_eq!(status, Status::BadRequest);

    assert_eq!(store.len(), 1);
}

#[rocket::async_test]
async fn login_accepts_username_or_email_and_rejects_bad_passwords() {
    let (client, _, _) = auth_client().await;
    register(&client, "alice", "alice@x.com", "pw123456").await;

    for identifier in ["alice", "alice@x.com"] {
        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(json!({ "username": identifier, "password": "pw123456" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok, "login as {identifier}");
        let body = response.into_json::<Value>().await.expect("JSON body");
        assert_eq!(body["subject"], "alice");
        assert!(body["token"].as_str().is_some_and(|token| !token.is_empty()));
    }

    let wrong_password = client
        .post("/api/auth/login")
        .header(ContentType::JSON)
        .body(json!({ "username": "alice", "password": "nope" }).to_string())
        .dispatch()
        .await;
    assert_eq!(wrong_password.status(), Status::Unauthorized);

    let unknown = client
        .post("/api/auth/login")
        .header(ContentType::JSON)
        .body(json!({ "username": "mallory", "password": "pw123456" }).to_string())
        .dispatch()
        .await;
    assert_eq!(unknown.status(), Status::Unauthorized);

    let wrong_body = wrong_password.into_json::<Value>().await.expect("JSON body");
    let unknown_body = unknown.into_json::<Value>().await.expect("JSON body");
    assert_eq!(wrong_body["message"], unknown_body["message"]);
}

#[rocket::async_test]
async fn validate_requires_a_bearer_header() {
    let (client, _, _) = auth_client().await;

    let missing = client.post("/api/auth/validate").dispatch().await;
    assert_eq!(missing.status(), Status::Unauthorized);

    let basic = client
        .post("/api/auth/validate")
        .header(Header::new("Authorization", "Basic YWxpY2U6cHc="))
        .dispatch()
        .await;
    assert_eq!(basic.status(), Status::Unauthorized);

    let (status, _) = validate(&client, "not-a-token").await;
    assert_eq!(status, Status::Unauthorized);
}
