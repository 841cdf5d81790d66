use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use expense_auth::auth::{TokenCodec, VerifiedIdentity};
use expense_auth::gateway::proxy::{AUTH_MODE_HEADER, ProxyError, USER_ID_HEADER, USER_NAME_HEADER};
use expense_auth::gateway::{
    Downstream, ForwardRequest, ForwardResponse, GatewayConfig, GatewayState, HttpDownstream,
    HttpRemoteValidator, RemoteOutcome, RemoteValidator,
};
use expense_auth::test_support::TestRocketBuilder;
use parking_lot::Mutex;
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use rocket::serde::json::Value;

const SECRET: &str = "gateway-routes-test-secret-0123456789abcdef";

struct StubRemote {
    outcome: RemoteOutcome,
    calls: AtomicUsize,
}

impl StubRemote {
    fn new(outcome: RemoteOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[rocket::async_trait]
impl RemoteValidator for StubRemote {
    async fn validate(&self, _token: &str) -> RemoteOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Records every forwarded request and answers 200 with the request body.
#[derive(Default)]
struct RecordingDownstream {
    seen: Mutex<Vec<ForwardRequest>>,
}

impl RecordingDownstream {
    fn last(&self) -> ForwardRequest {
        self.seen.lock().last().cloned().expect("a forwarded request")
    }

    fn count(&self) -> usize {
        self.seen.lock().len()
    }
}

#[rocket::async_trait]
impl Downstream for RecordingDownstream {
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse, ProxyError> {
        let body = request.body.clone();
        self.seen.lock().push(request);
        Ok(ForwardResponse {
            status: 200,
            headers: vec![("X-Downstream".to_string(), "expenses".to_string())],
            body,
        })
    }
}

fn config() -> GatewayConfig {
    let mut config = GatewayConfig::new(SECRET, "http://127.0.0.1:9/api/auth/validate");
    config.remote_timeout = Duration::from_millis(500);
    config.public_prefixes = vec!["/api/auth/".to_string()];
    config
}

fn token_for(subject: &str) -> String {
    TokenCodec::new(SECRET, chrono::Duration::hours(1))
        .expect("codec")
        .issue(subject)
        .expect("token")
        .token
}

fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {token}"))
}

async fn gateway_client(
    config: GatewayConfig,
    remote: Arc<dyn RemoteValidator>,
    downstream: Arc<dyn Downstream>,
) -> Client {
    let state = GatewayState::new(config, remote, downstream).expect("gateway state");
    TestRocketBuilder::new()
        .with_gateway(state)
        .with_request_logger()
        .async_client()
        .await
}

fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}/api/auth/validate")
}

#[rocket::async_test]
async fn remote_verification_forwards_with_identity_headers() {
    let remote = StubRemote::new(RemoteOutcome::Verified(VerifiedIdentity {
        subject: "alice".into(),
    }));
    let downstream = Arc::new(RecordingDownstream::default());
    let client = gateway_client(config(), remote.clone(), downstream.clone()).await;

    let response = client
        .get("/api/expenses?page=2")
        .header(bearer(&token_for("alice")))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.headers().get_one("X-Downstream"), Some("expenses"));
    assert_eq!(remote.calls(), 1);

    let forwarded = downstream.last();
    assert_eq!(forwarded.method, "GET");
    assert_eq!(forwarded.path_and_query, "/api/expenses?page=2");
    assert_eq!(forwarded.header(USER_ID_HEADER), Some("alice"));
    assert_eq!(forwarded.header(USER_NAME_HEADER), Some("alice"));
    assert_eq!(forwarded.header(AUTH_MODE_HEADER), Some("remote"));
}

#[rocket::async_test]
async fn unreachable_issuer_falls_back_to_local_validation() {
    let http = reqwest::Client::builder().no_proxy().build().expect("client");
    let remote = Arc::new(HttpRemoteValidator::new(closed_port_url(), http));
    let downstream = Arc::new(RecordingDownstream::default());
    let client = gateway_client(config(), remote, downstream.clone()).await;

    let response = client
        .get("/api/expenses")
        .header(bearer(&token_for("alice")))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let forwarded = downstream.last();
    assert_eq!(forwarded.header(USER_ID_HEADER), Some("alice"));
    assert_eq!(forwarded.header(AUTH_MODE_HEADER), Some("local"));
}

#[rocket::async_test]
async fn unreachable_issuer_still_rejects_garbage_tokens() {
    let remote = StubRemote::new(RemoteOutcome::Unavailable("down".into()));
    let downstream = Arc::new(RecordingDownstream::default());
    let client = gateway_client(config(), remote, downstream.clone()).await;

    let response = client
        .get("/api/expenses")
        .header(bearer("garbage"))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Unauthorized);
    let body = response.into_json::<Value>().await.expect("JSON body");
    assert_eq!(body["message"], "invalid token");
    assert_eq!(downstream.count(), 0);
}

#[rocket::async_test]
async fn explicit_rejection_is_final() {
    let remote = StubRemote::new(RemoteOutcome::Rejected);
    let downstream = Arc::new(RecordingDownstream::default());
    let client = gateway_client(config(), remote.clone(), downstream.clone()).await;

    // Locally this token is perfectly valid; the issuer's refusal must win.
    let response = client
        .delete("/api/expenses/7")
        .header(bearer(&token_for("alice")))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Unauthorized);
    assert_eq!(remote.calls(), 1);
    assert_eq!(downstream.count(), 0);
}

#[rocket::async_test]
async fn missing_or_foreign_authorization_is_rejected_without_remote_call() {
    let remote = StubRemote::new(RemoteOutcome::Rejected);
    let downstream = Arc::new(RecordingDownstream::default());
    let client = gateway_client(config(), remote.clone(), downstream.clone()).await;

    let missing = client.get("/api/expenses").dispatch().await;
    assert_eq!(missing.status(), Status::Unauthorized);
    let body = missing.into_json::<Value>().await.expect("JSON body");
    assert_eq!(body["message"], "missing or invalid Authorization header");

    let basic = client
        .get("/api/expenses")
        .header(Header::new("Authorization", "Basic YWxpY2U6cHc="))
        .dispatch()
        .await;
    assert_eq!(basic.status(), Status::Unauthorized);

    assert_eq!(remote.calls(), 0);
    assert_eq!(downstream.count(), 0);
}

#[rocket::async_test]
async fn public_paths_skip_authentication_and_drop_spoofed_identity() {
    let remote = StubRemote::new(RemoteOutcome::Rejected);
    let downstream = Arc::new(RecordingDownstream::default());
    let client = gateway_client(config(), remote.clone(), downstream.clone()).await;

    let response = client
        .post("/api/auth/login")
        .header(ContentType::JSON)
        .header(Header::new("X-User-Id", "root"))
        .header(Header::new("X-Auth-Mode", "remote"))
        .body(r#"{"username":"alice","password":"pw123456"}"#)
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        response.into_string().await.as_deref(),
        Some(r#"{"username":"alice","password":"pw123456"}"#)
    );
    assert_eq!(remote.calls(), 0);

    let forwarded = downstream.last();
    assert_eq!(forwarded.method, "POST");
    assert_eq!(forwarded.header(USER_ID_HEADER), None);
    assert_eq!(forwarded.header(AUTH_MODE_HEADER), None);
    assert_eq!(forwarded.header("content-type"), Some("application/json"));
}

#[rocket::async_test]
async fn spoofed_identity_is_replaced_by_the_verified_subject() {
    let remote = StubRemote::new(RemoteOutcome::Verified(VerifiedIdentity {
        subject: "alice".into(),
    }));
    let downstream = Arc::new(RecordingDownstream::default());
    let client = gateway_client(config(), remote, downstream.clone()).await;

    let response = client
        .put("/api/expenses/7")
        .header(bearer(&token_for("alice")))
        .header(Header::new("X-User-Id", "root"))
        .body("{}")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let forwarded = downstream.last();
    let user_ids: Vec<&str> = forwarded
        .headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case(USER_ID_HEADER))
        .map(|(_, value)| value.as_str())
        .collect();
    assert_eq!(user_ids, vec!["alice"]);
    assert_eq!(forwarded.body, b"{}".to_vec());
}

#[rocket::async_test]
async fn unknown_service_path_is_not_found() {
    let remote = StubRemote::new(RemoteOutcome::Verified(VerifiedIdentity {
        subject: "alice".into(),
    }));
    let http = reqwest::Client::builder().no_proxy().build().expect("client");
    let downstream = Arc::new(HttpDownstream::new(Vec::new(), http, Duration::from_secs(1)));
    let client = gateway_client(config(), remote, downstream).await;

    let response = client
        .get("/api/unknown")
        .header(bearer(&token_for("alice")))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn oversized_bodies_are_refused() {
    let remote = StubRemote::new(RemoteOutcome::Verified(VerifiedIdentity {
        subject: "alice".into(),
    }));
    let downstream = Arc::new(RecordingDownstream::default());
    let mut config = config();
    config.max_body_bytes = 8;
    let client = gateway_client(config, remote, downstream.clone()).await;

    let response = client
        .post("/api/expenses")
        .header(bearer(&token_for("alice")))
        .body("0123456789abcdef")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::PayloadTooLarge);
    assert_eq!(downstream.count(), 0);
}
