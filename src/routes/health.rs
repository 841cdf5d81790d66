//! Liveness endpoint mounted by both services.

use rocket::get;
use rocket::serde::json::Json;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

/// Basic response payload describing service health.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    /// Static status string reporting readiness.
    pub status: String,
    /// Which process answered.
    pub service: String,
}

/// Health check for the auth service.
#[openapi(tag = "Health")]
#[get("/health")]
pub fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "auth".to_string(),
    })
}

/// Same check under the auth prefix, reachable through the gateway's public
/// `/api/auth/` path.
#[openapi(tag = "Health")]
#[get("/auth/health")]
pub fn auth_health() -> Json<HealthResponse> {
    health_check()
}

/// Health check answered by the gateway itself, never proxied.
#[get("/health")]
pub fn gateway_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "gateway".to_string(),
    })
}
