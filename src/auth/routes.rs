use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;

use crate::auth::guards::BearerToken;
use crate::auth::issuer::IssuedAccount;
use crate::auth::responses::{AccountSummary, AuthResponse, LoginRequest, RegisterRequest, TOKEN_TYPE};
use crate::auth::{AuthError, AuthState};

type AuthRouteResult<T> = Result<T, status::Custom<Json<AuthErrorResponse>>>;

#[derive(Debug, serde::Serialize, serde::Deserialize, JsonSchema)]
pub struct AuthErrorResponse {
    pub status: u16,
    pub error: String,
    pub message: String,
}

/// Create an account and return a token for it.
#[openapi(tag = "Auth")]
#[post("/auth/register", data = "<payload>")]
pub async fn register(
    state: &State<AuthState>,
    payload: Json<RegisterRequest>,
) -> AuthRouteResult<status::Custom<Json<AuthResponse>>> {
    let issued = state
        .issuer
        .register(&payload.subject, &payload.email, &payload.password)
        .await
        .map_err(respond_error)?;

    Ok(status::Custom(Status::Created, Json(auth_response(issued))))
}

/// Exchange a username (or email) and password for a fresh token.
#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<payload>")]
pub async fn login(
    state: &State<AuthState>,
    payload: Json<LoginRequest>,
) -> AuthRouteResult<Json<AuthResponse>> {
    let issued = state
        .issuer
        .login(&payload.subject, &payload.password)
        .await
        .map_err(respond_error)?;

    Ok(Json(auth_response(issued)))
}

/// Authoritative token check used by the gateway.
#[openapi(tag = "Auth")]
#[post("/auth/validate")]
pub async fn validate(
    state: &State<AuthState>,
    bearer: BearerToken,
) -> AuthRouteResult<Json<AccountSummary>> {
    let token = bearer.into_token().map_err(respond_error)?;
    let account = state
        .issuer
        .validate_remote(&token)
        .await
        .map_err(respond_error)?;

    Ok(Json(account))
}

fn auth_response(issued: IssuedAccount) -> AuthResponse {
    AuthResponse {
        token: issued.token.token,
        token_type: TOKEN_TYPE.to_string(),
        expires_at: issued.token.expires_at,
        account: issued.account,
    }
}

fn respond_error(err: AuthError) -> status::Custom<Json<AuthErrorResponse>> {
    let status = err.status();
    if status == Status::InternalServerError {
        log::error!("auth request failed: {}", err);
    } else {
        log::debug!("auth request rejected: {}", err);
    }

    status::Custom(
        status,
        Json(AuthErrorResponse {
            status: status.code,
            error: status.reason().unwrap_or("Error").to_string(),
            message: err.public_message(),
        }),
    )
}
