use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use serde::Serialize;
use std::io::Cursor;

use crate::gateway::proxy::ProxyError;

/// Errors the gateway answers itself, without reaching a downstream service.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    NotFound(String),
    PayloadTooLarge(String),
    BadGateway(String),
    GatewayTimeout(String),
    InternalError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, error_type, message) = match self {
            ApiError::Unauthorized(msg) => (Status::Unauthorized, "Unauthorized", msg),
            ApiError::NotFound(msg) => {
                log::debug!("not found: {}", msg);
                (Status::NotFound, "NotFound", msg)
            }
            ApiError::PayloadTooLarge(msg) => (Status::PayloadTooLarge, "PayloadTooLarge", msg),
            ApiError::BadGateway(msg) => {
                log::error!("bad gateway: {}", msg);
                (
                    Status::BadGateway,
                    "BadGateway",
                    "downstream service unavailable".to_string(),
                )
            }
            ApiError::GatewayTimeout(msg) => {
                log::warn!("gateway timeout: {}", msg);
                (
                    Status::GatewayTimeout,
                    "GatewayTimeout",
                    "downstream service timed out".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                log::error!("internal error: {}", msg);
                (
                    Status::InternalServerError,
                    "InternalError",
                    "internal server error".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        let json = serde_json::to_string(&error_response).unwrap_or_else(|_| {
            r#"{"error":"SerializationError","message":"Failed to serialize error"}"#.to_string()
        });

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::NoRoute(path) => ApiError::NotFound(format!("no service for {path}")),
            ProxyError::Method(method) => {
                ApiError::InternalError(format!("unsupported method {method}"))
            }
            ProxyError::Timeout(_) => ApiError::GatewayTimeout(err.to_string()),
            ProxyError::Http(_) => ApiError::BadGateway(err.to_string()),
        }
    }
}
