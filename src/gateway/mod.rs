//! API gateway: authenticates every inbound request and forwards it, with the
//! verified identity attached, to the downstream service owning its path.

use std::sync::Arc;

use reqwest::Client;
use rocket::data::ToByteUnit;
use rocket::{Data, Request};

pub mod config;
pub mod filter;
pub mod proxy;
pub mod remote;
pub mod routes;

pub use config::{GatewayConfig, GatewayRoute};
pub use filter::{FilterDecision, GatewayFilter, RejectReason, TrustLevel};
pub use proxy::{Downstream, ForwardRequest, ForwardResponse, HttpDownstream};
pub use remote::{HttpRemoteValidator, RemoteOutcome, RemoteValidator};
pub use routes::{GatewayResponse, routes};

use crate::auth::config::DEFAULT_TOKEN_TTL_MS;
use crate::auth::guards::AUTHORIZATION_HEADER;
use crate::auth::{AuthError, AuthResult, TokenCodec, TokenValidator};
use crate::error::ApiError;
use crate::request_logger::AuthTrace;

pub struct GatewayState {
    pub config: GatewayConfig,
    pub filter: GatewayFilter,
    pub downstream: Arc<dyn Downstream>,
}

impl GatewayState {
    pub fn new(
        config: GatewayConfig,
        remote: Arc<dyn RemoteValidator>,
        downstream: Arc<dyn Downstream>,
    ) -> AuthResult<Self> {
        // Only the key matters for validation; the TTL is never used to issue here.
        let codec = TokenCodec::new(
            &config.jwt_secret,
            chrono::Duration::milliseconds(DEFAULT_TOKEN_TTL_MS),
        )?;
        let filter = GatewayFilter::new(remote, TokenValidator::new(codec), config.remote_timeout);
        Ok(Self {
            config,
            filter,
            downstream,
        })
    }

    /// Wire the HTTP remote validator and downstream proxy from configuration.
    pub fn from_config(config: GatewayConfig) -> AuthResult<Self> {
        let http = Client::builder()
            .build()
            .map_err(|err| AuthError::Config(format!("failed to build HTTP client: {err}")))?;
        let remote = Arc::new(HttpRemoteValidator::new(
            config.validate_url.clone(),
            http.clone(),
        ));
        let downstream = Arc::new(HttpDownstream::new(
            config.routes.clone(),
            http,
            config.forward_timeout,
        ));
        Self::new(config, remote, downstream)
    }

    /// Authenticate one request and, if allowed, forward a newly built copy of it.
    pub async fn handle(&self, request: &Request<'_>, data: Data<'_>) -> GatewayResponse {
        let path = request.uri().path().as_str().to_string();

        let identity = if self.config.is_public(&path) {
            request.local_cache(|| AuthTrace::Public);
            None
        } else {
            let authorization = request.headers().get_one(AUTHORIZATION_HEADER);
            match self.filter.authorize(authorization).await {
                FilterDecision::Forwarded { identity, trust } => {
                    request.local_cache(|| match trust {
                        TrustLevel::Authoritative => AuthTrace::Remote,
                        TrustLevel::Degraded => AuthTrace::LocalFallback,
                    });
                    Some((identity, trust))
                }
                FilterDecision::Rejected(reason) => {
                    request.local_cache(|| AuthTrace::Rejected);
                    return GatewayResponse::Failed(ApiError::Unauthorized(
                        reason.message().to_string(),
                    ));
                }
            }
        };

        let body = match data
            .open(self.config.max_body_bytes.bytes())
            .into_bytes()
            .await
        {
            Ok(capped) if capped.is_complete() => capped.into_inner(),
            Ok(_) => {
                return GatewayResponse::Failed(ApiError::PayloadTooLarge(format!(
                    "request body exceeds {} bytes",
                    self.config.max_body_bytes
                )));
            }
            Err(err) => {
                return GatewayResponse::Failed(ApiError::InternalError(format!(
                    "failed to read request body: {err}"
                )));
            }
        };

        let inbound: Vec<(String, String)> = request
            .headers()
            .iter()
            .map(|header| (header.name().to_string(), header.value().to_string()))
            .collect();

        let forward = proxy::build_forward_request(
            request.method().as_str(),
            &request.uri().to_string(),
            inbound
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
            identity.as_ref().map(|(identity, trust)| (identity, *trust)),
            body,
        );

        match self.downstream.forward(forward).await {
            Ok(response) => GatewayResponse::Proxied(response),
            Err(err) => GatewayResponse::Failed(ApiError::from(err)),
        }
    }
}
