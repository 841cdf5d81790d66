use std::time::Duration;

use reqwest::{Client, Method};
use thiserror::Error;

use crate::auth::VerifiedIdentity;
use crate::gateway::config::GatewayRoute;
use crate::gateway::filter::TrustLevel;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_NAME_HEADER: &str = "X-User-Name";
pub const AUTH_MODE_HEADER: &str = "X-Auth-Mode";

/// Headers that describe one connection and must not be relayed.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "content-length",
    "host",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Headers only the gateway may set; inbound copies are dropped.
const IDENTITY_HEADERS: &[&str] = &[USER_ID_HEADER, USER_NAME_HEADER, AUTH_MODE_HEADER];

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no downstream service for path {0}")]
    NoRoute(String),
    #[error("unsupported method {0}")]
    Method(String),
    #[error("downstream request timed out after {0:?}")]
    Timeout(Duration),
    #[error("downstream HTTP error: {0}")]
    Http(reqwest::Error),
}

/// A request built fresh for the downstream service. The inbound request is
/// never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRequest {
    pub method: String,
    pub path_and_query: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ForwardRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

fn is_identity_header(name: &str) -> bool {
    IDENTITY_HEADERS
        .iter()
        .any(|header| header.eq_ignore_ascii_case(name))
}

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|header| header.eq_ignore_ascii_case(name))
}

/// Assemble the downstream request: relayable inbound headers, minus any
/// client-supplied identity, plus the verified identity when there is one.
pub fn build_forward_request<'a>(
    method: &str,
    path_and_query: &str,
    inbound_headers: impl IntoIterator<Item = (&'a str, &'a str)>,
    identity: Option<(&VerifiedIdentity, TrustLevel)>,
    body: Vec<u8>,
) -> ForwardRequest {
    let mut headers: Vec<(String, String)> = inbound_headers
        .into_iter()
        .filter(|(name, _)| !is_hop_by_hop(name) && !is_identity_header(name))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    if let Some((identity, trust)) = identity {
        headers.push((USER_ID_HEADER.to_string(), identity.subject.clone()));
        headers.push((USER_NAME_HEADER.to_string(), identity.subject.clone()));
        headers.push((AUTH_MODE_HEADER.to_string(), trust.as_str().to_string()));
    }

    ForwardRequest {
        method: method.to_string(),
        path_and_query: path_and_query.to_string(),
        headers,
        body,
    }
}

/// Longest matching prefix wins.
pub fn resolve_route<'a>(routes: &'a [GatewayRoute], path: &str) -> Option<&'a GatewayRoute> {
    routes
        .iter()
        .filter(|route| route.matches(path))
        .max_by_key(|route| route.prefix.len())
}

#[rocket::async_trait]
pub trait Downstream: Send + Sync {
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse, ProxyError>;
}

/// Forwards over HTTP to the service owning the request path.
#[derive(Debug, Clone)]
pub struct HttpDownstream {
    routes: Vec<GatewayRoute>,
    http: Client,
    timeout: Duration,
}

impl HttpDownstream {
    pub fn new(routes: Vec<GatewayRoute>, http: Client, timeout: Duration) -> Self {
        Self {
            routes,
            http,
            timeout,
        }
    }
}

#[rocket::async_trait]
impl Downstream for HttpDownstream {
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse, ProxyError> {
        let route = resolve_route(&self.routes, &request.path_and_query)
            .ok_or_else(|| ProxyError::NoRoute(request.path_and_query.clone()))?;
        let url = format!("{}{}", route.target, request.path_and_query);
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| ProxyError::Method(request.method.clone()))?;

        log::debug!("proxy: {} {} -> {}", request.method, request.path_and_query, route.target);

        let mut builder = self.http.request(method, url).timeout(self.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.body(request.body).send().await.map_err(|err| {
            if err.is_timeout() {
                ProxyError::Timeout(self.timeout)
            } else {
                ProxyError::Http(err)
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(ProxyError::Http)?
            .to_vec();

        Ok(ForwardResponse {
            status,
            headers,
            body,
        })
    }
}
