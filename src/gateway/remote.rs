use reqwest::{Client, StatusCode};

use crate::auth::VerifiedIdentity;
use crate::auth::responses::AccountSummary;

/// What the issuer said about a token, as seen from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// The issuer vouched for the token and the live account.
    Verified(VerifiedIdentity),
    /// The issuer answered and refused the token. Never re-validated locally.
    Rejected,
    /// The issuer could not give an answer; local validation may stand in.
    Unavailable(String),
}

#[rocket::async_trait]
pub trait RemoteValidator: Send + Sync {
    async fn validate(&self, token: &str) -> RemoteOutcome;
}

/// Calls the issuer's `POST /auth/validate` endpoint.
#[derive(Debug, Clone)]
pub struct HttpRemoteValidator {
    validate_url: String,
    http: Client,
}

impl HttpRemoteValidator {
    pub fn new(validate_url: impl Into<String>, http: Client) -> Self {
        Self {
            validate_url: validate_url.into(),
            http,
        }
    }
}

#[rocket::async_trait]
impl RemoteValidator for HttpRemoteValidator {
    async fn validate(&self, token: &str) -> RemoteOutcome {
        let response = match self
            .http
            .post(&self.validate_url)
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return RemoteOutcome::Unavailable(format!("transport error: {err}")),
        };

        let status = response.status();
        match status {
            StatusCode::OK => match response.json::<AccountSummary>().await {
                Ok(account) => RemoteOutcome::Verified(account.identity()),
                Err(err) => RemoteOutcome::Unavailable(format!("unreadable validation body: {err}")),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteOutcome::Rejected,
            other => RemoteOutcome::Unavailable(format!("auth service returned status {other}")),
        }
    }
}
