//! Per-request authorization decision for the gateway.
//!
//! `Start --no bearer--> Rejected(missing header)`
//! `Start --bearer--> HasToken --remote verified--> Forwarded(remote)`
//! `HasToken --remote rejected--> Rejected(invalid token)`
//! `HasToken --remote unavailable--> local ok: Forwarded(local) | Rejected(invalid token)`

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::auth::guards::bearer_token;
use crate::auth::{AuthError, AuthResult, TokenValidator, VerifiedIdentity};
use crate::gateway::remote::{RemoteOutcome, RemoteValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustLevel {
    /// The issuer confirmed the token and the live account.
    Authoritative,
    /// Only signature and expiry were checked, locally.
    Degraded,
}

impl TrustLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::Authoritative => "remote",
            TrustLevel::Degraded => "local",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingOrInvalidHeader,
    InvalidToken,
}

impl RejectReason {
    pub fn message(&self) -> &'static str {
        match self {
            RejectReason::MissingOrInvalidHeader => "missing or invalid Authorization header",
            RejectReason::InvalidToken => "invalid token",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Forwarded {
        identity: VerifiedIdentity,
        trust: TrustLevel,
    },
    Rejected(RejectReason),
}

/// Settle the `HasToken` state from the remote outcome. `local` runs only when
/// the issuer was unavailable.
pub fn resolve<F>(outcome: RemoteOutcome, local: F) -> FilterDecision
where
    F: FnOnce() -> AuthResult<VerifiedIdentity>,
{
    match outcome {
        RemoteOutcome::Verified(identity) => FilterDecision::Forwarded {
            identity,
            trust: TrustLevel::Authoritative,
        },
        RemoteOutcome::Rejected => FilterDecision::Rejected(RejectReason::InvalidToken),
        RemoteOutcome::Unavailable(reason) => {
            let unavailable = AuthError::RemoteUnavailable(reason);
            match local() {
                Ok(identity) => {
                    log::warn!("{}; forwarding on local validation", unavailable);
                    FilterDecision::Forwarded {
                        identity,
                        trust: TrustLevel::Degraded,
                    }
                }
                Err(err) if err.is_token_rejection() => {
                    log::debug!("{unavailable}; local validation rejected the token: {err}");
                    FilterDecision::Rejected(RejectReason::InvalidToken)
                }
                Err(err) => {
                    log::error!("{unavailable}; local validation failed: {err}");
                    FilterDecision::Rejected(RejectReason::InvalidToken)
                }
            }
        }
    }
}

pub struct GatewayFilter {
    remote: Arc<dyn RemoteValidator>,
    validator: TokenValidator,
    remote_timeout: Duration,
}

impl GatewayFilter {
    pub fn new(
        remote: Arc<dyn RemoteValidator>,
        validator: TokenValidator,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            remote,
            validator,
            remote_timeout,
        }
    }

    /// Run the whole state machine for one `Authorization` header value.
    pub async fn authorize(&self, authorization: Option<&str>) -> FilterDecision {
        let Some(token) = bearer_token(authorization) else {
            return FilterDecision::Rejected(RejectReason::MissingOrInvalidHeader);
        };

        let outcome = match timeout(self.remote_timeout, self.remote.validate(token)).await {
            Ok(outcome) => outcome,
            Err(_) => RemoteOutcome::Unavailable(format!(
                "no answer within {:?}",
                self.remote_timeout
            )),
        };

        resolve(outcome, || self.validator.validate_local(token))
    }
}
