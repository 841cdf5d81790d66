//! Offline token validation: signature and expiry only.
//!
//! This path never consults the credential store, so a token for an account
//! disabled after issuance keeps validating here until it expires. The issuer's
//! remote validation is the authoritative check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::jwt::TokenCodec;
use crate::auth::AuthResult;

/// Identity established for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub subject: String,
}

#[derive(Clone)]
pub struct TokenValidator {
    codec: TokenCodec,
}

impl TokenValidator {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn validate_local(&self, token: &str) -> AuthResult<VerifiedIdentity> {
        self.validate_local_at(token, Utc::now())
    }

    pub fn validate_local_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<VerifiedIdentity> {
        let claims = self.codec.inspect_at(token, now).into_claims()?;
        Ok(VerifiedIdentity {
            subject: claims.sub,
        })
    }
}
