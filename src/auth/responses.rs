use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::auth::store::Credential;
use crate::auth::validator::VerifiedIdentity;

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RegisterRequest {
    #[serde(alias = "username")]
    pub subject: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoginRequest {
    /// Username or email address.
    #[serde(alias = "username", alias = "email")]
    pub subject: String,
    pub password: String,
}

/// Public view of an account. Password hashes and flags stay server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AccountSummary {
    pub id: i64,
    pub subject: String,
    pub email: String,
}

impl AccountSummary {
    pub fn identity(&self) -> VerifiedIdentity {
        VerifiedIdentity {
            subject: self.subject.clone(),
        }
    }
}

impl From<&Credential> for AccountSummary {
    fn from(credential: &Credential) -> Self {
        Self {
            id: credential.id,
            subject: credential.username.clone(),
            email: credential.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuthResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    #[serde(flatten)]
    pub account: AccountSummary,
}
