use chrono::Duration;

use crate::auth::jwt::whole_seconds;
use crate::auth::{AuthError, AuthResult};

/// Token lifetime used when `EXPENSE_JWT_EXPIRATION_MS` is not set (24h).
pub const DEFAULT_TOKEN_TTL_MS: i64 = 86_400_000;

/// Minimum HS256 key length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Authentication configuration loaded from environment variables.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>, token_ttl: Duration) -> AuthResult<Self> {
        // Token timestamps are whole seconds.
        let config = Self {
            jwt_secret: jwt_secret.into(),
            token_ttl: whole_seconds(token_ttl),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> AuthResult<Self> {
        let jwt_secret = std::env::var("EXPENSE_JWT_SECRET")
            .map_err(|_| AuthError::Config("EXPENSE_JWT_SECRET is required".into()))?;
        let token_ttl_ms = match std::env::var("EXPENSE_JWT_EXPIRATION_MS") {
            Ok(raw) => raw.trim().parse::<i64>().map_err(|_| {
                AuthError::Config("EXPENSE_JWT_EXPIRATION_MS must be an integer".into())
            })?,
            Err(_) => DEFAULT_TOKEN_TTL_MS,
        };

        Self::new(jwt_secret, Duration::milliseconds(token_ttl_ms))
    }

    fn validate(&self) -> AuthResult<()> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::Config(format!(
                "signing secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if self.token_ttl <= Duration::zero() {
            return Err(AuthError::Config("token ttl must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_secrets_and_non_positive_ttl() {
        assert!(AuthConfig::new("short", Duration::hours(1)).is_err());
        assert!(AuthConfig::new("x".repeat(32), Duration::zero()).is_err());
        assert!(AuthConfig::new("x".repeat(32), Duration::milliseconds(DEFAULT_TOKEN_TTL_MS)).is_ok());
    }

    #[test]
    fn millisecond_ttl_is_rounded_up_to_whole_seconds() {
        let config = AuthConfig::new("x".repeat(32), Duration::milliseconds(1_500)).expect("config");
        assert_eq!(config.token_ttl, Duration::seconds(2));
        let exact = AuthConfig::new("x".repeat(32), Duration::milliseconds(3_000)).expect("config");
        assert_eq!(exact.token_ttl, Duration::seconds(3));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let config = AuthConfig::new("s".repeat(40), Duration::hours(1)).expect("config");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains(&"s".repeat(40)));
        assert!(rendered.contains("<redacted>"));
    }
}
