use chrono::{DateTime, Duration, SubsecRound, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::auth::config::MIN_SECRET_LEN;
use crate::auth::{AuthConfig, AuthError, AuthResult};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Claims carry whole seconds, so the reported instants are whole seconds too.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of the single decode step shared by every validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    Valid(TokenClaims),
    Expired(TokenClaims),
    InvalidSignature,
    Malformed,
}

impl TokenStatus {
    /// Collapse into claims, treating expiry as a failure.
    pub fn into_claims(self) -> AuthResult<TokenClaims> {
        match self {
            TokenStatus::Valid(claims) => Ok(claims),
            TokenStatus::Expired(_) => Err(AuthError::Expired),
            TokenStatus::InvalidSignature => Err(AuthError::InvalidSignature),
            TokenStatus::Malformed => Err(AuthError::Malformed),
        }
    }
}

/// HS256 token codec over a process-wide symmetric key.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, token_ttl: Duration) -> AuthResult<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::Config(format!(
                "signing secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if token_ttl <= Duration::zero() {
            return Err(AuthError::Config("token ttl must be positive".into()));
        }

        let secret_bytes = secret.as_bytes();
        let encoding_key = EncodingKey::from_secret(secret_bytes);
        let decoding_key = DecodingKey::from_secret(secret_bytes);

        // Expiry is judged by `inspect_at` against an explicit clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            token_ttl: whole_seconds(token_ttl),
        })
    }

    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        Self::new(&config.jwt_secret, config.token_ttl)
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub fn issue(&self, subject: &str) -> AuthResult<IssuedToken> {
        self.issue_at(subject, self.token_ttl, Utc::now())
    }

    pub fn issue_with_ttl(&self, subject: &str, ttl: Duration) -> AuthResult<IssuedToken> {
        self.issue_at(subject, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        if ttl <= Duration::zero() {
            return Err(AuthError::Config("token ttl must be positive".into()));
        }
        if subject.is_empty() {
            return Err(AuthError::InvalidRequest("subject must not be empty".into()));
        }

        let now = now.trunc_subsecs(0);
        let expires_at = now + whole_seconds(ttl);
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at,
        })
    }

    /// Verify the signature and decode claims. Expiry is not judged here.
    pub fn parse(&self, token: &str) -> AuthResult<TokenClaims> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::InvalidSignature
                }
                _ => AuthError::Malformed,
            },
        )?;

        if data.claims.sub.is_empty() {
            return Err(AuthError::Malformed);
        }
        Ok(data.claims)
    }

    pub fn inspect(&self, token: &str) -> TokenStatus {
        self.inspect_at(token, Utc::now())
    }

    pub fn inspect_at(&self, token: &str, now: DateTime<Utc>) -> TokenStatus {
        match self.parse(token) {
            Ok(claims) if now.timestamp() < claims.exp => TokenStatus::Valid(claims),
            Ok(claims) => TokenStatus::Expired(claims),
            Err(AuthError::InvalidSignature) => TokenStatus::InvalidSignature,
            Err(_) => TokenStatus::Malformed,
        }
    }
}

/// Round a lifetime up to the next whole second.
pub(crate) fn whole_seconds(ttl: Duration) -> Duration {
    let seconds = Duration::seconds(ttl.num_seconds());
    if seconds < ttl {
        seconds + Duration::seconds(1)
    } else {
        seconds
    }
}
