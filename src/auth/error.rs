use rocket::http::Status;
use rocket_db_pools::sqlx;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("account is disabled or no longer exists")]
    AccountDisabledOrMissing,
    #[error("username or email already registered")]
    DuplicateSubject,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("authentication service unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("missing or invalid Authorization header")]
    Unauthorized,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("argon2 parameter error: {0}")]
    Argon2(String),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::Malformed
            | AuthError::InvalidSignature
            | AuthError::Expired
            | AuthError::AccountDisabledOrMissing
            | AuthError::InvalidCredentials
            | AuthError::Unauthorized => Status::Unauthorized,
            AuthError::DuplicateSubject | AuthError::InvalidRequest(_) => Status::BadRequest,
            AuthError::RemoteUnavailable(_) => Status::ServiceUnavailable,
            AuthError::Config(_)
            | AuthError::Sqlx(_)
            | AuthError::Jwt(_)
            | AuthError::Argon2(_)
            | AuthError::PasswordHash(_) => Status::InternalServerError,
        }
    }

    /// Message safe to return to clients. Internal failures never expose
    /// their source (hashes, key material, SQL).
    pub fn public_message(&self) -> String {
        match self {
            AuthError::RemoteUnavailable(_) => "authentication service unavailable".to_string(),
            err if err.status() == Status::InternalServerError => {
                "internal server error".to_string()
            }
            err => err.to_string(),
        }
    }

    /// True for failures that reject the token itself rather than the
    /// infrastructure around it.
    pub fn is_token_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::Malformed
                | AuthError::InvalidSignature
                | AuthError::Expired
                | AuthError::AccountDisabledOrMissing
        )
    }
}

impl From<argon2::Error> for AuthError {
    fn from(err: argon2::Error) -> Self {
        AuthError::Argon2(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}
