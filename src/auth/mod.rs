//! Authentication module: configuration, token codec, credential storage,
//! the issuer that owns accounts, offline validation, and HTTP routes.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod guards;
pub mod issuer;
pub mod jwt;
pub mod passwords;
pub mod pg_store;
pub mod responses;
pub mod routes;
pub mod store;
pub mod validator;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use issuer::AuthIssuer;
pub use jwt::{TokenCodec, TokenStatus};
pub use passwords::PasswordService;
pub use store::{CredentialStore, MemoryCredentialStore};
pub use validator::{TokenValidator, VerifiedIdentity};

#[derive(Clone)]
pub struct AuthState {
    pub issuer: Arc<AuthIssuer>,
}

impl AuthState {
    pub fn new(config: AuthConfig, store: Arc<dyn CredentialStore>) -> AuthResult<Self> {
        let codec = TokenCodec::from_config(&config)?;
        let passwords = PasswordService::new()?;
        Ok(Self {
            issuer: Arc::new(AuthIssuer::new(store, passwords, codec)),
        })
    }
}
