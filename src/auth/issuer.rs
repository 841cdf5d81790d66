use std::sync::Arc;

use crate::auth::jwt::{IssuedToken, TokenCodec};
use crate::auth::passwords::PasswordService;
use crate::auth::responses::AccountSummary;
use crate::auth::store::{CredentialStore, NewCredential};
use crate::auth::validator::TokenValidator;
use crate::auth::{AuthError, AuthResult};

/// A freshly issued token together with the account it belongs to.
#[derive(Debug, Clone)]
pub struct IssuedAccount {
    pub account: AccountSummary,
    pub token: IssuedToken,
}

/// Source of truth for accounts: registers, logs in, and answers remote
/// validation calls from the gateway.
pub struct AuthIssuer {
    store: Arc<dyn CredentialStore>,
    passwords: PasswordService,
    validator: TokenValidator,
}

impl AuthIssuer {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        passwords: PasswordService,
        codec: TokenCodec,
    ) -> Self {
        Self {
            store,
            passwords,
            validator: TokenValidator::new(codec),
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    pub async fn register(
        &self,
        subject: &str,
        email: &str,
        raw_password: &str,
    ) -> AuthResult<IssuedAccount> {
        let subject = subject.trim();
        let email = email.trim().to_lowercase();

        if subject.is_empty() || email.is_empty() || raw_password.is_empty() {
            return Err(AuthError::InvalidRequest(
                "username, email and password are required".into(),
            ));
        }
        if !email.contains('@') {
            return Err(AuthError::InvalidRequest("email must contain '@'".into()));
        }
        // Keeps usernames and emails disjoint, so login can tell them apart.
        if subject.contains('@') {
            return Err(AuthError::InvalidRequest("username must not contain '@'".into()));
        }

        if self.store.username_exists(subject).await? || self.store.email_exists(&email).await? {
            log::debug!("registration refused: duplicate username or email");
            return Err(AuthError::DuplicateSubject);
        }

        let password_hash = self.passwords.hash_password(raw_password)?;
        let credential = self
            .store
            .insert(NewCredential {
                username: subject.to_string(),
                email,
                password_hash,
            })
            .await?;

        let token = self.validator.codec().issue(&credential.username)?;
        log::info!("registered account id={}", credential.id);

        Ok(IssuedAccount {
            account: AccountSummary::from(&credential),
            token,
        })
    }

    pub async fn login(&self, subject_or_email: &str, raw_password: &str) -> AuthResult<IssuedAccount> {
        let key = subject_or_email.trim();
        if key.is_empty() || raw_password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let credential = if key.contains('@') {
            self.store.find_by_email(&key.to_lowercase()).await?
        } else {
            self.store.find_by_username(key).await?
        };

        let credential = match credential {
            Some(credential) => credential,
            None => {
                self.passwords.verify_decoy(raw_password);
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self
            .passwords
            .verify_password(raw_password, &credential.password_hash)?
        {
            log::debug!("login rejected for account id={}: password mismatch", credential.id);
            return Err(AuthError::InvalidCredentials);
        }

        if !credential.enabled {
            log::debug!("login rejected for account id={}: disabled", credential.id);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.validator.codec().issue(&credential.username)?;
        Ok(IssuedAccount {
            account: AccountSummary::from(&credential),
            token,
        })
    }

    /// Signature and expiry, then live account status. A token for a deleted
    /// or disabled account is rejected here even while it still verifies
    /// offline.
    pub async fn validate_remote(&self, token: &str) -> AuthResult<AccountSummary> {
        let identity = self.validator.validate_local(token)?;

        match self.store.find_by_username(&identity.subject).await? {
            Some(credential) if credential.enabled => Ok(AccountSummary::from(&credential)),
            _ => Err(AuthError::AccountDisabledOrMissing),
        }
    }
}
