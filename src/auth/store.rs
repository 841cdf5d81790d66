//! Credential storage behind a trait, so the issuer does not care whether
//! accounts live in PostgreSQL or in process memory.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::auth::{AuthError, AuthResult};

/// A stored account. Never serialized into responses.
#[derive(Debug, Clone)]
pub struct Credential {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCredential {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[rocket::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Credential>>;

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Credential>>;

    async fn username_exists(&self, username: &str) -> AuthResult<bool> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    async fn email_exists(&self, email: &str) -> AuthResult<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    /// Insert a new credential. Must fail with `DuplicateSubject` and leave the
    /// store untouched when the username or email is already taken.
    async fn insert(&self, credential: NewCredential) -> AuthResult<Credential>;

    /// Returns false when no credential matched.
    async fn set_enabled(&self, username: &str, enabled: bool) -> AuthResult<bool>;
}

#[derive(Default)]
struct MemoryInner {
    by_username: HashMap<String, Credential>,
    username_by_email: HashMap<String, String>,
    next_id: i64,
}

/// In-process credential store for tests and single-node development.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_username.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[rocket::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Credential>> {
        Ok(self.inner.read().by_username.get(username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Credential>> {
        let inner = self.inner.read();
        Ok(inner
            .username_by_email
            .get(email)
            .and_then(|username| inner.by_username.get(username))
            .cloned())
    }

    async fn insert(&self, credential: NewCredential) -> AuthResult<Credential> {
        let mut inner = self.inner.write();
        if inner.by_username.contains_key(&credential.username)
            || inner.username_by_email.contains_key(&credential.email)
        {
            return Err(AuthError::DuplicateSubject);
        }

        inner.next_id += 1;
        let stored = Credential {
            id: inner.next_id,
            username: credential.username,
            email: credential.email,
            password_hash: credential.password_hash,
            enabled: true,
            created_at: Utc::now(),
        };
        inner
            .username_by_email
            .insert(stored.email.clone(), stored.username.clone());
        inner
            .by_username
            .insert(stored.username.clone(), stored.clone());
        Ok(stored)
    }

    async fn set_enabled(&self, username: &str, enabled: bool) -> AuthResult<bool> {
        match self.inner.write().by_username.get_mut(username) {
            Some(credential) => {
                credential.enabled = enabled;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
