//! Authentication collaborator. Credential storage and session handling
//! belong to a remote identity provider; the ledger only consumes this
//! trait to learn who is acting. [`MemoryAuth`] implements the full
//! contract for tests and ephemeral use.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// The authenticated identity, as reported by the provider. Distinct from
/// the [`crate::domain::User`] document, which is created lazily from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub auth_id: String,
    pub email: String,
    pub name: String,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Authentication provider failure: {0}")]
    Provider(String),
}

pub const MIN_PASSWORD_LEN: usize = 8;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The currently authenticated principal, if any.
    async fn current_principal(&self) -> Result<Option<Principal>, AuthError>;

    async fn login(&self, email: &str, password: &str) -> Result<Principal, AuthError>;

    async fn register(&self, email: &str, password: &str, name: &str)
        -> Result<Principal, AuthError>;

    async fn logout(&self) -> Result<(), AuthError>;

    /// Change the current principal's password.
    async fn change_password(&self, old: &str, new: &str) -> Result<(), AuthError>;
}

#[derive(Debug, Clone)]
struct Registered {
    auth_id: String,
    name: String,
    password: String,
}

/// In-memory provider holding registered principals and at most one live
/// session. Passwords are kept in plain memory, which is fine for what
/// this is: a test double for the remote identity service.
#[derive(Debug, Default)]
pub struct MemoryAuth {
    state: Mutex<MemoryAuthState>,
}

#[derive(Debug, Default)]
struct MemoryAuthState {
    registered: HashMap<String, Registered>,
    session: Option<String>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn current_principal(&self) -> Result<Option<Principal>, AuthError> {
        let state = self.state.lock().expect("auth lock poisoned");
        Ok(state.session.as_ref().and_then(|email| {
            state.registered.get(email).map(|r| Principal {
                auth_id: r.auth_id.clone(),
                email: email.clone(),
                name: r.name.clone(),
            })
        }))
    }

    async fn login(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let mut state = self.state.lock().expect("auth lock poisoned");
        let entry = state
            .registered
            .get(email)
            .filter(|r| r.password == password)
            .cloned()
            .ok_or(AuthError::InvalidCredentials)?;

        state.session = Some(email.to_string());
        Ok(Principal {
            auth_id: entry.auth_id,
            email: email.to_string(),
            name: entry.name,
        })
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Principal, AuthError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let mut state = self.state.lock().expect("auth lock poisoned");
        if state.registered.contains_key(email) {
            return Err(AuthError::EmailTaken);
        }

        let entry = Registered {
            auth_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            password: password.to_string(),
        };
        let principal = Principal {
            auth_id: entry.auth_id.clone(),
            email: email.to_string(),
            name: entry.name.clone(),
        };

        state.registered.insert(email.to_string(), entry);
        state.session = Some(email.to_string());
        Ok(principal)
    }

    async fn logout(&self) -> Result<(), AuthError> {
        let mut state = self.state.lock().expect("auth lock poisoned");
        state.session = None;
        Ok(())
    }

    async fn change_password(&self, old: &str, new: &str) -> Result<(), AuthError> {
        if new.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let mut state = self.state.lock().expect("auth lock poisoned");
        let email = state
            .session
            .clone()
            .ok_or(AuthError::NotAuthenticated)?;
        let entry = state
            .registered
            .get_mut(&email)
            .ok_or(AuthError::NotAuthenticated)?;

        if entry.password != old {
            return Err(AuthError::InvalidCredentials);
        }
        entry.password = new.to_string();
        Ok(())
    }
}
