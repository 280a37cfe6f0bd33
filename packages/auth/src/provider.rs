//! # Identity provider seam
//!
//! [`IdentityProvider`] is the trait the auth core consumes for account
//! creation, credential sign-in, sign-out, profile updates, and the session
//! push stream. The controller is generic over it, so a real network-backed
//! provider and the in-process [`InMemoryIdentity`] are interchangeable.
//!
//! [`ProviderError`] is the closed set of failure codes a provider may
//! return. Codes unknown to this enum travel as [`ProviderError::Other`] and
//! degrade to the generic user-facing message instead of being dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::models::AuthSession;

/// Failure codes from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("email already in use")]
    EmailAlreadyInUse,
    #[error("weak password")]
    WeakPassword,
    #[error("invalid email")]
    InvalidEmail,
    #[error("user not found")]
    UserNotFound,
    #[error("wrong password")]
    WrongPassword,
    #[error("too many requests")]
    TooManyRequests,
    #[error("network request failed")]
    NetworkRequestFailed,
    /// A code this client does not recognize.
    #[error("provider error: {0}")]
    Other(String),
}

/// Async interface to the identity provider.
pub trait IdentityProvider {
    /// Create an account and sign it in.
    fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<AuthSession, ProviderError>>;

    /// Sign in with email and password.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<AuthSession, ProviderError>>;

    /// Sign out the current session.
    fn sign_out(&self) -> impl std::future::Future<Output = Result<(), ProviderError>>;

    /// Update the display name on an account.
    fn update_profile(
        &self,
        uid: &str,
        display_name: &str,
    ) -> impl std::future::Future<Output = Result<(), ProviderError>>;

    /// Subscribe to session transitions. Every sign-in, sign-up, and sign-out
    /// pushes the new session (or `None`) to all live receivers. Delivery is
    /// not exactly-once; consumers must tolerate zero, one, or repeated
    /// transitions. Dropping the receiver unsubscribes.
    fn subscribe_session(&self) -> mpsc::UnboundedReceiver<Option<AuthSession>>;
}

/// In-process IdentityProvider for testing and local development.
///
/// Holds accounts in memory and enforces the same failure codes a real
/// provider would: duplicate emails, passwords shorter than 6 characters,
/// addresses without an `@`, unknown users, and wrong passwords.
///
/// Clones share the same account table and session.
#[derive(Clone, Debug, Default)]
pub struct InMemoryIdentity {
    inner: Arc<Mutex<IdentityState>>,
}

#[derive(Debug, Default)]
struct IdentityState {
    accounts: HashMap<String, Account>,
    current: Option<AuthSession>,
    subscribers: Vec<mpsc::UnboundedSender<Option<AuthSession>>>,
    next_uid: u64,
}

#[derive(Debug)]
struct Account {
    uid: String,
    password: String,
    display_name: Option<String>,
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session currently held by the provider, if any.
    pub fn current_session(&self) -> Option<AuthSession> {
        self.inner.lock().unwrap().current.clone()
    }

    fn set_session(&self, session: Option<AuthSession>) {
        let mut state = self.inner.lock().unwrap();
        state.current = session.clone();
        state.subscribers.retain(|tx| !tx.is_closed());
        for tx in &state.subscribers {
            let _ = tx.send(session.clone());
        }
    }
}

impl IdentityProvider for InMemoryIdentity {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ProviderError> {
        if !email.contains('@') {
            return Err(ProviderError::InvalidEmail);
        }
        if password.len() < 6 {
            return Err(ProviderError::WeakPassword);
        }

        let session = {
            let mut state = self.inner.lock().unwrap();
            if state.accounts.contains_key(email) {
                return Err(ProviderError::EmailAlreadyInUse);
            }
            state.next_uid += 1;
            let uid = format!("uid-{}", state.next_uid);
            state.accounts.insert(
                email.to_string(),
                Account {
                    uid: uid.clone(),
                    password: password.to_string(),
                    display_name: None,
                },
            );
            AuthSession {
                uid,
                email: email.to_string(),
                display_name: None,
            }
        };
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ProviderError> {
        if !email.contains('@') {
            return Err(ProviderError::InvalidEmail);
        }

        let session = {
            let state = self.inner.lock().unwrap();
            let account = state
                .accounts
                .get(email)
                .ok_or(ProviderError::UserNotFound)?;
            if account.password != password {
                return Err(ProviderError::WrongPassword);
            }
            AuthSession {
                uid: account.uid.clone(),
                email: email.to_string(),
                display_name: account.display_name.clone(),
            }
        };
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.set_session(None);
        Ok(())
    }

    async fn update_profile(&self, uid: &str, display_name: &str) -> Result<(), ProviderError> {
        let mut state = self.inner.lock().unwrap();
        let account = state
            .accounts
            .values_mut()
            .find(|a| a.uid == uid)
            .ok_or(ProviderError::UserNotFound)?;
        account.display_name = Some(display_name.to_string());
        if let Some(ref mut current) = state.current {
            if current.uid == uid {
                current.display_name = Some(display_name.to_string());
            }
        }
        Ok(())
    }

    fn subscribe_session(&self) -> mpsc::UnboundedReceiver<Option<AuthSession>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().unwrap().subscribers.push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_account_and_error_codes() {
        let identity = InMemoryIdentity::new();

        assert_eq!(
            identity.create_account("no-at-sign", "secret1").await,
            Err(ProviderError::InvalidEmail)
        );
        assert_eq!(
            identity.create_account("a@b.com", "short").await,
            Err(ProviderError::WeakPassword)
        );

        let session = identity.create_account("a@b.com", "secret1").await.unwrap();
        assert_eq!(session.email, "a@b.com");
        assert_eq!(identity.current_session(), Some(session));

        assert_eq!(
            identity.create_account("a@b.com", "secret1").await,
            Err(ProviderError::EmailAlreadyInUse)
        );
    }

    #[tokio::test]
    async fn test_sign_in_error_codes() {
        let identity = InMemoryIdentity::new();
        identity.create_account("a@b.com", "secret1").await.unwrap();
        identity.sign_out().await.unwrap();

        assert_eq!(
            identity.sign_in("missing@b.com", "secret1").await,
            Err(ProviderError::UserNotFound)
        );
        assert_eq!(
            identity.sign_in("a@b.com", "wrong!!").await,
            Err(ProviderError::WrongPassword)
        );

        let session = identity.sign_in("a@b.com", "secret1").await.unwrap();
        assert_eq!(session.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_session_stream_pushes_transitions() {
        let identity = InMemoryIdentity::new();
        let mut rx = identity.subscribe_session();

        identity.create_account("a@b.com", "secret1").await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.unwrap().email, "a@b.com");

        identity.sign_out().await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_profile_reflects_in_session() {
        let identity = InMemoryIdentity::new();
        let session = identity.create_account("a@b.com", "secret1").await.unwrap();

        identity.update_profile(&session.uid, "a").await.unwrap();
        assert_eq!(
            identity.current_session().unwrap().display_name,
            Some("a".to_string())
        );

        assert_eq!(
            identity.update_profile("uid-999", "x").await,
            Err(ProviderError::UserNotFound)
        );
    }
}
