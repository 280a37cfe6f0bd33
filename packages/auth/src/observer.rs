//! # SessionObserver — the single reader of the provider's session stream
//!
//! Wraps the push-based [`IdentityProvider::subscribe_session`] stream in a
//! background task and exposes the latest state as a cheap snapshot. The
//! observer is the only writer of the mirrored session; everything else
//! reads.
//!
//! `loading` stays `true` until the first event arrives — the UI shows a
//! spinner instead of flashing a logged-out state while the provider
//! restores a persisted session. The stream may deliver zero, one, or
//! repeated transitions; each one simply replaces the snapshot.
//!
//! Dropping the observer aborts the task, which closes the subscription.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::AuthSession;
use crate::provider::IdentityProvider;

/// Point-in-time view of the session state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// True until the first event arrives from the provider.
    pub loading: bool,
    pub session: Option<AuthSession>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            loading: true,
            session: None,
        }
    }
}

/// Subscribes to the provider session stream for its own lifetime.
#[derive(Debug)]
pub struct SessionObserver {
    state: Arc<Mutex<SessionSnapshot>>,
    task: JoinHandle<()>,
}

impl SessionObserver {
    /// Subscribe to `provider` and start mirroring its session stream.
    /// Must be called from within a tokio runtime.
    pub fn new<P: IdentityProvider>(provider: &P) -> Self {
        Self::from_stream(provider.subscribe_session())
    }

    /// Mirror an already-open session stream.
    pub fn from_stream(mut rx: mpsc::UnboundedReceiver<Option<AuthSession>>) -> Self {
        let state = Arc::new(Mutex::new(SessionSnapshot::default()));
        let shared = Arc::clone(&state);
        let task = tokio::spawn(async move {
            while let Some(session) = rx.recv().await {
                match &session {
                    Some(s) => tracing::debug!(email = %s.email, "session established"),
                    None => tracing::debug!("session cleared"),
                }
                let mut snapshot = shared.lock().unwrap();
                snapshot.loading = false;
                snapshot.session = session;
            }
        });
        Self { state, task }
    }

    /// The latest session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().unwrap().clone()
    }
}

impl Drop for SessionObserver {
    fn drop(&mut self) {
        self.task.abort();
    }
}
