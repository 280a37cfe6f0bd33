//! # AuthController — the login/signup/verify state machine
//!
//! Drives every auth flow the portal offers and owns the visible form state:
//!
//! ```text
//! Idle ── submit_login ──► SubmittingLogin ──► signed in (form reset)
//!   │                                    └──► Idle + error
//!   └─ submit_signup ──► AwaitingOtpRequest ── request_otp ──► OtpSent
//!                              ▲                                 │
//!                              │ (Expired / NotFound)            │ verify_otp
//!                              └──────────── Verifying ◄─────────┘
//!                                              │ Valid → account created,
//!                                              │         form reset
//!                                              └ Mismatch / creation failed
//!                                                → OtpSent + error
//! ```
//!
//! The controller is constructed with injected collaborators (identity
//! provider, keyed store behind [`OtpStore`], notifier) and is generic over
//! their traits, so tests run entirely in process.
//!
//! ## Concurrency
//!
//! Flows are serialized by the phase guard: an operation invoked while a
//! conflicting one is in flight is rejected as a no-op, never queued. State
//! is applied in completion order (last writer wins). Closing the modal does
//! not cancel in-flight calls — it bumps a flow epoch, and a completion from
//! an earlier epoch is discarded instead of mutating state that no longer
//! belongs to it.
//!
//! The resend cooldown is a spawned one-second-interval task holding only an
//! atomic counter; it is cancelled whenever the modal opens, closes, or the
//! controller is dropped.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use store::KeyedStore;
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::error::{message_for_otp, message_for_provider};
use crate::models::local_part;
use crate::notify::Notifier;
use crate::observer::{SessionObserver, SessionSnapshot};
use crate::otp::{OtpStore, VerifyOutcome};
use crate::provider::IdentityProvider;

/// Seconds a user must wait between passcode requests.
pub const RESEND_COOLDOWN_SECS: u32 = 60;

/// Which flow the modal was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Signup,
}

/// Where the active flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    Idle,
    /// Signup validated; waiting for the user to ask for a code.
    AwaitingOtpRequest,
    /// A code is out; waiting for the user to type it.
    OtpSent,
    /// A verification round-trip is in flight.
    Verifying,
    /// A login round-trip is in flight.
    SubmittingLogin,
}

/// UI-facing form state. Never persisted; reset whenever the modal opens or
/// closes. Mutated only by the controller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthFormState {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub entered_code: String,
    pub phase: AuthPhase,
    /// At most one message at a time; cleared on the next user action.
    pub error: Option<String>,
    pub cooldown_seconds_remaining: u32,
}

impl AuthFormState {
    fn for_mode(mode: AuthMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// Countdown gating passcode resends.
///
/// `start` spawns a task that decrements the counter once per second;
/// `cancel` aborts it. The handle is owned so teardown cannot leak the
/// recurring callback.
#[derive(Debug, Default)]
struct Cooldown {
    remaining: Arc<AtomicU32>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Cooldown {
    fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::SeqCst)
    }

    fn start(&self, secs: u32) {
        self.cancel();
        self.remaining.store(secs, Ordering::SeqCst);
        let remaining = Arc::clone(&self.remaining);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick of an interval resolves immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let prev = remaining
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1))
                    .unwrap_or(0);
                if prev <= 1 {
                    break;
                }
            }
        });
        *self.task.lock().unwrap() = Some(handle);
    }

    fn cancel(&self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
        }
        self.remaining.store(0, Ordering::SeqCst);
    }
}

impl Drop for Cooldown {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug, Default)]
struct FlowState {
    form: AuthFormState,
    /// Bumped on every modal open/close; completions from an earlier epoch
    /// are discarded.
    epoch: u64,
    /// Guards against overlapping passcode sends.
    otp_sending: bool,
}

/// The auth state machine. See the module docs for the flow diagram.
pub struct AuthController<P, S, N, C>
where
    P: IdentityProvider,
    S: KeyedStore,
    N: Notifier,
    C: Clock,
{
    provider: P,
    otp: OtpStore<S, C>,
    notifier: N,
    observer: SessionObserver,
    state: Mutex<FlowState>,
    cooldown: Cooldown,
}

impl<P, S, N, C> AuthController<P, S, N, C>
where
    P: IdentityProvider,
    S: KeyedStore,
    N: Notifier,
    C: Clock,
{
    /// Build a controller over injected collaborators and start observing
    /// the provider's session stream. Must be called within a tokio runtime.
    pub fn new(provider: P, otp: OtpStore<S, C>, notifier: N) -> Self {
        let observer = SessionObserver::new(&provider);
        Self {
            provider,
            otp,
            notifier,
            observer,
            state: Mutex::new(FlowState::default()),
            cooldown: Cooldown::default(),
        }
    }

    /// Snapshot of the form state, including the live cooldown counter.
    pub fn form(&self) -> AuthFormState {
        let mut form = self.state.lock().unwrap().form.clone();
        form.cooldown_seconds_remaining = self.cooldown.remaining();
        form
    }

    /// Latest mirrored session state.
    pub fn session(&self) -> SessionSnapshot {
        self.observer.snapshot()
    }

    /// Open the auth modal for `mode`, resetting the form.
    pub fn open_modal(&self, mode: AuthMode) {
        let mut state = self.state.lock().unwrap();
        state.epoch += 1;
        state.otp_sending = false;
        state.form = AuthFormState::for_mode(mode);
        self.cooldown.cancel();
    }

    /// Close the modal. In-flight calls are not cancelled; their results are
    /// discarded by the epoch guard when they complete.
    pub fn close_modal(&self) {
        let mut state = self.state.lock().unwrap();
        state.epoch += 1;
        state.otp_sending = false;
        state.form = AuthFormState::default();
        self.cooldown.cancel();
    }

    /// Submit the login form. At most one submission is in flight at a time;
    /// a concurrent call is a no-op.
    pub async fn submit_login(&self, email: &str, password: &str) {
        let epoch = {
            let mut state = self.state.lock().unwrap();
            if state.form.phase != AuthPhase::Idle {
                return;
            }
            state.form.error = None;
            if email.is_empty() || password.is_empty() {
                state.form.error = Some("Please fill in all fields".to_string());
                return;
            }
            state.form.email = email.to_string();
            state.form.phase = AuthPhase::SubmittingLogin;
            state.epoch
        };

        let result = self.provider.sign_in(email, password).await;

        let mut state = self.state.lock().unwrap();
        if state.epoch != epoch {
            tracing::debug!("discarding stale login completion");
            return;
        }
        match result {
            Ok(session) => {
                tracing::info!(email = %session.email, "signed in");
                state.form = AuthFormState::default();
            }
            Err(err) => {
                state.form.error = Some(message_for_provider(&err).to_string());
                state.form.phase = AuthPhase::Idle;
            }
        }
    }

    /// Validate the signup form. No account is created yet: success moves to
    /// [`AuthPhase::AwaitingOtpRequest`] and waits for an explicit
    /// [`request_otp`](Self::request_otp).
    pub fn submit_signup(&self, email: &str, password: &str, confirm_password: &str) {
        let mut state = self.state.lock().unwrap();
        if state.form.phase != AuthPhase::Idle {
            return;
        }
        state.form.error = None;

        if email.is_empty() || password.is_empty() {
            state.form.error = Some("Please fill in all fields".to_string());
            return;
        }
        if password != confirm_password {
            state.form.error = Some("Passwords do not match".to_string());
            return;
        }
        if password.len() < 6 {
            state.form.error = Some("Password must be at least 6 characters".to_string());
            return;
        }

        state.form.mode = AuthMode::Signup;
        state.form.email = email.to_string();
        state.form.password = password.to_string();
        state.form.confirm_password = confirm_password.to_string();
        state.form.phase = AuthPhase::AwaitingOtpRequest;
    }

    /// Issue a passcode for `email` and hand it to the notifier. Rejected
    /// while the cooldown is running or another send is in flight.
    pub async fn request_otp(&self, email: &str) {
        let epoch = {
            let mut state = self.state.lock().unwrap();
            if !matches!(
                state.form.phase,
                AuthPhase::AwaitingOtpRequest | AuthPhase::OtpSent
            ) || state.otp_sending
            {
                return;
            }
            if self.cooldown.remaining() > 0 {
                return;
            }
            state.form.error = None;
            if email.is_empty() {
                state.form.error = Some("Please enter your email address".to_string());
                return;
            }
            state.otp_sending = true;
            state.epoch
        };

        let result = match self.otp.issue(email).await {
            Ok(record) => self
                .notifier
                .deliver(email, &record.otp)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        let mut state = self.state.lock().unwrap();
        if state.epoch != epoch {
            tracing::debug!("discarding stale passcode-send completion");
            return;
        }
        state.otp_sending = false;
        match result {
            Ok(()) => {
                self.cooldown.start(RESEND_COOLDOWN_SECS);
                state.form.phase = AuthPhase::OtpSent;
            }
            Err(reason) => {
                tracing::error!(%reason, "passcode send failed");
                state.form.error = Some("Failed to send OTP. Please try again.".to_string());
            }
        }
    }

    /// Verify the entered code and, if it is valid, create the account.
    pub async fn verify_otp(&self, email: &str, entered_code: &str) {
        let epoch = {
            let mut state = self.state.lock().unwrap();
            if state.form.phase != AuthPhase::OtpSent {
                return;
            }
            state.form.error = None;
            // Malformed codes are rejected without a store round-trip.
            if entered_code.len() != 6 || !entered_code.chars().all(|c| c.is_ascii_digit()) {
                state.form.error = Some("Please enter a valid 6-digit OTP".to_string());
                return;
            }
            state.form.entered_code = entered_code.to_string();
            state.form.phase = AuthPhase::Verifying;
            state.epoch
        };

        let outcome = self.otp.verify(email, entered_code).await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(%err, "otp verification round-trip failed");
                let mut state = self.state.lock().unwrap();
                if state.epoch == epoch {
                    state.form.error =
                        Some("Verification failed. Please try again.".to_string());
                    state.form.phase = AuthPhase::OtpSent;
                }
                return;
            }
        };

        match outcome {
            VerifyOutcome::Valid => self.create_verified_account(email, epoch).await,
            VerifyOutcome::Mismatch => {
                let mut state = self.state.lock().unwrap();
                if state.epoch != epoch {
                    return;
                }
                state.form.error = Some(message_for_otp(outcome).to_string());
                // Record retained; the user may retry within the window.
                state.form.phase = AuthPhase::OtpSent;
            }
            VerifyOutcome::Expired | VerifyOutcome::NotFound => {
                let mut state = self.state.lock().unwrap();
                if state.epoch != epoch {
                    return;
                }
                state.form.error = Some(message_for_otp(outcome).to_string());
                // Back to the pre-send state so the UI re-offers "send code".
                state.form.phase = AuthPhase::AwaitingOtpRequest;
            }
        }
    }

    /// Ownership proven: create the account, set the default display name,
    /// and only then consume the passcode record.
    async fn create_verified_account(&self, email: &str, epoch: u64) {
        let password = {
            let state = self.state.lock().unwrap();
            if state.epoch != epoch {
                return;
            }
            state.form.password.clone()
        };

        match self.provider.create_account(email, &password).await {
            Ok(session) => {
                // Cosmetic default; losing it is not worth failing signup.
                if let Err(err) = self
                    .provider
                    .update_profile(&session.uid, local_part(email))
                    .await
                {
                    tracing::warn!(%err, "display-name update failed");
                }
                // Consume only after the account exists, so a transient
                // creation failure does not destroy the ownership proof.
                if let Err(err) = self.otp.consume(email).await {
                    tracing::warn!(%err, "could not consume passcode record");
                }
                tracing::info!(email = %session.email, "account created");

                let mut state = self.state.lock().unwrap();
                if state.epoch != epoch {
                    return;
                }
                state.form = AuthFormState::default();
                self.cooldown.cancel();
            }
            Err(err) => {
                let mut state = self.state.lock().unwrap();
                if state.epoch != epoch {
                    return;
                }
                // Record deliberately not consumed: the proof outlives one
                // failed creation attempt, until natural expiry.
                state.form.error = Some(message_for_provider(&err).to_string());
                state.form.phase = AuthPhase::OtpSent;
            }
        }
    }

    /// Sign out. Best-effort: failures are logged, never shown.
    pub async fn sign_out(&self) {
        if let Err(err) = self.provider.sign_out().await {
            tracing::warn!(%err, "sign-out failed");
        }
        let mut state = self.state.lock().unwrap();
        state.epoch += 1;
        state.otp_sending = false;
        state.form = AuthFormState::default();
        self.cooldown.cancel();
    }
}
