//! # Auth core for the Nexus gaming portal
//!
//! Email one-time-passcode signup verification and the login/session state
//! machine, written against injected collaborator traits so every flow runs
//! in process under test.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`controller`] | The login/signup/verify state machine, form state, resend cooldown |
//! | [`otp`] | Passcode issuance, persistence, expiry, and verification over the keyed store |
//! | [`provider`] | Identity-provider trait, failure codes, in-memory implementation |
//! | [`observer`] | Mirrors the provider session stream into a readable snapshot |
//! | [`notify`] | Out-of-band passcode delivery seam |
//! | [`error`] | Failure taxonomy and user-facing message mapping |
//! | [`models`] | Session model shared across modules |
//! | [`games`] | Game records on the landing page (create, list, live watch) |
//! | [`settings`] | Provider connection settings from env/file |
//! | [`clock`] | Injectable time source |
//!
//! Data flow: UI intent → [`controller::AuthController`] → ([`otp::OtpStore`]
//! | provider) → message mapping on failure → form-state update. The
//! [`observer::SessionObserver`] runs independently and can change the
//! visible session at any time, including mid-flow.

pub mod clock;
pub mod controller;
pub mod error;
pub mod games;
pub mod models;
pub mod notify;
pub mod observer;
pub mod otp;
pub mod provider;
pub mod settings;

pub use clock::{Clock, SystemClock};
pub use controller::{AuthController, AuthFormState, AuthMode, AuthPhase, RESEND_COOLDOWN_SECS};
pub use error::AuthError;
pub use models::AuthSession;
pub use notify::{LogNotifier, Notifier};
pub use observer::{SessionObserver, SessionSnapshot};
pub use otp::{OtpRecord, OtpStore, VerifyOutcome};
pub use provider::{IdentityProvider, InMemoryIdentity, ProviderError};
pub use settings::ProviderSettings;
