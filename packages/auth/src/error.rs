//! # Error taxonomy and user-facing message mapping
//!
//! Four failure classes flow through the core:
//!
//! - **Validation** — caught locally before any network call (empty fields,
//!   password mismatch, malformed code).
//! - **Provider** — identity-provider failure codes, mapped to copy by
//!   [`message_for_provider`].
//! - **Otp** — verification outcomes that are not `Valid`.
//! - **Infrastructure** — the backend is unreachable or unconfigured at
//!   startup; this disables the whole auth surface rather than surfacing per
//!   operation (see [`crate::settings`]).
//!
//! Provider and OTP errors never propagate past the controller: they are
//! converted to exactly one human-readable string on the form state. The
//! mapping functions here are pure and total — unknown provider codes fall
//! through to a generic message instead of disappearing.

use crate::otp::VerifyOutcome;
use crate::provider::ProviderError;

/// A failure at the auth-core boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("otp verification failed")]
    Otp(VerifyOutcome),
    #[error("infrastructure unavailable: {0}")]
    Infrastructure(String),
}

impl AuthError {
    /// The single string shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(msg) => (*msg).to_string(),
            AuthError::Provider(err) => message_for_provider(err).to_string(),
            AuthError::Otp(outcome) => message_for_otp(*outcome).to_string(),
            AuthError::Infrastructure(_) => {
                "The portal backend is unavailable. Please try again later.".to_string()
            }
        }
    }
}

impl From<crate::settings::SettingsError> for AuthError {
    fn from(err: crate::settings::SettingsError) -> Self {
        AuthError::Infrastructure(err.to_string())
    }
}

/// Fallback shown for any failure without a more specific mapping.
pub const GENERIC_ERROR: &str = "An error occurred. Please try again.";

/// Map a provider failure code to its user-facing message.
pub fn message_for_provider(err: &ProviderError) -> &'static str {
    match err {
        ProviderError::EmailAlreadyInUse => {
            "This email is already registered. Please use login instead."
        }
        ProviderError::WeakPassword => {
            "Password is too weak. Please use at least 6 characters."
        }
        ProviderError::InvalidEmail => "Please enter a valid email address.",
        ProviderError::UserNotFound => {
            "No account found with this email. Please sign up first."
        }
        ProviderError::WrongPassword => "Incorrect password. Please try again.",
        ProviderError::TooManyRequests => {
            "Too many failed attempts. Please try again later."
        }
        ProviderError::NetworkRequestFailed => {
            "Network error. Please check your connection."
        }
        ProviderError::Other(_) => GENERIC_ERROR,
    }
}

/// Map a failed verification outcome to its user-facing message.
///
/// `Valid` has no message; callers only reach here on failure, but the
/// function stays total rather than panicking.
pub fn message_for_otp(outcome: VerifyOutcome) -> &'static str {
    match outcome {
        VerifyOutcome::Expired => "OTP has expired. Please request a new one.",
        VerifyOutcome::Mismatch => "Invalid OTP. Please check and try again.",
        VerifyOutcome::NotFound => {
            "OTP has expired or is invalid. Please request a new one."
        }
        VerifyOutcome::Valid => GENERIC_ERROR,
    }
}
