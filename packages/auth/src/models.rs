//! Session model mirrored from the identity provider.

use serde::{Deserialize, Serialize};

/// The provider-issued proof of an authenticated identity.
///
/// At most one session is active per client; it is created on sign-in or
/// sign-up and destroyed on sign-out or provider-side invalidation. The core
/// only ever reads it — the provider owns the lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    /// Opaque stable identifier for the account.
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl AuthSession {
    /// Get the display name, falling back to the local part of the email if
    /// it was never set.
    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .unwrap_or_else(|| local_part(&self.email))
    }
}

/// The part of an email address before the `@`.
pub fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}
