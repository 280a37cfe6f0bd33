//! Provider connection settings.
//!
//! The backend client is configured from named environment values (all
//! prefixed `PORTAL_`), with an optional `portal.toml` file source. Absent
//! values default to the empty string — which a real backend rejects at
//! connection time, so [`ProviderSettings::ensure_configured`] is checked at
//! startup to surface one top-level "provider unavailable" state instead of
//! letting every flow fail with per-operation errors. Callers seeing
//! [`SettingsError::Unconfigured`] must run a degraded, read-only surface.

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] ConfigError),
    /// Mandatory connection values are missing; the auth surface must be
    /// disabled rather than allowed to fail per operation.
    #[error("provider unavailable: missing {0}")]
    Unconfigured(String),
}

/// Connection parameters for the identity provider and keyed store.
#[derive(Debug, Deserialize, Default)]
pub struct ProviderSettings {
    pub api_key: String,
    pub auth_domain: String,
    pub database_url: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
}

impl ProviderSettings {
    /// Load from defaults, then `portal.toml` (if present), then the
    /// environment (`PORTAL_API_KEY`, `PORTAL_AUTH_DOMAIN`, ...).
    pub fn new() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .set_default("api_key", "")?
            .set_default("auth_domain", "")?
            .set_default("database_url", "")?
            .set_default("project_id", "")?
            .set_default("storage_bucket", "")?
            .set_default("messaging_sender_id", "")?
            .set_default("app_id", "")?
            .add_source(
                File::with_name("portal.toml")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix("PORTAL"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Verify the values a backend connection cannot do without.
    pub fn ensure_configured(&self) -> Result<(), SettingsError> {
        let mut missing = Vec::new();
        if self.api_key.is_empty() {
            missing.push("api_key");
        }
        if self.auth_domain.is_empty() {
            missing.push("auth_domain");
        }
        if self.database_url.is_empty() {
            missing.push("database_url");
        }
        if self.project_id.is_empty() {
            missing.push("project_id");
        }
        if self.app_id.is_empty() {
            missing.push("app_id");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SettingsError::Unconfigured(missing.join(", ")))
        }
    }
}
