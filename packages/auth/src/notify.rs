//! Out-of-band passcode delivery.

use std::time::Duration;

/// Delivery failure. What went wrong is channel-specific; the controller
/// only needs to know that the code did not reach the user.
#[derive(Debug, Clone, thiserror::Error)]
#[error("passcode delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Delivers an issued passcode to the user out of band.
///
/// A production implementation wraps a real channel (transactional email,
/// SMS). The controller's contract does not change with the channel.
pub trait Notifier {
    fn deliver(
        &self,
        email: &str,
        code: &str,
    ) -> impl std::future::Future<Output = Result<(), NotifyError>>;
}

/// Demo notifier: logs the code and simulates a one-second delivery delay.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn deliver(&self, email: &str, code: &str) -> Result<(), NotifyError> {
        tracing::info!(email, code, "delivering passcode");
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(())
    }
}
