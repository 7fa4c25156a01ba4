//! Bounded liveness polling.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use ledgerbox_core::RuntimeSettings;

/// Bounded polling wrapper around an externally supplied liveness check.
///
/// The check runs once immediately; when it reports dead, up to
/// `attempts` retries follow, each preceded by an `interval` sleep. The
/// total wait budget is therefore `attempts * interval`.
#[derive(Debug, Clone, Copy)]
pub struct LivenessProbe {
    attempts: u32,
    interval: Duration,
}

impl LivenessProbe {
    /// Create a probe with an explicit retry budget.
    #[must_use]
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Create a probe from configured settings.
    #[must_use]
    pub const fn from_settings(settings: &RuntimeSettings) -> Self {
        Self::new(
            settings.effective_probe_attempts(),
            Duration::from_secs(settings.effective_probe_interval_secs()),
        )
    }

    /// Poll `check` until it reports alive or the retry budget runs out.
    ///
    /// Returns `true` without sleeping when the environment is already
    /// alive.
    pub async fn wait<F, Fut>(&self, check: F) -> bool
    where
        F: Fn() -> Fut,
        Fut: Future<Output = bool>,
    {
        if check().await {
            return true;
        }

        for attempt in 1..=self.attempts {
            sleep(self.interval).await;
            if check().await {
                return true;
            }
            debug!(attempt, attempts = self.attempts, "Liveness retry failed");
        }

        false
    }
}
