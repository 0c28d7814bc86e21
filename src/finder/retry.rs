//! Rate-limit aware retry
//!
//! Wraps a remote call and retries it for as long as the remote answers
//! with [`GolicenseError::RateLimited`]. Each rejection waits out the
//! reported window, racing the run's [`Cancellation`]. There is no attempt
//! cap: rate-limit windows are bounded, so the request eventually goes
//! through. Every other outcome is returned as is.

use crate::engine::Cancellation;
use crate::license::{update_status, StatusKind, StatusListener};
use crate::{GolicenseError, GolicenseResult};
use std::future::Future;
use std::time::Duration;

pub struct RateLimitRetry<'a> {
    /// Provider name used in status messages
    provider: &'a str,
    cancel: &'a Cancellation,
    status: Option<&'a dyn StatusListener>,
}

impl<'a> RateLimitRetry<'a> {
    pub fn new(provider: &'a str, cancel: &'a Cancellation, status: Option<&'a dyn StatusListener>) -> Self {
        Self {
            provider,
            cancel,
            status,
        }
    }

    /// Whether `err` asks the caller to wait and try again.
    pub fn should_retry(err: &GolicenseError) -> Option<Duration> {
        match err {
            GolicenseError::RateLimited { wait } => Some(*wait),
            _ => None,
        }
    }

    /// Run `op` until it produces something other than a rate-limit
    /// rejection, or the run is cancelled while waiting.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> GolicenseResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GolicenseResult<T>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            update_status(self.status, StatusKind::Normal, "querying license");

            let err = match op().await {
                Err(e) => e,
                ok => return ok,
            };
            let Some(wait) = Self::should_retry(&err) else {
                return Err(err);
            };

            tracing::warn!(
                attempt,
                "rate limited by {}, waiting {:?}",
                self.provider,
                wait
            );
            update_status(
                self.status,
                StatusKind::Warning,
                &format!("rate limited by {}, waiting {}", self.provider, format_wait(wait)),
            );

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(GolicenseError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}

/// `1h2m3s` style rendering of a wait.
pub fn format_wait(wait: Duration) -> String {
    let secs = wait.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) if secs == 0 => format!("{}ms", wait.as_millis()),
        (0, 0) => format!("{}s", s),
        (0, _) => format!("{}m{}s", m, s),
        _ => format!("{}h{}m{}s", h, m, s),
    }
}
