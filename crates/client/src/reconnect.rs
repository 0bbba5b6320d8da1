//! Retry schedule for re-establishing the push channel.
//!
//! [`reconnect_loop`] dials immediately, then waits out each delay of a
//! [`Backoff`] schedule between failed attempts. It gives up only when the
//! subscription's token is cancelled.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::{PushClient, PushConnection};

#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Wait after the first failed attempt.
    pub initial_delay: Duration,
    /// Ceiling for every later wait.
    pub max_delay: Duration,
    /// Growth factor applied after each failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// The endless sequence of waits this config produces.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            next: self.initial_delay.min(self.max_delay),
            max: self.max_delay,
            multiplier: self.multiplier,
        }
    }
}

/// Exponential delays, clamped to a ceiling. Never ends.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    multiplier: f64,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        let grown = current.as_secs_f64() * self.multiplier;
        self.next = if grown.is_finite() && grown >= 0.0 {
            Duration::from_secs_f64(grown.min(self.max.as_secs_f64()))
        } else {
            self.max
        };
        Some(current)
    }
}

/// Keep dialing until a connection is up or `cancel` fires.
pub async fn reconnect_loop(
    client: &PushClient,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
) -> Option<PushConnection> {
    for (attempt, delay) in (1u32..).zip(config.backoff()) {
        let result = tokio::select! {
            _ = cancel.cancelled() => return None,
            result = client.connect() => result,
        };

        match result {
            Ok(conn) => {
                tracing::info!(attempt, sid = %conn.sid, "Push channel up");
                return Some(conn);
            }
            Err(e) => {
                tracing::warn!(
                    push_url = %client.push_url(),
                    attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %e,
                    "Push reconnect failed",
                );
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }
    }
    None
}
