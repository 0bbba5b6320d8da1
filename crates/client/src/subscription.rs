//! Live push subscription scoped to a dashboard's lifetime.
//!
//! [`PushSubscription::start`] spawns a long-lived task that connects to
//! the push channel, processes frames, and reconnects with backoff when the
//! connection drops. Everything it learns is delivered as [`PushMessage`]s
//! on an mpsc channel whose receiver belongs to the dashboard.
//!
//! Tearing the subscription down (via [`PushSubscription::shutdown`] or by
//! dropping the handle) cancels the task at its next suspension point.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::PushClient;
use crate::events::PushMessage;
use crate::processor::{forward, process_frames, SessionEnd};
use crate::reconnect::{reconnect_loop, ReconnectConfig};

/// Channel capacity for push messages awaiting the dashboard.
const PUSH_CHANNEL_CAPACITY: usize = 256;

/// How long [`PushSubscription::shutdown`] waits for the task to exit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to a running push subscription.
pub struct PushSubscription {
    cancel: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl PushSubscription {
    /// Spawn the subscription task and return the handle plus the receiving
    /// end of its message channel.
    pub fn start(
        client: PushClient,
        reconnect: ReconnectConfig,
    ) -> (Self, mpsc::Receiver<PushMessage>) {
        let (tx, rx) = mpsc::channel(PUSH_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let task_handle = tokio::spawn(async move {
            tracing::info!(push_url = %client.push_url(), "Starting push subscription");
            run_subscription_loop(&client, &reconnect, &tx, &task_cancel).await;
            tracing::info!("Push subscription exited");
        });

        let subscription = Self {
            cancel,
            task_handle: Some(task_handle),
        };
        (subscription, rx)
    }

    /// Whether the task is still running and has not been cancelled.
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
            && self
                .task_handle
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel the task and wait up to 5 seconds for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.task_handle.take() {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
                tracing::warn!("Push subscription did not stop in time");
            }
        }
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Core loop: connect (with backoff) -> process frames -> repeat.
///
/// Runs until the cancellation token is triggered or the receiver is
/// dropped.
async fn run_subscription_loop(
    client: &PushClient,
    reconnect: &ReconnectConfig,
    tx: &mpsc::Sender<PushMessage>,
    cancel: &CancellationToken,
) {
    loop {
        // Dials at once, then backs off between failed attempts.
        let Some(conn) = reconnect_loop(client, reconnect, cancel).await else {
            return;
        };

        let connected = PushMessage::Connected {
            sid: conn.sid.clone(),
        };
        if forward(tx, connected, cancel).await.is_err() {
            return;
        }

        let heartbeat = conn.handshake.heartbeat_window();
        let mut ws_stream = conn.ws_stream;
        match process_frames(&mut ws_stream, heartbeat, tx, cancel).await {
            SessionEnd::Cancelled | SessionEnd::ReceiverClosed => return,
            SessionEnd::Dropped => {}
        }

        if cancel.is_cancelled()
            || forward(tx, PushMessage::Disconnected, cancel).await.is_err()
        {
            return;
        }

        tracing::info!("Push connection lost, reconnecting");
    }
}
