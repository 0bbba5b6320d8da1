//! Delivery of user-visible notices from controllers to the front-end.

use qrtrack_core::notice::Notice;
use tokio::sync::mpsc;

/// Sending half of the notice channel, cheap to clone into controllers.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl Notifier {
    /// Create a notifier and the receiver the front-end drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Raise a notice. Dropped silently if the front-end is gone.
    pub fn notify(&self, notice: Notice) {
        if notice.is_error() {
            tracing::debug!(title = %notice.title, description = %notice.description, "Error notice");
        }
        let _ = self.tx.send(notice);
    }
}
