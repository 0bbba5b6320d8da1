//! Dashboard controller.
//!
//! Owns the working set of QR codes and every action the dashboard screen
//! can take on it. All mutations go through `&mut self`; the push
//! subscription only hands messages back to the owner via
//! [`Dashboard::apply_push`], so no locking is involved.
//!
//! Rename and delete are apply-after-confirm: the working set only changes
//! once the server has accepted the request. Failures never retry; they
//! raise a notice and leave the state as it was.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use qrtrack_core::edit::EditSlot;
use qrtrack_core::error::CoreError;
use qrtrack_core::generate::GenerateForm;
use qrtrack_core::notice::{self, Notice};
use qrtrack_core::screen::Screen;
use qrtrack_core::types::DbId;
use qrtrack_core::working_set::{DashboardStats, WorkingSet};
use tokio::sync::mpsc;

use crate::api::{ApiError, QrTrackerApi};
use crate::client::PushClient;
use crate::download::save_image;
use crate::events::PushMessage;
use crate::notices::Notifier;
use crate::reconnect::ReconnectConfig;
use crate::subscription::PushSubscription;

pub struct Dashboard {
    api: Arc<QrTrackerApi>,
    notices: Notifier,
    codes: WorkingSet,
    edit: EditSlot,
    form: GenerateForm,
    download_dir: PathBuf,
    push: Option<PushSubscription>,
}

impl Dashboard {
    pub fn new(api: Arc<QrTrackerApi>, notices: Notifier, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            notices,
            codes: WorkingSet::new(),
            edit: EditSlot::new(),
            form: GenerateForm::new(),
            download_dir: download_dir.into(),
            push: None,
        }
    }

    pub fn codes(&self) -> &WorkingSet {
        &self.codes
    }

    pub fn stats(&self) -> DashboardStats {
        self.codes.stats()
    }

    pub fn edit_slot(&self) -> &EditSlot {
        &self.edit
    }

    pub fn form(&self) -> &GenerateForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut GenerateForm {
        &mut self.form
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn is_subscribed(&self) -> bool {
        self.push.as_ref().is_some_and(PushSubscription::is_active)
    }

    // ---- list synchronization ----

    /// Fetch the whole collection and replace the working set with it.
    ///
    /// Returns [`Screen::Entry`] when the server refuses the request, which
    /// means the session is no longer valid.
    pub async fn load(&mut self) -> Option<Screen> {
        match self.api.list_qr_codes().await {
            Ok(items) => {
                self.codes.replace_all(items);
                tracing::debug!(count = self.codes.len(), "Loaded QR codes");
                None
            }
            Err(ApiError::Rejected { status, .. }) => {
                tracing::info!(status, "Collection fetch refused, session is gone");
                Some(Screen::Entry)
            }
            Err(e @ ApiError::Connection(_)) => {
                tracing::warn!(error = %e, "Collection fetch failed");
                self.notices.notify(Notice::connection_failed());
                None
            }
        }
    }

    /// Start the live subscription, replacing any previous one.
    ///
    /// The caller drains the returned receiver and passes each message to
    /// [`Dashboard::apply_push`].
    pub fn subscribe(
        &mut self,
        client: PushClient,
        reconnect: ReconnectConfig,
    ) -> mpsc::Receiver<PushMessage> {
        let (subscription, rx) = PushSubscription::start(client, reconnect);
        self.push = Some(subscription);
        rx
    }

    /// Apply one message from the push subscription.
    ///
    /// Returns `true` when the working set changed. Messages arriving after
    /// [`Dashboard::unmount`] are dropped.
    pub fn apply_push(&mut self, message: PushMessage) -> bool {
        if self.push.is_none() {
            tracing::trace!(?message, "Dropping push message after teardown");
            return false;
        }

        match message {
            PushMessage::ScanUpdate(update) => {
                let applied = self.codes.apply_scan_update(&update);
                if !applied {
                    tracing::debug!(id = update.id, "Scan update for unknown QR code");
                }
                applied
            }
            PushMessage::Connected { sid } => {
                tracing::info!(sid = %sid, "Live updates connected");
                false
            }
            PushMessage::Disconnected => {
                tracing::info!("Live updates disconnected");
                false
            }
        }
    }

    /// Tear the push subscription down.
    pub async fn unmount(&mut self) {
        if let Some(subscription) = self.push.take() {
            subscription.shutdown().await;
        }
    }

    // ---- actions ----

    /// Submit the generate form and re-fetch the collection on success.
    ///
    /// Returns a navigation target only if the re-fetch finds the session
    /// gone.
    pub async fn generate(&mut self) -> Option<Screen> {
        let request = match self.form.begin_submit() {
            Ok(request) => request,
            Err(e) => {
                self.notices.notify(Notice::error(e.to_string()));
                return None;
            }
        };

        match self.api.generate(&request).await {
            Ok(response) => {
                tracing::info!(url = %request.url, count = response.count, "Generated QR codes");
                self.notices.notify(Notice::generated(response.count));
                self.form.finish_submit(true);
                self.load().await
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "Generate failed");
                self.notices
                    .notify(failure_notice(&e, notice::GENERATE_FAILED));
                self.form.finish_submit(false);
                None
            }
        }
    }

    /// Enter edit mode for `id`, seeded with its current display name.
    pub fn begin_edit(&mut self, id: DbId) -> Result<(), CoreError> {
        let seed = self
            .codes
            .get(id)
            .map(|qr| qr.display_name().to_string())
            .ok_or(CoreError::NotFound {
                entity: "qr_code",
                id,
            })?;
        self.edit.begin(id, seed);
        Ok(())
    }

    pub fn set_edit_text(&mut self, text: impl Into<String>) -> Result<(), CoreError> {
        self.edit.set_text(text)
    }

    pub fn cancel_edit(&mut self) {
        self.edit.cancel();
    }

    /// Send the open draft to the server.
    ///
    /// On success the label is applied locally and edit mode closes. On
    /// failure the draft stays open with the typed value intact.
    pub async fn save_edit(&mut self) -> bool {
        let Some(draft) = self.edit.draft().cloned() else {
            self.notices
                .notify(Notice::error("No QR code is being edited"));
            return false;
        };

        match self.api.rename(draft.id, &draft.text).await {
            Ok(()) => {
                if let Err(e) = self.codes.rename(draft.id, draft.text.clone()) {
                    tracing::debug!(error = %e, "Renamed code is no longer listed");
                }
                self.edit.cancel_if(draft.id);
                tracing::info!(id = draft.id, "Renamed QR code");
                self.notices.notify(Notice::success(notice::RENAME_SUCCEEDED));
                true
            }
            Err(e) => {
                tracing::warn!(id = draft.id, error = %e, "Rename failed");
                self.notices.notify(failure_notice(&e, notice::RENAME_FAILED));
                false
            }
        }
    }

    /// Open edit mode on `id`, type `label`, and save in one step.
    pub async fn rename(&mut self, id: DbId, label: impl Into<String>) -> bool {
        if let Err(e) = self.begin_edit(id) {
            self.notices.notify(Notice::error(e.to_string()));
            return false;
        }
        if let Err(e) = self.edit.set_text(label) {
            self.notices.notify(Notice::error(e.to_string()));
            return false;
        }
        self.save_edit().await
    }

    /// Delete `id` on the server, then drop it from the working set.
    pub async fn delete(&mut self, id: DbId) -> bool {
        match self.api.delete(id).await {
            Ok(()) => {
                self.codes.remove(id);
                self.edit.cancel_if(id);
                tracing::info!(id, "Deleted QR code");
                self.notices.notify(Notice::success(notice::DELETE_SUCCEEDED));
                true
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "Delete failed");
                self.notices.notify(failure_notice(&e, notice::DELETE_FAILED));
                false
            }
        }
    }

    /// Save the rendered image of `id` into the download directory.
    pub async fn download(&mut self, id: DbId) -> Option<PathBuf> {
        let Some(qr) = self.codes.get(id).cloned() else {
            self.notices.notify(Notice::error(
                CoreError::NotFound {
                    entity: "qr_code",
                    id,
                }
                .to_string(),
            ));
            return None;
        };

        let bytes = match self.api.fetch_image(&qr).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(id, error = %e, "Image fetch failed");
                self.notices.notify(Notice::error(notice::DOWNLOAD_FAILED));
                return None;
            }
        };

        match save_image(&self.download_dir, &qr.filename, &bytes).await {
            Ok(path) => {
                tracing::info!(id, path = %path.display(), "Saved QR image");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "Saving image failed");
                self.notices.notify(Notice::error(notice::DOWNLOAD_FAILED));
                None
            }
        }
    }

    /// End the session. Always lands on the entry screen, whatever the
    /// server answered.
    pub async fn logout(&mut self) -> Screen {
        if let Err(e) = self.api.logout().await {
            tracing::warn!(error = %e, "Logout request failed");
        }
        self.unmount().await;
        self.codes = WorkingSet::new();
        self.edit.cancel();
        self.form.reset();
        Screen::Entry
    }
}

/// A rejected request gets the action's own message; a connection failure
/// the generic one.
fn failure_notice(error: &ApiError, rejected: &str) -> Notice {
    match error {
        ApiError::Rejected { .. } => Notice::error(rejected),
        ApiError::Connection(_) => Notice::connection_failed(),
    }
}
