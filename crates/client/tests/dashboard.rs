//! End-to-end tests for the `Dashboard` controller against the mock
//! back-end: loading, live updates, and every action's success and
//! failure paths.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use qrtrack_client::client::PushClient;
use qrtrack_client::dashboard::Dashboard;
use qrtrack_client::events::PushMessage;
use qrtrack_client::notices::Notifier;
use qrtrack_client::reconnect::ReconnectConfig;
use qrtrack_core::notice::{self, Notice};
use qrtrack_core::qr_code::ScanUpdate;
use qrtrack_core::screen::Screen;
use tokio::sync::mpsc;

use common::{qr, Action, MockBackend, IMAGE_BYTES};

struct Harness {
    backend: MockBackend,
    dashboard: Dashboard,
    notices: mpsc::UnboundedReceiver<Notice>,
    _download_dir: tempfile::TempDir,
}

impl Harness {
    /// Logged-in dashboard over the scenario collection `[2, 1]`, loaded.
    async fn loaded() -> Self {
        let backend = MockBackend::start().await;
        backend.seed(vec![qr(2, "bbbb2222", 5), qr(1, "aaaa1111", 3)]);
        let api = backend.logged_in_api().await;
        let (notifier, notices) = Notifier::channel();
        let download_dir = tempfile::tempdir().unwrap();
        let mut dashboard = Dashboard::new(api, notifier, download_dir.path().join("qrs"));

        assert!(dashboard.load().await.is_none());

        Self {
            backend,
            dashboard,
            notices,
            _download_dir: download_dir,
        }
    }

    fn last_notice(&mut self) -> Notice {
        let mut last = None;
        while let Ok(notice) = self.notices.try_recv() {
            last = Some(notice);
        }
        last.expect("no notice raised")
    }
}

async fn next_message(rx: &mut mpsc::Receiver<PushMessage>) -> PushMessage {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a push message")
        .expect("push channel closed")
}

// ---------------------------------------------------------------------------
// Test: load sorts by id and derives the stats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_sorts_by_id() {
    let h = Harness::loaded().await;

    assert_eq!(h.dashboard.codes().ids(), vec![1, 2]);
    let stats = h.dashboard.stats();
    assert_eq!(stats.active_links, 2);
    assert_eq!(stats.total_scans, 8);
}

// ---------------------------------------------------------------------------
// Test: load without a session navigates to the entry screen
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_without_session_goes_to_entry() {
    let backend = MockBackend::start().await;
    let (notifier, mut notices) = Notifier::channel();
    let mut dashboard = Dashboard::new(backend.api(), notifier, ".");

    assert_eq!(dashboard.load().await, Some(Screen::Entry));
    assert!(notices.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Test: live scan updates patch the counter of the matching entity only
// ---------------------------------------------------------------------------

#[tokio::test]
async fn push_overwrites_matching_counter() {
    let mut h = Harness::loaded().await;
    let mut rx = h.dashboard.subscribe(
        PushClient::new(h.backend.push_url()),
        ReconnectConfig::default(),
    );

    let connected = next_message(&mut rx).await;
    assert!(!h.dashboard.apply_push(connected));

    h.backend.push_scan(ScanUpdate {
        id: 1,
        scan_count: 9,
    });
    let message = next_message(&mut rx).await;
    assert!(h.dashboard.apply_push(message));

    assert_eq!(h.dashboard.codes().get(1).unwrap().scan_count, 9);
    assert_eq!(h.dashboard.codes().get(2).unwrap().scan_count, 5);

    // Unknown ids leave the set untouched.
    h.backend.push_scan(ScanUpdate {
        id: 77,
        scan_count: 1,
    });
    let message = next_message(&mut rx).await;
    assert!(!h.dashboard.apply_push(message));
    assert_eq!(h.dashboard.stats().total_scans, 14);

    h.dashboard.unmount().await;
}

// ---------------------------------------------------------------------------
// Test: a real scan reaches the dashboard through the push channel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn redirect_scan_reaches_dashboard() {
    let mut h = Harness::loaded().await;
    let mut rx = h.dashboard.subscribe(
        PushClient::new(h.backend.push_url()),
        ReconnectConfig::default(),
    );
    next_message(&mut rx).await;

    h.backend.record_scan("bbbb2222").unwrap();
    let message = next_message(&mut rx).await;
    h.dashboard.apply_push(message);

    assert_eq!(h.dashboard.codes().get(2).unwrap().scan_count, 6);
    h.dashboard.unmount().await;
}

// ---------------------------------------------------------------------------
// Test: messages after unmount are ignored
// ---------------------------------------------------------------------------

#[tokio::test]
async fn push_after_unmount_is_ignored() {
    let mut h = Harness::loaded().await;
    let _rx = h.dashboard.subscribe(
        PushClient::new(h.backend.push_url()),
        ReconnectConfig::default(),
    );

    h.dashboard.unmount().await;
    assert!(!h.dashboard.is_subscribed());

    let changed = h.dashboard.apply_push(PushMessage::ScanUpdate(ScanUpdate {
        id: 1,
        scan_count: 100,
    }));
    assert!(!changed);
    assert_eq!(h.dashboard.codes().get(1).unwrap().scan_count, 3);
}

// ---------------------------------------------------------------------------
// Test: successful generate resets the form and re-fetches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_resets_form_and_refetches() {
    let mut h = Harness::loaded().await;
    let fetches = h.backend.list_requests();

    h.dashboard.form_mut().url = "https://x.com".into();
    h.dashboard.form_mut().count = 3;
    assert!(h.dashboard.generate().await.is_none());

    assert_eq!(h.last_notice().description, "Generated 3 QR code(s)!");
    assert_eq!(h.dashboard.form().url, "");
    assert_eq!(h.dashboard.form().count, 1);
    assert!(!h.dashboard.form().is_submitting());
    assert_eq!(h.backend.list_requests(), fetches + 1);
    assert_eq!(h.dashboard.codes().len(), 5);
    assert_eq!(h.dashboard.codes().ids(), vec![1, 2, 3, 4, 5]);
}

// ---------------------------------------------------------------------------
// Test: a generate answered with a bare "OK" is still a success
// ---------------------------------------------------------------------------

#[tokio::test]
async fn plain_ok_generate_is_success() {
    let mut h = Harness::loaded().await;
    h.backend.set_plain_generate_reply(true);
    let fetches = h.backend.list_requests();

    h.dashboard.form_mut().url = "https://x.com".into();
    h.dashboard.form_mut().count = 3;
    assert!(h.dashboard.generate().await.is_none());

    let raised = h.last_notice();
    assert!(!raised.is_error());
    assert_eq!(raised.description, "Generated 3 QR code(s)!");
    assert_eq!(h.dashboard.form().url, "");
    assert_eq!(h.dashboard.form().count, 1);
    assert_eq!(h.backend.list_requests(), fetches + 1);
    assert_eq!(h.dashboard.codes().len(), 5);
}

// ---------------------------------------------------------------------------
// Test: failed generate keeps the inputs and the working set
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_generate_keeps_state() {
    let mut h = Harness::loaded().await;
    h.backend.set_failing(Action::Generate, true);
    let fetches = h.backend.list_requests();

    h.dashboard.form_mut().url = "https://x.com".into();
    h.dashboard.form_mut().count = 3;
    h.dashboard.generate().await;

    let raised = h.last_notice();
    assert!(raised.is_error());
    assert_eq!(raised.description, notice::GENERATE_FAILED);
    assert_eq!(h.dashboard.form().url, "https://x.com");
    assert_eq!(h.dashboard.form().count, 3);
    assert_eq!(h.backend.list_requests(), fetches);
    assert_eq!(h.dashboard.codes().len(), 2);
}

// ---------------------------------------------------------------------------
// Test: successful rename applies the label and exits edit mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rename_applies_after_confirm() {
    let mut h = Harness::loaded().await;

    h.dashboard.begin_edit(1).unwrap();
    assert_eq!(h.dashboard.edit_slot().draft().unwrap().text, "aaaa1111");
    h.dashboard.set_edit_text("Menu card").unwrap();
    assert!(h.dashboard.save_edit().await);

    assert_eq!(h.dashboard.codes().get(1).unwrap().display_name(), "Menu card");
    assert_eq!(h.dashboard.codes().get(2).unwrap().custom_name, None);
    assert!(h.dashboard.edit_slot().editing_id().is_none());
    assert_eq!(h.last_notice().description, notice::RENAME_SUCCEEDED);
}

// ---------------------------------------------------------------------------
// Test: failed rename keeps the draft open and the set unchanged
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_rename_keeps_draft() {
    let mut h = Harness::loaded().await;
    h.backend.set_failing(Action::Rename, true);
    let before = h.dashboard.codes().clone();

    assert!(!h.dashboard.rename(1, "Menu card").await);

    assert_eq!(h.dashboard.codes(), &before);
    let draft = h.dashboard.edit_slot().draft().unwrap();
    assert_eq!(draft.id, 1);
    assert_eq!(draft.text, "Menu card");
    assert_eq!(h.last_notice().description, notice::RENAME_FAILED);
}

// ---------------------------------------------------------------------------
// Test: delete removes the entity and clears its edit mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_removes_entity() {
    let mut h = Harness::loaded().await;
    h.dashboard.begin_edit(2).unwrap();

    assert!(h.dashboard.delete(2).await);

    assert_eq!(h.dashboard.codes().ids(), vec![1]);
    assert!(h.dashboard.edit_slot().editing_id().is_none());
    assert_eq!(h.last_notice().description, notice::DELETE_SUCCEEDED);
}

// ---------------------------------------------------------------------------
// Test: failed delete leaves the entity in place
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_delete_keeps_entity() {
    let mut h = Harness::loaded().await;
    h.backend.set_failing(Action::Delete, true);

    assert!(!h.dashboard.delete(1).await);

    assert_eq!(h.dashboard.codes().len(), 2);
    assert_eq!(h.last_notice().description, notice::DELETE_FAILED);
}

// ---------------------------------------------------------------------------
// Test: download writes the image under its server file name
// ---------------------------------------------------------------------------

#[tokio::test]
async fn download_writes_image() {
    let mut h = Harness::loaded().await;

    let path = h.dashboard.download(1).await.unwrap();

    assert_eq!(path.file_name().unwrap(), "aaaa1111.png");
    assert_eq!(std::fs::read(&path).unwrap(), IMAGE_BYTES);
}

// ---------------------------------------------------------------------------
// Test: download of an id that vanished server-side fails with a notice
// ---------------------------------------------------------------------------

#[tokio::test]
async fn download_missing_image_fails() {
    let mut h = Harness::loaded().await;
    h.backend.seed(vec![qr(1, "aaaa1111", 3)]);

    assert!(h.dashboard.download(2).await.is_none());
    assert_eq!(h.last_notice().description, notice::DOWNLOAD_FAILED);
}

// ---------------------------------------------------------------------------
// Test: logout always lands on the entry screen and tears down the push
// ---------------------------------------------------------------------------

#[tokio::test]
async fn logout_tears_down_even_on_failure() {
    let mut h = Harness::loaded().await;
    h.backend.set_failing(Action::Logout, true);
    let mut rx = h.dashboard.subscribe(
        PushClient::new(h.backend.push_url()),
        ReconnectConfig::default(),
    );
    next_message(&mut rx).await;

    assert_eq!(h.dashboard.logout().await, Screen::Entry);

    assert!(!h.dashboard.is_subscribed());
    assert!(h.dashboard.codes().is_empty());
    let closed = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap();
    assert_matches!(closed, None);
}
