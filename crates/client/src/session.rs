//! Login and registration controllers.
//!
//! Both screens are a form, a submit, and a navigation or a notice. No
//! session state is held here: the server's cookie lives in the
//! [`QrTrackerApi`] client's jar.

use std::sync::Arc;

use qrtrack_core::credentials::Credentials;
use qrtrack_core::notice::{self, Notice};
use qrtrack_core::screen::Screen;

use crate::api::{ApiError, QrTrackerApi};
use crate::notices::Notifier;

pub struct SessionGate {
    api: Arc<QrTrackerApi>,
    notices: Notifier,
}

impl SessionGate {
    pub fn new(api: Arc<QrTrackerApi>, notices: Notifier) -> Self {
        Self { api, notices }
    }

    /// Submit the login form.
    ///
    /// Returns [`Screen::Dashboard`] on success. Invalid input, a rejected
    /// login, and a connection failure all raise a notice and stay put.
    pub async fn login(&self, email: &str, password: &str) -> Option<Screen> {
        let credentials = self.validated(email, password)?;

        match self.api.login(&credentials).await {
            Ok(()) => {
                tracing::info!(email = %credentials.email, "Logged in");
                self.notices.notify(Notice::success(notice::LOGIN_SUCCEEDED));
                Some(Screen::Dashboard)
            }
            Err(e) => {
                tracing::warn!(email = %credentials.email, error = %e, "Login failed");
                self.notices
                    .notify(failure_notice(&e, notice::LOGIN_REJECTED));
                None
            }
        }
    }

    /// Submit the registration form.
    ///
    /// Returns [`Screen::Entry`] on success so the user can sign in.
    pub async fn register(&self, email: &str, password: &str) -> Option<Screen> {
        let credentials = self.validated(email, password)?;

        match self.api.register(&credentials).await {
            Ok(()) => {
                tracing::info!(email = %credentials.email, "Registered account");
                self.notices
                    .notify(Notice::success(notice::REGISTER_SUCCEEDED));
                Some(Screen::Entry)
            }
            Err(e) => {
                tracing::warn!(email = %credentials.email, error = %e, "Registration failed");
                self.notices
                    .notify(failure_notice(&e, notice::REGISTER_REJECTED));
                None
            }
        }
    }

    /// Skip the login form when the cookie jar already holds a live session.
    pub async fn resume(&self) -> Option<Screen> {
        match self.api.session_status().await {
            Ok(status) if status.logged_in => Some(Screen::Dashboard),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "Session check failed");
                None
            }
        }
    }

    fn validated(&self, email: &str, password: &str) -> Option<Credentials> {
        match Credentials::new(email, password) {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                self.notices.notify(Notice::error(e.to_string()));
                None
            }
        }
    }
}

/// Rejections show the server's reason; connection failures a generic notice.
fn failure_notice(error: &ApiError, fallback: &str) -> Notice {
    match error {
        ApiError::Rejected { .. } => Notice::error(error.server_message().unwrap_or(fallback)),
        ApiError::Connection(_) => Notice::connection_failed(),
    }
}
