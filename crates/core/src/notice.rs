//! Transient user-visible notifications ("toasts").

use std::fmt;

use serde::Serialize;

use crate::types::Timestamp;

pub const CONNECTION_FAILED: &str = "Could not connect to server";
pub const LOGIN_SUCCEEDED: &str = "Logged in successfully!";
pub const LOGIN_REJECTED: &str = "Invalid credentials";
pub const REGISTER_SUCCEEDED: &str = "Account created, please sign in";
pub const REGISTER_REJECTED: &str = "Registration failed";
pub const GENERATE_FAILED: &str = "Failed to generate QR codes";
pub const RENAME_SUCCEEDED: &str = "QR name updated";
pub const RENAME_FAILED: &str = "Update failed";
pub const DELETE_SUCCEEDED: &str = "QR code deleted";
pub const DELETE_FAILED: &str = "Failed to delete QR code";
pub const DOWNLOAD_FAILED: &str = "Download failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub raised_at: Timestamp,
}

impl Notice {
    pub fn new(title: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
            raised_at: chrono::Utc::now(),
        }
    }

    pub fn success(description: impl Into<String>) -> Self {
        Self::new("Success", description, Severity::Info)
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self::new("Error", description, Severity::Error)
    }

    pub fn connection_failed() -> Self {
        Self::error(CONNECTION_FAILED)
    }

    /// Notice for a successful generate request of `count` codes.
    pub fn generated(count: u32) -> Self {
        Self::success(format!("Generated {count} QR code(s)!"))
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.title, self.description)
    }
}
