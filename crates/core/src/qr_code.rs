//! The QR entity as projected to the client, plus the push patch that
//! updates its scan counter.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Path under the API base where rendered QR images are served.
pub const STATIC_QR_PATH: &str = "/static/qrs";

/// Path prefix the server uses for the scan-and-redirect endpoint.
pub const REDIRECT_PATH: &str = "/r";

/// A tracked QR code as returned by `GET /api/qrcodes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrCode {
    /// Server-assigned identifier. Never constructed client-side.
    pub id: DbId,
    /// Target the code redirects to.
    pub original_url: String,
    /// Short token embedded in the redirect path.
    pub redirect_id: String,
    /// Image file name under [`STATIC_QR_PATH`].
    pub filename: String,
    #[serde(default)]
    pub scan_count: u64,
    #[serde(default)]
    pub custom_name: Option<String>,
}

impl QrCode {
    /// The label shown for this code: the custom name when it is set and
    /// non-empty, otherwise the redirect token.
    pub fn display_name(&self) -> &str {
        match self.custom_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.redirect_id,
        }
    }

    /// Path of the rendered image relative to the API base.
    pub fn image_path(&self) -> String {
        format!("{STATIC_QR_PATH}/{}", self.filename)
    }

    /// Path a scanner hits, relative to the server's public base.
    pub fn redirect_path(&self) -> String {
        format!("{REDIRECT_PATH}/{}", self.redirect_id)
    }
}

/// Payload of a `scan_update` push event.
///
/// Carries the authoritative counter, not a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanUpdate {
    pub id: DbId,
    pub scan_count: u64,
}
