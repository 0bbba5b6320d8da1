//! REST API client for the QR Tracker HTTP endpoints.
//!
//! Wraps login, registration, the QR collection, generation, renaming,
//! deletion, and static image retrieval using [`reqwest`]. Requests are
//! form-encoded and authenticated by the session cookie the server sets on
//! login, so the underlying client keeps a cookie jar.

use qrtrack_core::credentials::Credentials;
use qrtrack_core::generate::GenerateRequest;
use qrtrack_core::qr_code::QrCode;
use qrtrack_core::types::DbId;
use serde::Deserialize;

/// HTTP client for one QR Tracker back-end.
pub struct QrTrackerApi {
    client: reqwest::Client,
    api_url: String,
}

/// Outcome of `POST /generate_qrs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateResponse {
    /// Number of codes created: the server's `count` when its body carries
    /// one, otherwise the number requested.
    pub count: u32,
}

/// Optional JSON body of a successful generate.
#[derive(Debug, Deserialize)]
struct GenerateBody {
    count: Option<u32>,
}

/// Response of `GET /me`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SessionStatus {
    pub logged_in: bool,
}

/// Error body shape used by the back-end (`{"message": ..}` or `{"error": ..}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Errors from the QR Tracker REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not complete (network, DNS, TLS, unreadable body).
    #[error("HTTP request failed: {0}")]
    Connection(#[from] reqwest::Error),

    /// The server answered with a non-2xx status code.
    #[error("QR Tracker API error ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, or the raw body when it had none.
        message: String,
    },
}

impl ApiError {
    pub fn is_rejected(&self) -> bool {
        matches!(self, ApiError::Rejected { .. })
    }

    /// Status code of a rejected request.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Connection(_) => None,
        }
    }

    /// The server's explanation of a rejected request, if it gave one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

impl QrTrackerApi {
    /// Create a new API client with its own cookie jar.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://localhost:5000`.
    pub fn new(api_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(client, api_url))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    ///
    /// The client must have a cookie store enabled for session-bound
    /// endpoints to work.
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    /// Base HTTP URL without a trailing slash.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Absolute URL of a code's rendered image.
    pub fn image_url(&self, qr: &QrCode) -> String {
        self.url(&qr.image_path())
    }

    /// Start a session. Sends `POST /login`; the session cookie from the
    /// response is kept in the client's jar.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/login"))
            .form(credentials)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Create an account. Sends `POST /register`.
    pub async fn register(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/register"))
            .form(credentials)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// End the session. Sends `GET /logout`.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let response = self.client.get(self.url("/logout")).send().await?;

        Self::check_status(response).await
    }

    /// Ask whether the cookie jar holds a live session. Sends `GET /me`.
    pub async fn session_status(&self) -> Result<SessionStatus, ApiError> {
        let response = self.client.get(self.url("/me")).send().await?;

        Self::parse_response(response).await
    }

    /// Fetch every QR code owned by the session's account.
    ///
    /// Sends `GET /api/qrcodes`. The server does not guarantee any order.
    pub async fn list_qr_codes(&self) -> Result<Vec<QrCode>, ApiError> {
        let response = self.client.get(self.url("/api/qrcodes")).send().await?;

        Self::parse_response(response).await
    }

    /// Ask the server to create `request.count` codes for `request.url`.
    ///
    /// Sends `POST /generate_qrs`. Any 2xx status counts as success; the
    /// body is only read for the created count. The new codes' ids and
    /// images are only known after a re-fetch.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/generate_qrs"))
            .form(request)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let body = response.text().await.unwrap_or_default();
        Ok(GenerateResponse {
            count: generated_count(&body, request.count),
        })
    }

    /// Set the custom label of a code. Sends `POST /update_name`.
    pub async fn rename(&self, id: DbId, custom_name: &str) -> Result<(), ApiError> {
        let form = [("qr_id", id.to_string()), ("custom_name", custom_name.to_string())];
        let response = self
            .client
            .post(self.url("/update_name"))
            .form(&form)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Delete a code. Sends `POST /delete_qr`.
    pub async fn delete(&self, id: DbId) -> Result<(), ApiError> {
        let form = [("qr_id", id.to_string())];
        let response = self
            .client
            .post(self.url("/delete_qr"))
            .form(&form)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Download the rendered image of a code.
    pub async fn fetch_image(&self, qr: &QrCode) -> Result<Vec<u8>, ApiError> {
        let response = self.client.get(self.image_url(qr)).send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Rejected`] carrying
    /// the server's message on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

/// The `count` a generate body reports, or `requested` when it has none.
fn generated_count(body: &str, requested: u32) -> u32 {
    serde_json::from_str::<GenerateBody>(body)
        .ok()
        .and_then(|b| b.count)
        .unwrap_or(requested)
}

/// Pull the human-readable reason out of an error body.
fn rejection_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { message: Some(m), .. }) => m,
        Ok(ErrorBody { error: Some(e), .. }) => e,
        _ => body.trim().to_string(),
    }
}
