use std::path::PathBuf;

use reqwest::Url;

/// API host used when neither `QRTRACK_API_URL` nor `QRTRACK_HOST` is set.
pub const DEFAULT_API_HOST: &str = "localhost";

/// Port the QR Tracker back-end listens on by default.
pub const DEFAULT_API_PORT: u16 = 5000;

/// Client configuration loaded from environment variables.
///
/// All fields have defaults that target a back-end running locally.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the HTTP API, e.g. `http://localhost:5000`.
    pub api_url: Url,
    /// Base URL of the push channel (same host and port, `ws`/`wss` scheme).
    pub push_url: Url,
    /// Directory downloaded QR images are written to.
    pub download_dir: PathBuf,
    /// Optional auto-login email.
    pub email: Option<String>,
    /// Optional auto-login password.
    pub password: Option<String>,
}

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default                               |
    /// |------------------------|---------------------------------------|
    /// | `QRTRACK_API_URL`      | `http://{QRTRACK_HOST}:{QRTRACK_PORT}` |
    /// | `QRTRACK_HOST`         | `localhost`                           |
    /// | `QRTRACK_PORT`         | `5000`                                |
    /// | `QRTRACK_PUSH_URL`     | API URL with a `ws`/`wss` scheme      |
    /// | `QRTRACK_DOWNLOAD_DIR` | `.`                                   |
    /// | `QRTRACK_EMAIL`        | unset                                 |
    /// | `QRTRACK_PASSWORD`     | unset                                 |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = match var("QRTRACK_API_URL") {
            Some(raw) => parse_http_url("QRTRACK_API_URL", &raw)?,
            None => {
                let host = var("QRTRACK_HOST").unwrap_or_else(|| DEFAULT_API_HOST.into());
                let port: u16 = match var("QRTRACK_PORT") {
                    Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                        var: "QRTRACK_PORT",
                        reason: format!("{raw:?} is not a valid port"),
                    })?,
                    None => DEFAULT_API_PORT,
                };
                parse_http_url("QRTRACK_HOST", &format!("http://{}:{port}", host.trim()))?
            }
        };

        let push_url = match var("QRTRACK_PUSH_URL") {
            Some(raw) => parse_ws_url("QRTRACK_PUSH_URL", &raw)?,
            None => derive_push_url(&api_url)?,
        };

        let download_dir = var("QRTRACK_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            api_url,
            push_url,
            download_dir,
            email: var("QRTRACK_EMAIL"),
            password: var("QRTRACK_PASSWORD"),
        })
    }

    /// Configuration pointing at a specific API base, everything else default.
    pub fn for_api_url(api_url: &str) -> Result<Self, ConfigError> {
        let api_url = parse_http_url("api_url", api_url)?;
        let push_url = derive_push_url(&api_url)?;
        Ok(Self {
            api_url,
            push_url,
            download_dir: PathBuf::from("."),
            email: None,
            password: None,
        })
    }

    /// API base without a trailing slash, ready for path concatenation.
    pub fn api_base(&self) -> String {
        self.api_url.as_str().trim_end_matches('/').to_string()
    }

    /// Push base without a trailing slash.
    pub fn push_base(&self) -> String {
        self.push_url.as_str().trim_end_matches('/').to_string()
    }

    /// Auto-login credentials, when both halves are configured.
    pub fn auto_login(&self) -> Option<(&str, &str)> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        var,
        reason: format!("{raw:?}: {e}"),
    })
}

fn parse_http_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = parse_url(var, raw)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Invalid {
            var,
            reason: format!("expected an http or https URL, got scheme {other:?}"),
        }),
    }
}

fn parse_ws_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = parse_url(var, raw)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a ws or wss URL, got scheme {other:?}"),
        }),
    }
}

/// The push channel lives on the same host and port as the API.
fn derive_push_url(api_url: &Url) -> Result<Url, ConfigError> {
    let scheme = if api_url.scheme() == "https" { "wss" } else { "ws" };
    let mut push_url = api_url.clone();
    push_url
        .set_scheme(scheme)
        .map_err(|()| ConfigError::Invalid {
            var: "QRTRACK_PUSH_URL",
            reason: format!("cannot derive a {scheme} URL from {api_url}"),
        })?;
    Ok(push_url)
}
