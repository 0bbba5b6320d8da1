//! `qrtrack` -- terminal front-end for a QR Tracker server.
//!
//! Signs in, lists the account's QR codes, and keeps their scan counters
//! live over the server's push channel. Commands are read from stdin; see
//! `help` at the prompt.
//!
//! # Environment variables
//!
//! | Variable               | Required | Default                     | Description                      |
//! |------------------------|----------|-----------------------------|----------------------------------|
//! | `QRTRACK_API_URL`      | no       | `http://localhost:5000`     | HTTP base of the server          |
//! | `QRTRACK_HOST`         | no       | `localhost`                 | Used when `QRTRACK_API_URL` is unset |
//! | `QRTRACK_PORT`         | no       | `5000`                      | Used when `QRTRACK_API_URL` is unset |
//! | `QRTRACK_PUSH_URL`     | no       | API URL with a `ws` scheme  | Push channel base                |
//! | `QRTRACK_DOWNLOAD_DIR` | no       | `.`                         | Where `download` writes images   |
//! | `QRTRACK_EMAIL`        | no       | --                          | Sign in at start-up              |
//! | `QRTRACK_PASSWORD`     | no       | --                          | Sign in at start-up              |

use qrtrack_cli::app::App;
use qrtrack_client::config::ClientConfig;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Logs go to stderr so they never interleave with the rendered screen.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qrtrack_cli=info,qrtrack_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        api_url = %config.api_base(),
        push_url = %config.push_base(),
        download_dir = %config.download_dir.display(),
        "Starting qrtrack",
    );

    let mut app = App::new(config).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build the HTTP client");
        std::process::exit(1);
    });

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    if let Err(e) = app.run(stdin, &mut stdout).await {
        tracing::error!(error = %e, "Terminal I/O failed");
        std::process::exit(1);
    }
}
