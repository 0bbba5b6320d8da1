//! Saving downloaded QR images to disk.

use std::path::{Path, PathBuf};

/// Errors raised while saving an image.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The server-provided file name would escape the download directory.
    #[error("refusing unsafe file name {0:?}")]
    UnsafeFileName(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write `bytes` to `dir/filename`, creating `dir` if needed.
///
/// `filename` comes from the server, so it must be a bare file name.
pub async fn save_image(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, DownloadError> {
    if !is_bare_file_name(filename) {
        return Err(DownloadError::UnsafeFileName(filename.to_string()));
    }

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| DownloadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let path = dir.join(filename);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| DownloadError::Io {
            path: path.clone(),
            source,
        })?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved QR image");
    Ok(path)
}

fn is_bare_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
