//! VideoCatalogClient - Recorded interaction videos
//!
//! ## Responsibilities
//!
//! - `list()`: refresh the local catalog from GET /videos
//! - `download()`: stream a video into a private temp file
//! - `delete()`: DELETE on the server; the catalog changes on the next list
//!
//! Each download gets its own file under the download directory, so
//! concurrent downloads of the same filename never share a path. The file is
//! removed when the returned `DownloadedVideo` is dropped unless persisted.

use crate::backend_client::{validate_filename, BackendClient};
use crate::error::{Error, Result};
use crate::models::VideoRecord;
use crate::stream_state::StreamState;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Video written to a caller-owned temp file
#[derive(Debug)]
pub struct DownloadedVideo {
    filename: String,
    size: u64,
    file: NamedTempFile,
}

impl DownloadedVideo {
    /// Server-side filename
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Local path of the downloaded bytes
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Bytes written
    pub fn size(&self) -> u64 {
        self.size
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.path()).await?)
    }

    /// Keep the file at `dest`, overwriting whatever is there
    pub fn persist(self, dest: impl AsRef<Path>) -> Result<PathBuf> {
        let dest = dest.as_ref().to_path_buf();
        self.file.persist(&dest).map_err(|e| Error::Io(e.error))?;
        Ok(dest)
    }
}

/// VideoCatalogClient instance
pub struct VideoCatalogClient {
    client: Arc<BackendClient>,
    state: Arc<StreamState>,
    download_dir: PathBuf,
    refresh: Mutex<()>,
}

impl VideoCatalogClient {
    /// Create new VideoCatalogClient
    pub fn new(client: Arc<BackendClient>, state: Arc<StreamState>, download_dir: PathBuf) -> Self {
        Self {
            client,
            state,
            download_dir,
            refresh: Mutex::new(()),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Locally known catalog (as of the last successful `list`)
    pub fn videos(&self) -> Arc<Vec<VideoRecord>> {
        self.state.videos()
    }

    /// Fetch the catalog and replace the local copy. On failure the local
    /// copy is left as it was.
    pub async fn list(&self) -> Result<Arc<Vec<VideoRecord>>> {
        let _refresh = self.refresh.lock().await;

        match self.client.list_videos().await {
            Ok(resp) => {
                if resp.count != resp.videos.len() {
                    tracing::debug!(
                        count = resp.count,
                        received = resp.videos.len(),
                        "Video count mismatch"
                    );
                }
                tracing::info!(count = resp.videos.len(), "Video catalog refreshed");
                Ok(self.state.set_videos(resp.videos))
            }
            Err(e) => {
                tracing::warn!(
                    error_code = e.error_code(),
                    error = %e,
                    "Video catalog refresh failed"
                );
                Err(Error::CatalogUnavailable(e.to_string()))
            }
        }
    }

    /// Download `filename` into a fresh temp file
    pub async fn download(&self, filename: &str) -> Result<DownloadedVideo> {
        validate_filename(filename)?;

        let mut resp = match self.client.open_video(filename).await {
            Ok(resp) => resp,
            Err(e @ (Error::NotFound(_) | Error::Server { .. })) => {
                tracing::warn!(filename = %filename, error = %e, "Video download rejected");
                return Err(e);
            }
            Err(e) => return Err(transfer_failed(filename, e)),
        };

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| transfer_failed(filename, e.into()))?;

        let temp = tempfile::Builder::new()
            .prefix("petguard-")
            .suffix(&format!("-{}", filename))
            .tempfile_in(&self.download_dir)
            .map_err(|e| transfer_failed(filename, e.into()))?;

        let std_file = temp
            .reopen()
            .map_err(|e| transfer_failed(filename, e.into()))?;
        let mut out = tokio::fs::File::from_std(std_file);

        let mut size = 0u64;
        loop {
            let chunk = match resp.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => return Err(transfer_failed(filename, e.into())),
            };
            out.write_all(&chunk)
                .await
                .map_err(|e| transfer_failed(filename, e.into()))?;
            size += chunk.len() as u64;
        }
        out.flush()
            .await
            .map_err(|e| transfer_failed(filename, e.into()))?;

        tracing::info!(
            filename = %filename,
            size = size,
            path = %temp.path().display(),
            "Video downloaded"
        );

        Ok(DownloadedVideo {
            filename: filename.to_string(),
            size,
            file: temp,
        })
    }

    /// Delete `filename` on the server. The local catalog is not touched;
    /// call `list()` to pick up the change.
    pub async fn delete(&self, filename: &str) -> Result<()> {
        match self.client.delete_video(filename).await {
            Ok(()) => {
                tracing::info!(filename = %filename, "Video deleted");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    filename = %filename,
                    error_code = e.error_code(),
                    error = %e,
                    "Video delete failed"
                );
                Err(e)
            }
        }
    }

    /// Absolute URL for streaming `filename` without downloading it
    pub fn video_url(&self, filename: &str) -> Result<Url> {
        validate_filename(filename)?;
        self.client.endpoint(&["videos", filename])
    }
}

fn transfer_failed(filename: &str, e: Error) -> Error {
    tracing::warn!(filename = %filename, error = %e, "Video transfer failed");
    Error::TransferFailed(format!("{}: {}", filename, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(dir: &Path) -> VideoCatalogClient {
        let client = Arc::new(BackendClient::new("http://127.0.0.1:9").unwrap());
        VideoCatalogClient::new(client, Arc::new(StreamState::new()), dir.to_path_buf())
    }

    #[test]
    fn test_video_url() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog(dir.path());
        assert_eq!(
            catalog.video_url("interaction 1.mp4").unwrap().as_str(),
            "http://127.0.0.1:9/videos/interaction%201.mp4"
        );
        assert!(matches!(catalog.video_url("../x"), Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_invalid_filename_never_hits_network() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog(dir.path());
        assert!(matches!(catalog.download("a/b.mp4").await, Err(Error::Validation(_))));
        assert!(matches!(catalog.delete("").await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_unreachable_list_keeps_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog(dir.path());
        let existing = VideoRecord {
            filename: "a.mp4".to_string(),
            size_bytes: 3,
            created_at: "2025-12-19T10:00:00".to_string(),
            download_url: "/videos/a.mp4".to_string(),
        };
        catalog.state.set_videos(vec![existing.clone()]);

        assert!(matches!(catalog.list().await, Err(Error::CatalogUnavailable(_))));
        assert_eq!(*catalog.videos(), vec![existing]);
    }

    #[tokio::test]
    async fn test_unreachable_download_is_transfer_failure() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog(dir.path());
        assert!(matches!(
            catalog.download("a.mp4").await,
            Err(Error::TransferFailed(_))
        ));
    }
}
