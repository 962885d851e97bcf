//! Attachment downloader
//!
//! Fetches every accessible attachment into `downloads/<category>/`. Requests are
//! unauthenticated and sequential. Network and local write failures are tallied per
//! file; only a download root that cannot be created aborts the run.

use crate::api::FetchError;
use crate::classify::{AttachmentRow, UNKNOWN_FILENAME};
use crate::error::Result;
use futures::StreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Extension used when neither the filename nor the MIME type gives one
pub const FALLBACK_EXTENSION: &str = "bin";

/// Pick a file extension from the filename, falling back to the MIME type
pub fn extension_for(mime: &str, filename: Option<&str>) -> String {
    if let Some((_, ext)) = filename.and_then(|name| name.rsplit_once('.')) {
        return ext.to_lowercase();
    }
    let ext = match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/heic" => "heic",
        "image/heif" => "heif",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/svg+xml" => "svg",
        "application/pdf" => "pdf",
        _ => FALLBACK_EXTENSION,
    };
    ext.to_string()
}

/// Local file name for a row: path separators flattened, `<id>.<ext>` when unnamed
pub fn safe_file_name(row: &AttachmentRow) -> String {
    let name = row.filename.replace(['/', '\\'], "_");
    if name.is_empty() || name == UNKNOWN_FILENAME {
        format!("{}.{}", row.id, extension_for(&row.mime, None))
    } else {
        name
    }
}

/// `<stem>_<first 8 chars of id><.ext>`, used when the plain name is taken
fn collision_name(name: &str, id: &str) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let short_id: String = id.chars().take(8).collect();
    match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, short_id, ext.to_string_lossy()),
        None => format!("{}_{}", stem, short_id),
    }
}

/// Why a single file could not be downloaded
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The file could not be written locally (name too long, permissions...)
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What happened to one queued file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Downloaded { path: PathBuf, bytes: u64 },
    AlreadyPresent { path: PathBuf, bytes: u64 },
    Failed { reason: String },
}

/// Tally for a download run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub queued: u64,
    pub downloaded: u64,
    pub already_present: u64,
    pub failed: u64,
    pub total_bytes: u64,
}

impl DownloadReport {
    fn record(&mut self, status: &DownloadStatus) {
        match status {
            DownloadStatus::Downloaded { bytes, .. } => {
                self.downloaded += 1;
                self.total_bytes += bytes;
            }
            DownloadStatus::AlreadyPresent { bytes, .. } => {
                self.already_present += 1;
                self.total_bytes += bytes;
            }
            DownloadStatus::Failed { .. } => self.failed += 1,
        }
    }
}

/// Sequential downloader rooted at one directory
pub struct Downloader {
    client: reqwest::Client,
    root: PathBuf,
}

impl Downloader {
    pub fn new(root: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("harvest-cli/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            root: root.into(),
        })
    }

    /// Download every row, calling `on_item` after each one
    ///
    /// Only an unusable download root is an error; per-file failures are tallied.
    pub async fn download_all<'a, I, F>(&self, rows: I, mut on_item: F) -> Result<DownloadReport>
    where
        I: IntoIterator<Item = &'a AttachmentRow>,
        F: FnMut(&AttachmentRow, &DownloadStatus),
    {
        std::fs::create_dir_all(&self.root)?;

        let mut report = DownloadReport::default();
        for row in rows {
            report.queued += 1;
            let status = match self.download_one(row).await {
                Ok(status) => status,
                Err(err) => {
                    warn!(id = %row.id, url = %row.url, error = %err, "Download failed");
                    DownloadStatus::Failed {
                        reason: err.to_string(),
                    }
                }
            };
            report.record(&status);
            on_item(row, &status);
        }
        debug!(
            queued = report.queued,
            downloaded = report.downloaded,
            failed = report.failed,
            "Downloads finished"
        );
        Ok(report)
    }

    /// Download a single row into its category directory
    pub async fn download_one(
        &self,
        row: &AttachmentRow,
    ) -> std::result::Result<DownloadStatus, DownloadError> {
        let dir = self.root.join(&row.category);
        std::fs::create_dir_all(&dir).map_err(|source| DownloadError::Write {
            path: dir.clone(),
            source,
        })?;

        let name = safe_file_name(row);
        let mut dest = dir.join(&name);
        if dest.exists() {
            dest = dir.join(collision_name(&name, &row.id));
        }
        if dest.exists() {
            let bytes = std::fs::metadata(&dest)
                .map_err(|source| DownloadError::Write {
                    path: dest.clone(),
                    source,
                })?
                .len();
            return Ok(DownloadStatus::AlreadyPresent { path: dest, bytes });
        }

        let bytes = self.fetch_to(&row.url, &dest).await?;
        Ok(DownloadStatus::Downloaded { path: dest, bytes })
    }

    /// Stream `raw_url` into `dest` through a `.part` file
    async fn fetch_to(
        &self,
        raw_url: &str,
        dest: &Path,
    ) -> std::result::Result<u64, DownloadError> {
        // Url::parse percent-encodes spaces and other unsafe path characters
        let url = url::Url::parse(raw_url).map_err(|e| FetchError::Transport {
            url: raw_url.to_string(),
            message: format!("invalid URL: {}", e),
        })?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        let part = dest.with_file_name(format!(
            "{}.part",
            dest.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
        ));
        let written = match stream_into(response, &part).await {
            Ok(0) => {
                let _ = std::fs::remove_file(&part);
                return Err(FetchError::Decode {
                    url: url.to_string(),
                    message: "empty response body".to_string(),
                }
                .into());
            }
            Ok(written) => written,
            Err(err) => {
                let _ = std::fs::remove_file(&part);
                return Err(err);
            }
        };

        std::fs::rename(&part, dest).map_err(|source| {
            let _ = std::fs::remove_file(&part);
            DownloadError::Write {
                path: dest.to_path_buf(),
                source,
            }
        })?;
        Ok(written)
    }
}

/// Write the response body to `path`; the caller removes the file on error
async fn stream_into(
    response: reqwest::Response,
    path: &Path,
) -> std::result::Result<u64, DownloadError> {
    let url = response.url().to_string();
    let write_err = |source: std::io::Error| DownloadError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut file = std::fs::File::create(path).map_err(write_err)?;
    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FetchError::from_reqwest(&url, e))?;
        file.write_all(&chunk).map_err(write_err)?;
        written += chunk.len() as u64;
    }
    file.flush().map_err(write_err)?;
    Ok(written)
}
