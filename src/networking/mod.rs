use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use log::{debug, warn};
use reqwest::Client;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::util::format_speed;

pub const USER_AGENT: &str = concat!("PriconneVH-Installer/", env!("CARGO_PKG_VERSION"));

const REPORT_INTERVAL: Duration = Duration::from_millis(200);

/// Shared HTTP client configuration for the GitHub API and asset downloads.
pub fn build_client(timeout: Option<Duration>) -> Client {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().unwrap_or_else(|err| {
        warn!("network client: falling back to default HTTP client configuration ({err})");
        Client::new()
    })
}

/// Snapshot handed to download observers.
#[derive(Clone, Copy, Debug)]
pub struct DownloadProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
    pub bytes_per_sec: f32,
}

impl DownloadProgress {
    pub fn speed_text(&self) -> String {
        format_speed(self.bytes_per_sec)
    }
}

#[derive(Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new() -> Self {
        // No overall timeout: release assets can be large.
        Self {
            client: build_client(None),
        }
    }

    /// Stream `url` into `dest`. The body lands in `<dest>.part` first and is only
    /// renamed into place once every expected byte arrived.
    pub async fn download_to_path<F>(
        &self,
        url: &str,
        dest: &Path,
        expected_size: Option<u64>,
        mut on_progress: F,
    ) -> Result<(), String>
    where
        F: FnMut(DownloadProgress) + Send,
    {
        debug!("download: GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("download request failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("download status error: {e}"))?;

        let total = match (response.content_length(), expected_size) {
            (Some(served), Some(listed)) if served != listed => {
                warn!("download: server sends {served} bytes, release lists {listed}");
                Some(served)
            }
            (served, listed) => served.or(listed),
        };

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("failed to create download dir: {e}"))?;
        }
        let partial = partial_path(dest);
        let mut file = File::create(&partial)
            .await
            .map_err(|e| format!("failed to create file: {e}"))?;

        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        let mut window_start = Instant::now();
        let mut window_bytes = 0u64;
        let mut bytes_per_sec = 0.0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| format!("stream error: {e}"))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| format!("write error: {e}"))?;
            downloaded += chunk.len() as u64;
            window_bytes += chunk.len() as u64;

            let elapsed = window_start.elapsed();
            if elapsed >= REPORT_INTERVAL {
                bytes_per_sec = window_bytes as f32 / elapsed.as_secs_f32();
                on_progress(DownloadProgress {
                    downloaded,
                    total,
                    bytes_per_sec,
                });
                window_start = Instant::now();
                window_bytes = 0;
            }
        }
        on_progress(DownloadProgress {
            downloaded,
            total,
            bytes_per_sec,
        });

        file.flush()
            .await
            .map_err(|e| format!("flush error: {e}"))?;
        drop(file);

        if let Some(total) = total
            && downloaded != total
        {
            let _ = fs::remove_file(&partial).await;
            return Err(format!(
                "download incomplete: received {downloaded} of {total} bytes"
            ));
        }
        fs::rename(&partial, dest)
            .await
            .map_err(|e| format!("failed to move download into place: {e}"))
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
