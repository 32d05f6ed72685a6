use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::types::types::{AudioTrack, ItemOutcome, LoaderError, PoolConfig};

/// Write buffer for payload files.
const WRITE_BUFFER: usize = 256 * 1024;

/// Local file name for a track: `"<artist> - <title>.mp3"` with `/` swapped for `|`.
///
/// Existing libraries on disk depend on this exact mapping.
pub fn file_name(track: &AudioTrack) -> String {
    format!("{} - {}.mp3", track.artist.trim(), track.title.trim()).replace('/', "|")
}

/// Fetches one track's payload into the output directory.
pub struct ItemDownloader {
    client: Client,
    config: Arc<PoolConfig>,
}

impl ItemDownloader {
    pub fn new(client: Client, config: Arc<PoolConfig>) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn target_path(&self, track: &AudioTrack) -> PathBuf {
        self.config.output_dir().join(file_name(track))
    }

    /// Downloads `track`, or skips it when a non-empty file is already in place
    /// and skipping is enabled. Errors only concern this one track.
    pub async fn download(&self, track: &AudioTrack) -> Result<ItemOutcome, LoaderError> {
        let target = self.target_path(track);

        if self.config.skip_if_exists() && is_non_empty_file(&target).await {
            log::debug!("[download] {}: already present, skipping", target.display());
            return Ok(ItemOutcome::Skipped);
        }

        let response = self.client.get(&track.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoaderError::Status {
                status,
                url: track.url.clone(),
            });
        }

        // Stream into a private partial file and rename it over the target, so
        // two tracks that map to the same name never interleave their bytes.
        let partial = partial_path(&target);
        match stream_to_file(response, &partial).await {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::rename(&partial, &target).await {
                    let _ = tokio::fs::remove_file(&partial).await;
                    return Err(LoaderError::Disk(e));
                }
                Ok(ItemOutcome::Downloaded { bytes })
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                Err(e)
            }
        }
    }
}

async fn is_non_empty_file(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

/// Partial file next to `target`. Fixed-length name, independent of the target's.
fn partial_path(target: &Path) -> PathBuf {
    target.with_file_name(format!(".{}.part", Uuid::new_v4().simple()))
}

async fn stream_to_file(response: reqwest::Response, path: &Path) -> Result<u64, LoaderError> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = tokio::io::BufWriter::with_capacity(WRITE_BUFFER, file);
    let mut written: u64 = 0;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    Ok(written)
}
