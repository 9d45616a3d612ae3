//! Chunked transfer of a media file over a YouTube resumable upload session.
//!
//! A session is opened by [`YouTubeClient::start_video_upload`], which sends the video metadata
//! and receives a session URI in return. The file's bytes are then `PUT` to that URI one chunk at
//! a time. After every chunk but the last, the server answers `308 Resume Incomplete` with a
//! `Range` header saying how much it has stored; the next chunk starts right after that. The final
//! chunk is answered with the created [`Video`].
//!
//! Nothing is retried and nothing about the session outlives the process.
//!
//! See: <https://developers.google.com/youtube/v3/guides/using_resumable_upload_protocol>

use crate::youtube_api::client::YouTubeClient;
use crate::youtube_api::videos::Video;
use eyre::Context;
use http::header::{CONTENT_RANGE, CONTENT_TYPE, HeaderMap, RANGE};
use http::{Method, StatusCode};
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Bytes sent per `PUT`. Must be a multiple of 256 KiB for every chunk except the last.
pub const DEFAULT_CHUNK_SIZE: u64 = 100 * 1024 * 1024;

/// How much of the file the server has acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    /// Fraction of the file acknowledged, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_sent.min(self.total_bytes) as f64) / (self.total_bytes as f64)
    }

    /// Whole percent acknowledged, rounded down.
    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0) as u32
    }
}

/// What a single [`ResumableUpload::next_chunk`] call achieved.
#[derive(Debug)]
pub enum ChunkOutcome {
    /// The server stored the chunk and expects more.
    InProgress(UploadProgress),
    /// The server has the whole file and created the video.
    Complete(Video),
}

/// An open resumable upload session for one file.
#[derive(Debug)]
pub struct ResumableUpload {
    yt: YouTubeClient,
    session_url: String,
    file: tokio::fs::File,
    content_type: String,
    total_bytes: u64,
    /// First byte the server has not yet acknowledged.
    offset: u64,
    chunk_size: u64,
}

impl ResumableUpload {
    pub(crate) fn new(
        yt: YouTubeClient,
        session_url: String,
        file: tokio::fs::File,
        content_type: String,
        total_bytes: u64,
    ) -> Self {
        Self {
            yt,
            session_url,
            file,
            content_type,
            total_bytes,
            offset: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Overrides the number of bytes sent per request.
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn session_url(&self) -> &str {
        &self.session_url
    }

    pub fn progress(&self) -> UploadProgress {
        UploadProgress {
            bytes_sent: self.offset,
            total_bytes: self.total_bytes,
        }
    }

    /// Sends the next chunk of the file.
    ///
    /// Call repeatedly until it returns [`ChunkOutcome::Complete`]. Any transport or server error
    /// is returned as-is; the chunk is not retried.
    #[tracing::instrument(skip(self), fields(offset = self.offset, total = self.total_bytes))]
    pub async fn next_chunk(&mut self) -> eyre::Result<ChunkOutcome> {
        let len = self.chunk_size.min(self.total_bytes - self.offset);
        let content_range = if self.total_bytes == 0 {
            "bytes */0".to_string()
        } else {
            format!(
                "bytes {}-{}/{}",
                self.offset,
                self.offset + len - 1,
                self.total_bytes
            )
        };

        let mut chunk = vec![0; len as usize];
        self.file
            .seek(SeekFrom::Start(self.offset))
            .await
            .context("seek to next chunk")?;
        self.file
            .read_exact(&mut chunk)
            .await
            .context("read next chunk from video file")?;

        let response = self
            .yt
            .authorized(Method::PUT, &self.session_url)
            .header(CONTENT_TYPE, &self.content_type)
            .header(CONTENT_RANGE, &content_range)
            .body(chunk)
            .send()
            .await
            .with_context(|| format!("send chunk {content_range}"))?;

        let status = response.status();
        if status == StatusCode::PERMANENT_REDIRECT {
            let acknowledged = acknowledged_bytes(response.headers())?;
            if acknowledged > self.total_bytes {
                eyre::bail!(
                    "server acknowledged {acknowledged} bytes of a {} byte file",
                    self.total_bytes
                );
            }
            self.offset = acknowledged;
            tracing::debug!(acknowledged, "chunk accepted, upload incomplete");
            return Ok(ChunkOutcome::InProgress(self.progress()));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            eyre::bail!(
                "YouTube upload chunk {} failed with status {}: {}",
                content_range,
                status,
                error_text
            );
        }

        let video: Video = response
            .json()
            .await
            .context("parse YouTube upload completion response as JSON")?;
        self.offset = self.total_bytes;
        tracing::debug!(video_id = video.id, "upload complete");
        Ok(ChunkOutcome::Complete(video))
    }
}

/// Reads the number of bytes stored so far from a `308` response.
///
/// The header looks like `Range: bytes=0-524287`. Its absence means nothing has been stored yet.
fn acknowledged_bytes(headers: &HeaderMap) -> eyre::Result<u64> {
    let Some(range) = headers.get(RANGE) else {
        return Ok(0);
    };
    let range = range.to_str().context("Range header is not text")?;
    let last = range
        .strip_prefix("bytes=")
        .and_then(|r| r.split_once('-'))
        .filter(|(first, _)| *first == "0")
        .map(|(_, last)| last)
        .ok_or_else(|| eyre::eyre!("unexpected Range header in upload response: {range}"))?;
    let last: u64 = last
        .parse()
        .with_context(|| format!("parse Range header end: {range}"))?;
    Ok(last + 1)
}
