//! The upload run itself: video, then thumbnail, then playlist.

use crate::config::UploadRequest;
use crate::youtube_api::{ChunkOutcome, VideoInsert, YouTubeClient};
use eyre::Context;

/// What happened to the requested thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailOutcome {
    /// No (existing) thumbnail was configured.
    NotRequested,
    Attached,
    /// Setting the thumbnail failed; the run carried on regardless.
    Failed(String),
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub video_id: String,
    pub thumbnail: ThumbnailOutcome,
    /// The playlist the video was added to, if one was requested.
    pub playlist_id: Option<String>,
}

/// Uploads the video described by `request` and applies the optional thumbnail and playlist.
///
/// Only the thumbnail stage tolerates failure. An error from the playlist stage is returned even
/// though the video has already been uploaded by then.
pub async fn run(request: &UploadRequest, yt: &YouTubeClient) -> eyre::Result<RunReport> {
    println!("Uploading video...");
    let mut upload = yt
        .start_video_upload(&request.video_path, &VideoInsert::from(request))
        .await
        .context("start video upload")?;
    let video = loop {
        match upload.next_chunk().await.context("upload video")? {
            ChunkOutcome::InProgress(progress) => {
                println!("Upload progress: {}%", progress.percent());
            }
            ChunkOutcome::Complete(video) => break video,
        }
    };
    println!("\nUpload complete.");
    println!("Video ID: {}", video.id);

    let thumbnail = match &request.thumbnail_path {
        None => ThumbnailOutcome::NotRequested,
        Some(path) => match yt.set_thumbnail(&video.id, path).await {
            Ok(()) => {
                println!("Thumbnail uploaded: {}", path.display());
                ThumbnailOutcome::Attached
            }
            Err(e) => {
                tracing::warn!(error = ?e, "thumbnail upload failed");
                println!("Failed to upload thumbnail, skipping. Error: {e:#}");
                ThumbnailOutcome::Failed(format!("{e:#}"))
            }
        },
    };

    let playlist_id = match &request.playlist_name {
        None => None,
        Some(name) => {
            let playlist_id = yt
                .get_or_create_playlist(name)
                .await
                .with_context(|| format!("find or create playlist '{name}'"))?;
            yt.insert_playlist_item(&playlist_id, &video.id)
                .await
                .with_context(|| format!("add video {} to playlist '{name}'", video.id))?;
            println!("Video added to playlist '{name}'.");
            Some(playlist_id)
        }
    };

    Ok(RunReport {
        video_id: video.id,
        thumbnail,
        playlist_id,
    })
}
