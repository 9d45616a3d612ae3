//! YouTube Data API v3 client library.
//!
//! Covers the handful of endpoints an upload run touches:
//!
//! - `videos.insert` through the resumable upload protocol ([`upload`]),
//! - `thumbnails.set`,
//! - `playlists.list` and `playlists.insert`,
//! - `playlistItems.insert`.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use youtube_uploader::youtube_api::{ChunkOutcome, VideoInsert, YouTubeClient};
//! use youtube_uploader::UploadRequest;
//!
//! # async fn example(request: UploadRequest, access_token: String) -> eyre::Result<()> {
//! let yt = YouTubeClient::new(access_token)?;
//! let mut upload = yt
//!     .start_video_upload(&request.video_path, &VideoInsert::from(&request))
//!     .await?;
//! let video = loop {
//!     match upload.next_chunk().await? {
//!         ChunkOutcome::InProgress(progress) => println!("{}%", progress.percent()),
//!         ChunkOutcome::Complete(video) => break video,
//!     }
//! };
//! let playlist_id = yt.get_or_create_playlist("My Show").await?;
//! yt.insert_playlist_item(&playlist_id, &video.id).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod playlists;
pub mod types;
pub mod upload;
pub mod videos;

// Re-export main types for convenience
pub use client::{ApiEndpoints, YouTubeClient};
pub use types::{ListResponse, PageInfo, PagedStream};

pub use playlists::{Playlist, PlaylistItem, PlaylistSnippet};
pub use upload::{ChunkOutcome, ResumableUpload, UploadProgress};
pub use videos::{Video, VideoInsert};
