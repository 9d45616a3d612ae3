//! YouTube Playlists and PlaylistItems API types.

use crate::config::Privacy;
use serde::{Deserialize, Serialize};

/// A `playlist` resource.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlists#resource>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    /// The ID that YouTube uses to uniquely identify the playlist.
    pub id: String,
    pub snippet: PlaylistSnippet,
}

/// See: <https://developers.google.com/youtube/v3/docs/playlists#snippet>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSnippet {
    /// The playlist's title.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// See: <https://developers.google.com/youtube/v3/docs/playlists#status>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistStatus {
    #[serde(rename = "privacyStatus")]
    pub privacy_status: Privacy,
}

/// Request body for `playlists.insert`.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlists/insert>
#[derive(Debug, Serialize)]
pub struct PlaylistInsert {
    pub snippet: PlaylistSnippet,
    pub status: PlaylistStatus,
}

/// Request body for `playlistItems.insert`.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlistItems/insert>
#[derive(Debug, Serialize)]
pub struct PlaylistItemInsert {
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Serialize)]
pub struct PlaylistItemSnippet {
    #[serde(rename = "playlistId")]
    pub playlist_id: String,
    #[serde(rename = "resourceId")]
    pub resource_id: ResourceId,
}

/// Identifies the resource a playlist item points at.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceId {
    /// Always `youtube#video` for the items we add.
    pub kind: String,
    #[serde(rename = "videoId")]
    pub video_id: String,
}

impl PlaylistItemInsert {
    pub fn video(playlist_id: &str, video_id: &str) -> Self {
        Self {
            snippet: PlaylistItemSnippet {
                playlist_id: playlist_id.to_string(),
                resource_id: ResourceId {
                    kind: "youtube#video".to_string(),
                    video_id: video_id.to_string(),
                },
            },
        }
    }
}

/// A `playlistItem` resource as returned by `playlistItems.insert`.
#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    pub id: String,
}
