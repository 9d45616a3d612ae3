//! YouTube Videos API types.

use crate::config::{CategoryId, Privacy, UploadRequest};
use serde::{Deserialize, Serialize};

/// Metadata sent along with a `videos.insert` upload.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/insert>
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoInsert {
    pub snippet: VideoSnippet,
    pub status: VideoStatus,
}

/// The snippet object contains basic details about the video.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#snippet>
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoSnippet {
    pub title: String,
    pub description: String,
    /// Keyword tags; omitted from the request entirely when there are none.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(rename = "categoryId")]
    pub category_id: CategoryId,
}

/// See: <https://developers.google.com/youtube/v3/docs/videos#status>
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoStatus {
    #[serde(rename = "privacyStatus")]
    pub privacy_status: Privacy,
}

impl From<&UploadRequest> for VideoInsert {
    fn from(request: &UploadRequest) -> Self {
        Self {
            snippet: VideoSnippet {
                title: request.title.clone(),
                description: request.description.clone(),
                tags: request.tags.clone(),
                category_id: request.category_id,
            },
            status: VideoStatus {
                privacy_status: request.privacy,
            },
        }
    }
}

/// A `video` resource as returned once an upload completes.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#resource>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// The ID that YouTube uses to uniquely identify the video.
    pub id: String,
}
