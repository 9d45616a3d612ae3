//! Core YouTube API client functionality.

use crate::config::Privacy;
use crate::youtube_api::{
    playlists::{
        Playlist, PlaylistInsert, PlaylistItem, PlaylistItemInsert, PlaylistSnippet,
        PlaylistStatus,
    },
    types::{ListResponse, PagedStream},
    upload::ResumableUpload,
    videos::VideoInsert,
};
use eyre::Context;
use http::Method;
use http::header::LOCATION;
use serde::Serialize;
use std::path::Path;
use tokio_stream::{Stream, StreamExt};
use tracing::instrument;

/// Description given to playlists this tool has to create.
pub const CREATED_PLAYLIST_DESCRIPTION: &str = "Playlist created by youtube-uploader";

/// Where API requests are sent.
///
/// Uploads of media bytes go to a different host path than regular resource calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    /// Base URL for resource calls, e.g. `https://www.googleapis.com/youtube/v3`.
    pub api_base: String,
    /// Base URL for media uploads, e.g. `https://www.googleapis.com/upload/youtube/v3`.
    pub upload_base: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self::rooted_at("https://www.googleapis.com")
    }
}

impl ApiEndpoints {
    /// Endpoints laid out the way Google lays them out, under a different origin.
    pub fn rooted_at(origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        Self {
            api_base: format!("{origin}/youtube/v3"),
            upload_base: format!("{origin}/upload/youtube/v3"),
        }
    }
}

/// Client for the parts of the YouTube Data API v3 that an upload run needs.
///
/// The client holds an access token that the caller has already made sure is fresh; it does not
/// refresh tokens by itself.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    access_token: String,
    endpoints: ApiEndpoints,
    /// HTTP client for API requests
    client: reqwest::Client,
}

impl YouTubeClient {
    /// Creates a client talking to the real YouTube API.
    pub fn new(access_token: impl Into<String>) -> eyre::Result<Self> {
        Self::with_endpoints(access_token, ApiEndpoints::default())
    }

    pub fn with_endpoints(
        access_token: impl Into<String>,
        endpoints: ApiEndpoints,
    ) -> eyre::Result<Self> {
        let client = reqwest::ClientBuilder::new()
            // 308 is how the upload protocol says "keep going", not a redirect to follow.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("build YouTube HTTP client")?;
        Ok(Self {
            access_token: access_token.into(),
            endpoints,
            client,
        })
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    fn api_url(&self, resource: &str) -> String {
        format!("{}/{resource}", self.endpoints.api_base)
    }

    fn upload_url(&self, resource: &str) -> String {
        format!("{}/{resource}", self.endpoints.upload_base)
    }

    /// Starts building a request that carries our access token.
    pub(crate) fn authorized(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    /// Sends `request` and turns any non-2xx answer into an error carrying the response body.
    async fn send_checked(
        request: reqwest::RequestBuilder,
        method: &Method,
        url: &str,
    ) -> eyre::Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .with_context(|| format!("send {} request to YouTube API: {}", method, url))?;

        let status_code = response.status();
        if !status_code.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(eyre::eyre!(
                "YouTube API {} request failed with status {}: {}",
                method,
                status_code,
                error_text
            ));
        }

        Ok(response)
    }

    /// Makes an authenticated HTTP request to the YouTube API with common error handling.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method to use (GET, POST, etc.)
    /// * `url` - The API endpoint URL
    /// * `query_params` - Optional query parameters
    /// * `json_body` - Optional JSON body for POST requests
    ///
    /// # Returns
    ///
    /// The raw [`reqwest::Response`] for method-specific JSON parsing.
    #[instrument(skip(self, json_body), ret, level = tracing::Level::TRACE)]
    pub(crate) async fn make_authenticated_request(
        &self,
        method: Method,
        url: &str,
        query_params: Option<&[(&str, &str)]>,
        json_body: Option<&impl Serialize>,
    ) -> eyre::Result<reqwest::Response> {
        let mut request = self.authorized(method.clone(), url);

        if let Some(params) = query_params {
            request = request.query(params);
        }

        // Add JSON body and content-type if provided
        if let Some(body) = json_body {
            request = request.json(body);
        }

        Self::send_checked(request, &method, url).await
    }

    /// Opens a resumable upload session for the video at `path`.
    ///
    /// Sends `metadata` to `videos.insert` with `uploadType=resumable` and returns the session,
    /// ready for its first chunk. The file is opened and measured here, so a missing video fails
    /// before anything is sent.
    ///
    /// # Required Scopes
    ///
    /// * `https://www.googleapis.com/auth/youtube.upload`
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/insert>
    #[instrument(skip(self, path, metadata), fields(path = %path.display()))]
    pub async fn start_video_upload(
        &self,
        path: &Path,
        metadata: &VideoInsert,
    ) -> eyre::Result<ResumableUpload> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("open video file {}", path.display()))?;
        let total_bytes = file
            .metadata()
            .await
            .with_context(|| format!("stat video file {}", path.display()))?
            .len();
        let content_type = mime_guess::from_path(path)
            .first_raw()
            .filter(|mime| mime.starts_with("video/"))
            .unwrap_or("video/*")
            .to_string();

        let url = self.upload_url("videos");
        let request = self
            .authorized(Method::POST, &url)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .header("X-Upload-Content-Length", total_bytes)
            .header("X-Upload-Content-Type", &content_type)
            .json(metadata);
        let response = Self::send_checked(request, &Method::POST, &url).await?;

        let session_url = response
            .headers()
            .get(LOCATION)
            .ok_or_else(|| eyre::eyre!("no Location header in upload initiation response"))?
            .to_str()
            .context("upload session URL is not text")?
            .to_string();

        tracing::debug!(total_bytes, content_type, "opened resumable upload session");
        Ok(ResumableUpload::new(
            self.clone(),
            session_url,
            file,
            content_type,
            total_bytes,
        ))
    }

    /// Uploads the image at `path` as the custom thumbnail of `video_id`.
    ///
    /// # Required Scopes
    ///
    /// * `https://www.googleapis.com/auth/youtube.upload`
    /// * `https://www.googleapis.com/auth/youtube`
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/thumbnails/set>
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn set_thumbnail(&self, video_id: &str, path: &Path) -> eyre::Result<()> {
        let image = tokio::fs::read(path)
            .await
            .with_context(|| format!("read thumbnail {}", path.display()))?;
        let content_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream");

        let url = self.upload_url("thumbnails/set");
        let request = self
            .authorized(Method::POST, &url)
            .query(&[("videoId", video_id), ("uploadType", "media")])
            .header(http::header::CONTENT_TYPE, content_type)
            .body(image);
        Self::send_checked(request, &Method::POST, &url).await?;

        tracing::debug!(video_id, "thumbnail set");
        Ok(())
    }

    /// Returns a paginated stream of all playlists owned by the authenticated user.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/playlists/list>
    #[instrument(skip(self))]
    pub fn list_my_playlists(&self) -> impl Stream<Item = eyre::Result<Playlist>> + use<'_> {
        PagedStream::new(|page_token| async {
            let response = self.list_playlists_internal(50, page_token).await?;
            Ok(response.into_page())
        })
    }

    /// Finds the first of the user's playlists whose title is exactly `title`.
    ///
    /// Pages are walked in the order the API returns them, and no further pages are fetched once
    /// a match is found.
    #[instrument(skip(self))]
    pub async fn find_playlist_by_title(&self, title: &str) -> eyre::Result<Option<Playlist>> {
        let playlists = self.list_my_playlists();
        let mut playlists = std::pin::pin!(playlists);
        while let Some(playlist) = playlists.next().await {
            let playlist = playlist.context("fetch playlist")?;
            if playlist.snippet.title == title {
                return Ok(Some(playlist));
            }
        }
        Ok(None)
    }

    /// Creates a new playlist.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/playlists/insert>
    #[instrument(skip(self), ret)]
    pub async fn insert_playlist(
        &self,
        title: &str,
        description: &str,
        privacy: Privacy,
    ) -> eyre::Result<Playlist> {
        let url = self.api_url("playlists");
        let body = PlaylistInsert {
            snippet: PlaylistSnippet {
                title: title.to_string(),
                description: Some(description.to_string()),
            },
            status: PlaylistStatus {
                privacy_status: privacy,
            },
        };

        let response = self
            .make_authenticated_request(
                Method::POST,
                &url,
                Some(&[("part", "snippet,status")]),
                Some(&body),
            )
            .await?;

        let playlist: Playlist = response
            .json()
            .await
            .context("parse YouTube playlists.insert response as JSON")?;

        tracing::debug!(playlist_id = playlist.id, "created playlist");
        Ok(playlist)
    }

    /// Returns the id of the playlist titled `title`, creating a private one if there is none.
    pub async fn get_or_create_playlist(&self, title: &str) -> eyre::Result<String> {
        if let Some(existing) = self
            .find_playlist_by_title(title)
            .await
            .context("look up playlist by title")?
        {
            return Ok(existing.id);
        }

        let created = self
            .insert_playlist(title, CREATED_PLAYLIST_DESCRIPTION, Privacy::Private)
            .await
            .context("create playlist")?;
        Ok(created.id)
    }

    /// Appends `video_id` to the playlist `playlist_id`.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/playlistItems/insert>
    #[instrument(skip(self))]
    pub async fn insert_playlist_item(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> eyre::Result<PlaylistItem> {
        let url = self.api_url("playlistItems");
        let body = PlaylistItemInsert::video(playlist_id, video_id);

        let response = self
            .make_authenticated_request(
                Method::POST,
                &url,
                Some(&[("part", "snippet")]),
                Some(&body),
            )
            .await?;

        response
            .json()
            .await
            .context("parse YouTube playlistItems.insert response as JSON")
    }

    /// Internal method to call the `playlists.list` API for one page of the user's playlists.
    ///
    /// # Arguments
    ///
    /// * `max_results` - Maximum number of playlists to return (1-50)
    /// * `page_token` - Optional page token for pagination
    async fn list_playlists_internal(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> eyre::Result<ListResponse<Playlist>> {
        let url = self.api_url("playlists");
        let max_results_string = max_results.to_string();
        let mut query_params = vec![
            ("part", "snippet"),
            ("mine", "true"),
            ("maxResults", max_results_string.as_str()),
        ];

        // Add pageToken if provided
        if let Some(ref token) = page_token {
            query_params.push(("pageToken", token.as_str()));
        }

        let response = self
            .make_authenticated_request(Method::GET, &url, Some(&query_params), None::<&()>)
            .await?;

        let playlists: ListResponse<Playlist> = response
            .json()
            .await
            .context("parse YouTube playlists API response as JSON")?;

        tracing::debug!(
            returned_items = playlists.items.len(),
            has_next_page = playlists.next_page_token.is_some(),
            "fetched playlists"
        );

        Ok(playlists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube_api::upload::ChunkOutcome;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{
        body_json, body_string, header, method, path, query_param, query_param_is_missing,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> YouTubeClient {
        YouTubeClient::with_endpoints("test-token", ApiEndpoints::rooted_at(&server.uri())).unwrap()
    }

    fn playlist(id: &str, title: &str) -> serde_json::Value {
        serde_json::json!({"kind": "youtube#playlist", "id": id, "snippet": {"title": title}})
    }

    #[test]
    fn test_default_endpoints() {
        let endpoints = ApiEndpoints::default();
        assert_eq!(endpoints.api_base, "https://www.googleapis.com/youtube/v3");
        assert_eq!(
            endpoints.upload_base,
            "https://www.googleapis.com/upload/youtube/v3"
        );
        assert_eq!(
            ApiEndpoints::rooted_at("http://127.0.0.1:1234/").api_base,
            "http://127.0.0.1:1234/youtube/v3"
        );
    }

    #[tokio::test]
    async fn test_find_playlist_walks_pages_and_stops_at_first_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/playlists"))
            .and(header("authorization", "Bearer test-token"))
            .and(query_param("mine", "true"))
            .and(query_param("maxResults", "50"))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [playlist("PL1", "my show"), playlist("PL2", "Other")],
                "nextPageToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/playlists"))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [playlist("PL3", "My Show"), playlist("PL4", "My Show")],
                "nextPageToken": "page-3"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/playlists"))
            .and(query_param("pageToken", "page-3"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let found = client(&server)
            .find_playlist_by_title("My Show")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "PL3");
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_existing_playlist() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/playlists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [playlist("PL1", "My Show")]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/youtube/v3/playlists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(playlist("PLnew", "My Show")))
            .expect(0)
            .mount(&server)
            .await;

        let yt = client(&server);
        assert_eq!(yt.get_or_create_playlist("My Show").await.unwrap(), "PL1");
        assert_eq!(yt.get_or_create_playlist("My Show").await.unwrap(), "PL1");
    }

    #[tokio::test]
    async fn test_get_or_create_creates_private_playlist() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/playlists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "youtube#playlistListResponse"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/youtube/v3/playlists"))
            .and(query_param("part", "snippet,status"))
            .and(body_json(serde_json::json!({
                "snippet": {
                    "title": "My Show",
                    "description": CREATED_PLAYLIST_DESCRIPTION
                },
                "status": {"privacyStatus": "private"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(playlist("PLnew", "My Show")))
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server).get_or_create_playlist("My Show").await.unwrap();
        assert_eq!(id, "PLnew");
    }

    #[tokio::test]
    async fn test_insert_playlist_item() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/youtube/v3/playlistItems"))
            .and(query_param("part", "snippet"))
            .and(body_json(serde_json::json!({
                "snippet": {
                    "playlistId": "PL1",
                    "resourceId": {"kind": "youtube#video", "videoId": "vid123"}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "youtube#playlistItem",
                "id": "item-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let item = client(&server)
            .insert_playlist_item("PL1", "vid123")
            .await
            .unwrap();
        assert_eq!(item.id, "item-1");
    }

    #[tokio::test]
    async fn test_api_errors_carry_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/playlists"))
            .respond_with(ResponseTemplate::new(403).set_body_string("quotaExceeded"))
            .mount(&server)
            .await;

        let err = client(&server)
            .find_playlist_by_title("My Show")
            .await
            .unwrap_err();
        let err = format!("{err:#}");
        assert!(err.contains("403"), "{err}");
        assert!(err.contains("quotaExceeded"), "{err}");
    }

    #[tokio::test]
    async fn test_set_thumbnail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/thumbnails/set"))
            .and(query_param("videoId", "vid123"))
            .and(header("content-type", "image/png"))
            .and(body_string("not really a png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "youtube#thumbnailSetResponse",
                "items": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let thumb = dir.path().join("thumb.png");
        std::fs::write(&thumb, "not really a png").unwrap();

        client(&server).set_thumbnail("vid123", &thumb).await.unwrap();
    }

    #[tokio::test]
    async fn test_resumable_upload_in_chunks() {
        let server = MockServer::start().await;
        let session = format!("{}/upload-session/abc", server.uri());

        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .and(query_param("uploadType", "resumable"))
            .and(query_param("part", "snippet,status"))
            .and(header("x-upload-content-length", "10"))
            .and(header("x-upload-content-type", "video/mp4"))
            .respond_with(ResponseTemplate::new(200).insert_header("Location", session.as_str()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/upload-session/abc"))
            .and(header("content-range", "bytes 0-3/10"))
            .and(body_string("0123"))
            .respond_with(ResponseTemplate::new(308).insert_header("Range", "bytes=0-3"))
            .expect(1)
            .mount(&server)
            .await;
        // the server only keeps part of the second chunk
        Mock::given(method("PUT"))
            .and(path("/upload-session/abc"))
            .and(header("content-range", "bytes 4-7/10"))
            .and(body_string("4567"))
            .respond_with(ResponseTemplate::new(308).insert_header("Range", "bytes=0-5"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/upload-session/abc"))
            .and(header("content-range", "bytes 6-9/10"))
            .and(body_string("6789"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "youtube#video",
                "id": "vid123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("a.mp4");
        std::fs::write(&video, "0123456789").unwrap();

        let request = crate::config::UploadRequest::from_json(
            r#"{"video_path": "a.mp4", "title": "T"}"#,
        )
        .unwrap();
        let mut upload = client(&server)
            .start_video_upload(&video, &VideoInsert::from(&request))
            .await
            .unwrap()
            .with_chunk_size(4);
        assert_eq!(upload.session_url(), session);

        let mut percents = Vec::new();
        let video = loop {
            match upload.next_chunk().await.unwrap() {
                ChunkOutcome::InProgress(progress) => percents.push(progress.percent()),
                ChunkOutcome::Complete(video) => break video,
            }
        };
        assert_eq!(video.id, "vid123");
        assert_eq!(percents, vec![40, 60]);
    }

    #[tokio::test]
    async fn test_empty_file_upload() {
        let server = MockServer::start().await;
        let session = format!("{}/upload-session/empty", server.uri());

        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .respond_with(ResponseTemplate::new(200).insert_header("Location", session.as_str()))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/upload-session/empty"))
            .and(header("content-range", "bytes */0"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "v0"})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("empty.mov");
        std::fs::write(&video, "").unwrap();

        let request = crate::config::UploadRequest::from_json(
            r#"{"video_path": "empty.mov", "title": "T"}"#,
        )
        .unwrap();
        let mut upload = client(&server)
            .start_video_upload(&video, &VideoInsert::from(&request))
            .await
            .unwrap();
        match upload.next_chunk().await.unwrap() {
            ChunkOutcome::Complete(video) => assert_eq!(video.id, "v0"),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_chunk_failure_is_an_error() {
        let server = MockServer::start().await;
        let session = format!("{}/upload-session/bad", server.uri());

        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .respond_with(ResponseTemplate::new(200).insert_header("Location", session.as_str()))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/upload-session/bad"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend error"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("a.mp4");
        std::fs::write(&video, "0123456789").unwrap();

        let request = crate::config::UploadRequest::from_json(
            r#"{"video_path": "a.mp4", "title": "T"}"#,
        )
        .unwrap();
        let mut upload = client(&server)
            .start_video_upload(&video, &VideoInsert::from(&request))
            .await
            .unwrap();
        let err = upload.next_chunk().await.unwrap_err();
        assert!(err.to_string().contains("503"), "{err:#}");
    }

    #[tokio::test]
    async fn test_missing_video_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let request = crate::config::UploadRequest::from_json(
            r#"{"video_path": "nope.mp4", "title": "T"}"#,
        )
        .unwrap();
        let result = client(&server)
            .start_video_upload(
                Path::new("/definitely/not/here.mp4"),
                &VideoInsert::from(&request),
            )
            .await;
        assert!(result.is_err());
    }
}
