//! Upload a video to YouTube from a JSON config, then optionally set its thumbnail and file it
//! into a playlist.
//!
//! A run goes through these stages, in order:
//!
//! 1. [`UploadRequest::load`] reads the config and rejects it if required fields are missing.
//! 2. [`CredentialManager::obtain`] produces a valid OAuth token, refreshing or asking the user
//!    to authorize as needed, and persists it.
//! 3. [`pipeline::run`] uploads the video, then the thumbnail, then handles the playlist.

pub mod config;
pub mod credentials;
pub mod oauth;
pub mod pipeline;
pub mod youtube_api;

pub use config::{CategoryId, ConfigError, Privacy, UploadRequest};
pub use credentials::{CredentialManager, StoredToken};
pub use oauth::OAuthManager;
pub use pipeline::{RunReport, ThumbnailOutcome};
pub use youtube_api::YouTubeClient;
