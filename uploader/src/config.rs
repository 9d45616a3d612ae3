//! Loading of the per-run upload configuration.
//!
//! The automation trigger that launches us drops a flat JSON object on disk describing what to
//! upload. This module turns that object into an immutable [`UploadRequest`], filling in defaults
//! for everything optional and rejecting the run early if the required fields are missing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where the automation trigger writes the config file unless told otherwise.
pub const DEFAULT_CONFIG_PATH: &str =
    "/storage/emulated/0/+TaskerData/YoutubeUpload/uploadconfig.json";

/// Errors that make the config unusable.
///
/// All of these abort the run before any credential or network work happens.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("could not read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {} is not valid JSON", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("config is not a JSON object")]
    NotAnObject,
    #[error("`{0}` is required but missing or empty")]
    MissingField(&'static str),
}

/// A YouTube video category identifier.
///
/// YouTube's assignable categories are numbered `1` through `31`; anything else falls back to
/// [`CategoryId::DEFAULT`] ("People & Blogs").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryId(u8);

impl CategoryId {
    pub const DEFAULT: CategoryId = CategoryId(22);

    /// Parses a category the way the config expresses it: the exact decimal strings `"1"`..`"31"`.
    ///
    /// Leading zeros, whitespace and signs are all rejected.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || s.starts_with('0') || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match s.parse::<u8>() {
            Ok(n @ 1..=31) => Some(CategoryId(n)),
            _ => None,
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for CategoryId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// The API carries category ids as strings.
impl Serialize for CategoryId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Who can see an uploaded video or a created playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Private,
    Unlisted,
    Public,
}

impl Privacy {
    /// Case-sensitive match against the API's privacy status names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "private" => Some(Privacy::Private),
            "unlisted" => Some(Privacy::Unlisted),
            "public" => Some(Privacy::Public),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Privacy::Private => "private",
            Privacy::Unlisted => "unlisted",
            Privacy::Public => "public",
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to perform one upload run.
///
/// Built once at startup by [`UploadRequest::load`] and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub video_path: PathBuf,
    pub title: String,
    pub description: String,
    /// Never contains empty entries.
    pub tags: Vec<String>,
    pub category_id: CategoryId,
    pub privacy: Privacy,
    pub playlist_name: Option<String>,
    /// Only set if the file existed when the config was loaded.
    pub thumbnail_path: Option<PathBuf>,
}

impl UploadRequest {
    /// Reads and validates the config file at `path`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = match tokio::fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let value: Value = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let request = Self::from_value(value)?;
        tracing::debug!(config = %path.display(), ?request, "loaded upload config");
        Ok(request)
    }

    /// Like [`Self::load`], but over an in-memory JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<memory>"),
            source,
        })?;
        Self::from_value(value)
    }

    fn from_value(value: Value) -> Result<Self, ConfigError> {
        let Value::Object(config) = value else {
            return Err(ConfigError::NotAnObject);
        };

        let video_path = non_empty_str(&config, "video_path")
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingField("video_path"))?;
        let title = non_empty_str(&config, "title")
            .map(str::to_owned)
            .ok_or(ConfigError::MissingField("title"))?;

        let description = string_field(&config, "description")
            .unwrap_or_default()
            .to_owned();
        let tags = string_field(&config, "tags")
            .map(split_tags)
            .unwrap_or_default();
        let category_id = string_field(&config, "category_id")
            .and_then(CategoryId::parse)
            .unwrap_or_default();
        let privacy = string_field(&config, "privacy")
            .and_then(Privacy::parse)
            .unwrap_or_default();
        let playlist_name = non_empty_str(&config, "playlist_name").map(str::to_owned);

        let thumbnail_path = non_empty_str(&config, "thumbnail_path").and_then(|p| {
            let p = PathBuf::from(p);
            if p.exists() {
                Some(p)
            } else {
                println!(
                    "Thumbnail path invalid, skipping thumbnail: {}",
                    p.display()
                );
                None
            }
        });

        Ok(Self {
            video_path,
            title,
            description,
            tags,
            category_id,
            privacy,
            playlist_name,
            thumbnail_path,
        })
    }
}

/// String-valued field lookup; values of any other JSON type count as absent.
fn string_field<'a>(config: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    config.get(key).and_then(Value::as_str)
}

fn non_empty_str<'a>(config: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    string_field(config, key).filter(|s| !s.is_empty())
}

fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}
