//! Release and asset types exchanged with the hosting platform.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{ReleaseError, Result};

/// Fallback MIME type for files with an unknown extension.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Repository coordinates (`owner/repo`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl RepoSlug {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl FromStr for RepoSlug {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((owner, repo)) = s.trim().split_once('/') else {
            return Err(format!("invalid repository '{s}': expected owner/repo"));
        };
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(format!("invalid repository '{s}': expected owner/repo"));
        }
        Ok(Self::new(owner, repo))
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A release as reported by the hosting platform.
///
/// Unknown fields in API responses are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,

    #[serde(default)]
    pub tag_name: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub target_commitish: String,

    #[serde(default)]
    pub draft: bool,

    #[serde(default)]
    pub prerelease: bool,

    /// Upload endpoint template, e.g. `https://uploads.github.com/.../assets{?name,label}`.
    #[serde(default)]
    pub upload_url: String,

    /// Public URL of the release page.
    #[serde(default)]
    pub html_url: String,

    #[serde(default)]
    pub assets: Vec<AssetRef>,
}

/// An asset already attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub id: u64,
    pub name: String,
}

/// Whether a release should become the repository's latest release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MakeLatest {
    True,
    False,
    Legacy,
}

impl FromStr for MakeLatest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "true" => Ok(Self::True),
            "false" => Ok(Self::False),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!(
                "invalid make_latest '{other}': expected true, false or legacy"
            )),
        }
    }
}

/// Payload for creating or updating a release.
///
/// Absent optionals are not sent so the platform keeps its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReleaseRequest {
    pub tag_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_commitish: Option<String>,

    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prerelease: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussion_category_name: Option<String>,

    pub generate_release_notes: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub make_latest: Option<MakeLatest>,
}

/// One page of a release listing.
#[derive(Debug, Clone, Default)]
pub struct ReleasePage {
    pub releases: Vec<Release>,

    /// Whether another page follows this one.
    pub has_next: bool,
}

/// A local file staged for upload.
#[derive(Debug, Clone)]
pub struct LocalAsset {
    /// Basename of the file; becomes the asset name.
    pub name: String,
    pub mime: String,
    pub size: u64,
    pub data: Bytes,
}

impl LocalAsset {
    /// Read a file from disk.
    pub async fn read(path: &Path) -> Result<Self> {
        let io_err = |source| ReleaseError::Io {
            path: path.to_path_buf(),
            source,
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io_err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "path has no file name",
                ))
            })?;
        let data = tokio::fs::read(path).await.map_err(io_err)?;

        Ok(Self {
            name,
            mime: mime_or_default(path),
            size: data.len() as u64,
            data: Bytes::from(data),
        })
    }
}

/// MIME type for a path, by extension.
pub fn mime_or_default(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}

/// Metadata returned by the upload endpoint.
///
/// Empty when a tolerated upload failure produced no result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetMetadata(serde_json::Map<String, serde_json::Value>);

impl AssetMetadata {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn id(&self) -> Option<u64> {
        self.0.get("id").and_then(serde_json::Value::as_u64)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(serde_json::Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Drop the `uploader` account object before exposing the metadata.
    pub fn without_uploader(mut self) -> Self {
        self.0.remove("uploader");
        self
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for AssetMetadata {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }
}
