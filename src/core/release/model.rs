use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Pseudo-version that resolves to the newest release at use time.
pub const LATEST_VERSION: &str = "latest";

/// Id of the built-in stream. User streams can never take it.
pub const DEFAULT_STREAM_ID: &str = "default";

/// Catalog backend of a stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReleaseStreamType {
    GitHub,
}

impl std::fmt::Display for ReleaseStreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleaseStreamType::GitHub => write!(f, "GitHub"),
        }
    }
}

/// An independently versioned catalog of releases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseStream {
    pub id: String,
    #[serde(rename = "type")]
    pub stream_type: ReleaseStreamType,
    /// In format "Owner/Repository" for GitHub streams.
    pub repository_ref: String,
    /// Required for private repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl ReleaseStream {
    pub fn github(id: impl Into<String>, repository_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stream_type: ReleaseStreamType::GitHub,
            repository_ref: repository_ref.into(),
            auth_token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    /// Key the processed catalog is cached under.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.stream_type, self.repository_ref)
    }
}

/// One resolvable release of a stream for the current platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppRelease {
    pub version: String,
    pub changelog: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Download size in bytes for the current platform, all volumes summed.
    pub download_size_bytes: u64,
}

/// A remote asset that is, or is one volume of, a release artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseAsset {
    pub id: u64,
    pub url: String,
    pub name: String,
    pub size_bytes: u64,
}

/// The downloadable package of one release, split into volumes in
/// concatenation order. A single-file artifact has exactly one volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseArtifact {
    pub volumes: Vec<ReleaseAsset>,
}

impl ReleaseArtifact {
    pub fn total_size(&self) -> u64 {
        self.volumes.iter().map(|v| v.size_bytes).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub version: String,
    pub artifact_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stream_uses_camel_case_field_names() {
        let stream = ReleaseStream::github("beta", "Owner/Beta").with_token(Some("t".into()));
        assert_eq!(
            serde_json::to_value(&stream).unwrap(),
            json!({"id": "beta", "type": "GitHub", "repositoryRef": "Owner/Beta", "authToken": "t"})
        );

        let parsed: ReleaseStream =
            serde_json::from_value(json!({"id": "b", "type": "GitHub", "repositoryRef": "O/R"}))
                .unwrap();
        assert_eq!(parsed, ReleaseStream::github("b", "O/R"));
    }

    #[test]
    fn release_and_asset_use_camel_case_field_names() {
        let release = AppRelease {
            version: "1.0.0".into(),
            changelog: None,
            published_at: None,
            download_size_bytes: 5,
        };
        let value = serde_json::to_value(&release).unwrap();
        assert_eq!(value["downloadSizeBytes"], 5);
        assert!(value.get("publishedAt").is_some());
        assert!(value.get("download_size_bytes").is_none());

        let asset = ReleaseAsset {
            id: 7,
            url: "https://example.invalid/a.zip".into(),
            name: "a.zip".into(),
            size_bytes: 10,
        };
        assert_eq!(serde_json::to_value(&asset).unwrap()["sizeBytes"], 10);
    }
}
