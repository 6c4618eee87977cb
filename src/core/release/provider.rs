use std::path::Path;

use async_trait::async_trait;

use super::model::{AppRelease, DownloadedArtifact, ReleaseStream};
use crate::core::error::LauncherResult;

/// A catalog backend able to list, resolve and download releases of a stream.
#[async_trait]
pub trait ReleaseProvider: Send + Sync {
    /// Last `limit` releases, most recent first. `None` returns all of them.
    async fn last_releases(
        &self,
        stream: &ReleaseStream,
        limit: Option<usize>,
    ) -> LauncherResult<Vec<AppRelease>>;

    /// Release by version. `LATEST_VERSION` resolves to the newest release.
    async fn release(
        &self,
        stream: &ReleaseStream,
        version: &str,
    ) -> LauncherResult<Option<AppRelease>>;

    /// Newest release if it is newer than `version`. `version` must be concrete.
    async fn find_update(
        &self,
        stream: &ReleaseStream,
        version: &str,
    ) -> LauncherResult<Option<AppRelease>>;

    /// Download the platform artifact of `version` into `destination`.
    /// `version` must be concrete.
    async fn download_artifact(
        &self,
        stream: &ReleaseStream,
        version: &str,
        destination: &Path,
        on_progress: &mut (dyn FnMut(u64) + Send),
    ) -> LauncherResult<DownloadedArtifact>;
}
