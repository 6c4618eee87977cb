// ─── GitHub Release Provider ───
// Reads a repository's releases through the GitHub REST API, keeps only
// published releases that carry an artifact for the current platform and
// caches the processed catalog for the lifetime of the process.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::model::{
    AppRelease, DownloadedArtifact, ReleaseArtifact, ReleaseAsset, ReleaseStream, LATEST_VERSION,
};
use super::provider::ReleaseProvider;
use super::version::{compare_versions, is_newer};
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};

const PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Clone, Deserialize)]
struct GithubAsset {
    id: u64,
    url: String,
    name: String,
    size: u64,
}

impl From<&GithubAsset> for ReleaseAsset {
    fn from(asset: &GithubAsset) -> Self {
        Self {
            id: asset.id,
            url: asset.url.clone(),
            name: asset.name.clone(),
            size_bytes: asset.size,
        }
    }
}

#[derive(Debug)]
struct ProcessedRelease {
    release: AppRelease,
    artifact: ReleaseArtifact,
}

/// Processed catalog of one repository, newest first.
#[derive(Debug, Default)]
struct RepoReleases {
    releases: Vec<ProcessedRelease>,
    by_version: HashMap<String, usize>,
}

impl RepoReleases {
    fn from_raw(raw: Vec<GithubRelease>, platform: &str) -> Self {
        // Order of releases can differ from order of tags.
        let mut releases: Vec<ProcessedRelease> = raw
            .into_iter()
            .filter(|r| !r.draft && !r.prerelease)
            .filter_map(|r| {
                let artifact = find_platform_artifact(&r.assets, platform)?;
                Some(ProcessedRelease {
                    release: AppRelease {
                        version: r.tag_name,
                        changelog: r.body,
                        published_at: r.published_at,
                        download_size_bytes: artifact.total_size(),
                    },
                    artifact,
                })
            })
            .collect();
        releases.sort_by(|a, b| compare_versions(&b.release.version, &a.release.version));

        let mut by_version = HashMap::with_capacity(releases.len());
        for (index, processed) in releases.iter().enumerate() {
            by_version
                .entry(processed.release.version.clone())
                .or_insert(index);
        }

        Self {
            releases,
            by_version,
        }
    }

    fn get(&self, version: &str) -> Option<&ProcessedRelease> {
        self.by_version
            .get(version)
            .and_then(|&index| self.releases.get(index))
    }

    fn latest(&self) -> Option<&ProcessedRelease> {
        self.releases.first()
    }
}

/// Find `<platform>.zip`, or the `<platform>.zip.NNN` volume set in name order.
fn find_platform_artifact(assets: &[GithubAsset], platform: &str) -> Option<ReleaseArtifact> {
    let single_name = format!("{platform}.zip");
    if let Some(single) = assets.iter().find(|a| a.name == single_name) {
        return Some(ReleaseArtifact {
            volumes: vec![single.into()],
        });
    }

    let volume_prefix = format!("{platform}.zip.");
    let mut volumes: Vec<ReleaseAsset> = assets
        .iter()
        .filter(|a| a.name.starts_with(&volume_prefix))
        .map(ReleaseAsset::from)
        .collect();
    if volumes.is_empty() {
        return None;
    }
    volumes.sort_by(|a, b| a.name.cmp(&b.name));

    Some(ReleaseArtifact { volumes })
}

pub struct GithubReleaseProvider {
    client: Client,
    downloader: Downloader,
    api_base_url: String,
    platform: String,
    cache: Mutex<HashMap<String, Arc<RepoReleases>>>,
    /// One fetch lock per cache key. tokio's mutex queues waiters in FIFO order.
    fetch_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl GithubReleaseProvider {
    pub fn new(client: Client, api_base_url: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            downloader: Downloader::new(client.clone()),
            client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            platform: platform.into(),
            cache: Mutex::new(HashMap::new()),
            fetch_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn cached(&self, key: &str) -> Option<Arc<RepoReleases>> {
        self.cache.lock().await.get(key).cloned()
    }

    async fn fetch_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.fetch_locks
            .lock()
            .await
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Cached catalog of `stream`, fetching it at most once at a time.
    ///
    /// Callers arriving while a fetch is in flight wait on the key's lock and
    /// then read the cache. If the fetch failed nothing was cached, so each
    /// waiter performs its own fetch in turn.
    async fn repo_releases(&self, stream: &ReleaseStream) -> LauncherResult<Arc<RepoReleases>> {
        let key = stream.cache_key();
        if let Some(cached) = self.cached(&key).await {
            return Ok(cached);
        }

        let lock = self.fetch_lock(&key).await;
        let _guard = lock.lock().await;

        if let Some(cached) = self.cached(&key).await {
            return Ok(cached);
        }

        let raw = self.fetch_all_releases(stream).await?;
        let processed = Arc::new(RepoReleases::from_raw(raw, &self.platform));
        info!(
            "Loaded {} release(s) for {} from stream {}",
            processed.releases.len(),
            self.platform,
            stream.id
        );

        self.cache.lock().await.insert(key, processed.clone());
        Ok(processed)
    }

    async fn fetch_all_releases(&self, stream: &ReleaseStream) -> LauncherResult<Vec<GithubRelease>> {
        let mut releases = Vec::new();
        let mut page = 1;

        loop {
            let endpoint = format!("releases?per_page={PER_PAGE}&page={page}");
            let Some(batch) = self
                .request_api::<Vec<GithubRelease>>(stream, &endpoint)
                .await?
            else {
                break;
            };

            let is_last_page = batch.len() < PER_PAGE;
            releases.extend(batch);
            if is_last_page {
                break;
            }
            page += 1;
        }

        debug!("Fetched {} raw release(s) from {}", releases.len(), stream.repository_ref);
        Ok(releases)
    }

    /// GET an API endpoint of the stream's repository. 404 means "no data".
    async fn request_api<T: serde::de::DeserializeOwned>(
        &self,
        stream: &ReleaseStream,
        endpoint: &str,
    ) -> LauncherResult<Option<T>> {
        let url = format!(
            "{}/repos/{}/{}",
            self.api_base_url, stream.repository_ref, endpoint
        );

        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &stream.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("GitHub returned 404 for {}", url);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LauncherError::RequestFailed {
                url,
                status: status.as_u16(),
            });
        }

        Ok(Some(response.json::<T>().await?))
    }
}

#[async_trait]
impl ReleaseProvider for GithubReleaseProvider {
    async fn last_releases(
        &self,
        stream: &ReleaseStream,
        limit: Option<usize>,
    ) -> LauncherResult<Vec<AppRelease>> {
        let repo = self.repo_releases(stream).await?;
        let take = limit.unwrap_or(repo.releases.len());
        Ok(repo
            .releases
            .iter()
            .take(take)
            .map(|p| p.release.clone())
            .collect())
    }

    async fn release(
        &self,
        stream: &ReleaseStream,
        version: &str,
    ) -> LauncherResult<Option<AppRelease>> {
        let repo = self.repo_releases(stream).await?;
        let found = if version == LATEST_VERSION {
            repo.latest()
        } else {
            repo.get(version)
        };
        Ok(found.map(|p| p.release.clone()))
    }

    async fn find_update(
        &self,
        stream: &ReleaseStream,
        version: &str,
    ) -> LauncherResult<Option<AppRelease>> {
        if version == LATEST_VERSION {
            return Err(LauncherError::PseudoVersionNotAllowed(version.to_string()));
        }

        let repo = self.repo_releases(stream).await?;
        Ok(repo
            .latest()
            .filter(|latest| is_newer(&latest.release.version, version))
            .map(|latest| latest.release.clone()))
    }

    async fn download_artifact(
        &self,
        stream: &ReleaseStream,
        version: &str,
        destination: &Path,
        on_progress: &mut (dyn FnMut(u64) + Send),
    ) -> LauncherResult<DownloadedArtifact> {
        if version == LATEST_VERSION {
            return Err(LauncherError::PseudoVersionNotAllowed(version.to_string()));
        }

        let repo = self.repo_releases(stream).await?;
        let processed = repo.get(version).ok_or_else(|| LauncherError::ReleaseNotFound {
            stream: stream.id.clone(),
            version: version.to_string(),
        })?;

        let artifact_path = destination.join(format!("{}.zip", self.platform));
        self.downloader
            .download_volumes(
                &processed.artifact.volumes,
                &artifact_path,
                stream.auth_token.as_deref(),
                on_progress,
            )
            .await?;

        Ok(DownloadedArtifact {
            version: processed.release.version.clone(),
            artifact_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::{json, Value};

    const REPO: &str = "Acme/Game-Releases";

    fn stream() -> ReleaseStream {
        ReleaseStream::github("default", REPO)
    }

    fn provider(server: &ServerGuard) -> GithubReleaseProvider {
        GithubReleaseProvider::new(Client::new(), server.url(), "linux64")
    }

    fn release_json(tag: &str, assets: Value) -> Value {
        json!({
            "tag_name": tag,
            "body": format!("changes in {tag}"),
            "draft": false,
            "prerelease": false,
            "published_at": "2024-03-01T12:00:00Z",
            "assets": assets,
        })
    }

    fn asset_json(id: u64, name: &str, size: u64) -> Value {
        json!({ "id": id, "url": format!("https://example.invalid/assets/{id}"), "name": name, "size": size })
    }

    async fn mock_page(server: &mut ServerGuard, page: u32, body: Value) -> mockito::Mock {
        server
            .mock("GET", format!("/repos/{REPO}/releases").as_str())
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), page.to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    #[tokio::test]
    async fn filters_sorts_and_detects_volumes() {
        let mut server = Server::new_async().await;
        let mut draft = release_json("3.0.0", json!([asset_json(1, "linux64.zip", 10)]));
        draft["draft"] = json!(true);
        let mut pre = release_json("2.5.0", json!([asset_json(2, "linux64.zip", 10)]));
        pre["prerelease"] = json!(true);
        let body = json!([
            release_json("1.0.0", json!([asset_json(3, "linux64.zip", 100)])),
            draft,
            pre,
            release_json("1.1.0", json!([asset_json(4, "win64.zip", 50)])),
            release_json(
                "2.0.0",
                json!([
                    asset_json(6, "linux64.zip.002", 40),
                    asset_json(5, "linux64.zip.001", 60),
                    asset_json(7, "win64.zip", 90),
                ])
            ),
        ]);
        let _page = mock_page(&mut server, 1, body).await;

        let provider = provider(&server);
        let releases = provider.last_releases(&stream(), None).await.unwrap();

        let versions: Vec<&str> = releases.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["2.0.0", "1.0.0"]);
        assert_eq!(releases[0].download_size_bytes, 100);
        assert_eq!(releases[0].changelog.as_deref(), Some("changes in 2.0.0"));
        assert!(releases[0].published_at.is_some());

        let repo = provider.repo_releases(&stream()).await.unwrap();
        let names: Vec<&str> = repo
            .get("2.0.0")
            .unwrap()
            .artifact
            .volumes
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(names, vec!["linux64.zip.001", "linux64.zip.002"]);
    }

    #[tokio::test]
    async fn paginates_until_short_page() {
        let mut server = Server::new_async().await;
        let full_page: Vec<Value> = (0..100)
            .map(|i| release_json(&format!("0.{i:03}"), json!([asset_json(i, "linux64.zip", 1)])))
            .collect();
        let first = mock_page(&mut server, 1, Value::Array(full_page)).await;
        let second = mock_page(
            &mut server,
            2,
            json!([release_json("1.0.0", json!([asset_json(500, "linux64.zip", 1)]))]),
        )
        .await;

        let provider = provider(&server);
        let releases = provider.last_releases(&stream(), None).await.unwrap();
        assert_eq!(releases.len(), 101);
        assert_eq!(releases[0].version, "1.0.0");

        let limited = provider.last_releases(&stream(), Some(5)).await.unwrap();
        assert_eq!(limited.len(), 5);

        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn missing_repository_is_an_empty_catalog() {
        let mut server = Server::new_async().await;
        let _missing = server
            .mock("GET", format!("/repos/{REPO}/releases").as_str())
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let provider = provider(&server);
        assert!(provider.last_releases(&stream(), None).await.unwrap().is_empty());
        assert_eq!(provider.release(&stream(), LATEST_VERSION).await.unwrap(), None);
        assert_eq!(provider.find_update(&stream(), "1.0.0").await.unwrap(), None);
    }

    #[tokio::test]
    async fn server_error_is_a_transport_error() {
        let mut server = Server::new_async().await;
        let _failing = server
            .mock("GET", format!("/repos/{REPO}/releases").as_str())
            .match_query(Matcher::Any)
            .with_status(502)
            .create_async()
            .await;

        let err = provider(&server)
            .last_releases(&stream(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::RequestFailed { status: 502, .. }));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", format!("/repos/{REPO}/releases").as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!([release_json("1.0.0", json!([asset_json(1, "linux64.zip", 5)]))]).to_string())
            .expect(1)
            .create_async()
            .await;

        let provider = provider(&server);
        let stream = stream();
        let calls = (0..8).map(|_| provider.last_releases(&stream, None));
        let results = futures_util::future::join_all(calls).await;

        for result in results {
            assert_eq!(result.unwrap().len(), 1);
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failed_shared_fetch_leaves_nothing_cached_and_waiters_retry() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", format!("/repos/{REPO}/releases").as_str())
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let recovered = server
            .mock("GET", format!("/repos/{REPO}/releases").as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!([release_json("1.0.0", json!([asset_json(1, "linux64.zip", 5)]))]).to_string())
            .expect(1)
            .create_async()
            .await;

        let provider = provider(&server);
        let stream = stream();
        let calls = (0..6).map(|_| provider.last_releases(&stream, None));
        let results = futures_util::future::join_all(calls).await;

        let failures: Vec<&LauncherError> =
            results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], LauncherError::RequestFailed { status: 503, .. }));
        for release_list in results.iter().filter_map(|r| r.as_ref().ok()) {
            assert_eq!(release_list.len(), 1);
        }

        failing.assert_async().await;
        recovered.assert_async().await;
        assert!(provider.cached(&stream.cache_key()).await.is_some());
    }

    #[tokio::test]
    async fn latest_and_update_resolution() {
        let mut server = Server::new_async().await;
        let _page = mock_page(
            &mut server,
            1,
            json!([
                release_json("1.0.0", json!([asset_json(1, "linux64.zip", 5)])),
                release_json("1.2.0", json!([asset_json(2, "linux64.zip", 5)])),
            ]),
        )
        .await;

        let provider = provider(&server);
        let stream = stream();

        let latest = provider.release(&stream, LATEST_VERSION).await.unwrap().unwrap();
        assert_eq!(latest.version, "1.2.0");
        let exact = provider.release(&stream, "1.0.0").await.unwrap().unwrap();
        assert_eq!(exact.version, "1.0.0");
        assert_eq!(provider.release(&stream, "0.1.0").await.unwrap(), None);

        let update = provider.find_update(&stream, "1.0.0").await.unwrap();
        assert_eq!(update.map(|r| r.version), Some("1.2.0".to_string()));
        assert_eq!(provider.find_update(&stream, "1.2.0").await.unwrap(), None);

        let err = provider.find_update(&stream, LATEST_VERSION).await.unwrap_err();
        assert!(matches!(err, LauncherError::PseudoVersionNotAllowed(_)));
    }

    #[tokio::test]
    async fn downloads_multi_volume_artifact() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let volume = |id: u64, name: &str, size: u64| {
            json!({ "id": id, "url": format!("{base}/assets/{id}"), "name": name, "size": size })
        };
        let _page = mock_page(
            &mut server,
            1,
            json!([release_json(
                "2.0.0",
                json!([volume(12, "linux64.zip.002", 3), volume(11, "linux64.zip.001", 3)])
            )]),
        )
        .await;
        let _first = server.mock("GET", "/assets/11").with_body("abc").create_async().await;
        let _second = server.mock("GET", "/assets/12").with_body("def").create_async().await;

        let temp = tempfile::tempdir().unwrap();
        let mut last = 0;
        let downloaded = provider(&server)
            .download_artifact(&stream(), "2.0.0", temp.path(), &mut |bytes| last = bytes)
            .await
            .unwrap();

        assert_eq!(downloaded.version, "2.0.0");
        assert_eq!(downloaded.artifact_path, temp.path().join("linux64.zip"));
        assert_eq!(std::fs::read_to_string(&downloaded.artifact_path).unwrap(), "abcdef");
        assert_eq!(last, 6);
    }
}
