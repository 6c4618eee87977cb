// ─── Release Service ───
// Registry of release streams (the built-in default stream plus streams the
// user added) and dispatch of catalog operations to the provider that
// serves each stream type.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use super::model::{AppRelease, DownloadedArtifact, ReleaseStream, ReleaseStreamType, DEFAULT_STREAM_ID};
use super::provider::ReleaseProvider;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::store::{SettingsStore, StoreValue};

const CUSTOM_STREAMS_KEY: &str = "customReleaseStreams";
const DEFAULT_RELEASES_LIMIT: usize = 50;

pub struct ReleaseService {
    store: Arc<dyn SettingsStore>,
    default_stream: ReleaseStream,
    github: Arc<dyn ReleaseProvider>,
}

impl ReleaseService {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        default_stream: ReleaseStream,
        github: Arc<dyn ReleaseProvider>,
    ) -> Self {
        Self {
            store,
            default_stream,
            github,
        }
    }

    pub fn default_stream(&self) -> &ReleaseStream {
        &self.default_stream
    }

    // ── Stream registry ─────────────────────────────────

    /// All known streams, the default stream first.
    pub fn streams(&self) -> Vec<ReleaseStream> {
        let mut streams = vec![self.default_stream.clone()];
        streams.extend(self.stored_streams());
        streams
    }

    pub fn find_stream(&self, stream_id: &str) -> Option<ReleaseStream> {
        self.streams().into_iter().find(|s| s.id == stream_id)
    }

    /// Add a user stream, replacing any stored stream with the same id.
    /// Returns `false` when the stream would shadow the default stream.
    pub fn add_stream(&self, stream: ReleaseStream) -> LauncherResult<bool> {
        if stream.id.trim().is_empty() {
            return Err(LauncherError::MissingArgument("stream id"));
        }
        if stream.id == DEFAULT_STREAM_ID {
            return Ok(false);
        }

        let mut stored = self.stored_streams();
        match stored.iter_mut().find(|s| s.id == stream.id) {
            Some(existing) => {
                debug!("Replacing release stream {}", stream.id);
                *existing = stream;
            }
            None => {
                info!("Adding release stream {} ({})", stream.id, stream.repository_ref);
                stored.push(stream);
            }
        }

        self.save_streams(&stored)?;
        Ok(true)
    }

    /// Remove a user stream. Returns `false` for the default stream or an
    /// unknown id.
    pub fn remove_stream(&self, stream_id: &str) -> LauncherResult<bool> {
        if stream_id == DEFAULT_STREAM_ID {
            return Ok(false);
        }

        let mut stored = self.stored_streams();
        let before = stored.len();
        stored.retain(|s| s.id != stream_id);
        if stored.len() == before {
            return Ok(false);
        }

        info!("Removed release stream {}", stream_id);
        self.save_streams(&stored)?;
        Ok(true)
    }

    fn stored_streams(&self) -> Vec<ReleaseStream> {
        self.store
            .get(CUSTOM_STREAMS_KEY)
            .and_then(|value| value.decode::<Vec<ReleaseStream>>())
            .unwrap_or_default()
            .into_iter()
            .filter(|s| s.id != DEFAULT_STREAM_ID)
            .collect()
    }

    fn save_streams(&self, streams: &[ReleaseStream]) -> LauncherResult<()> {
        self.store
            .set(CUSTOM_STREAMS_KEY, StoreValue::encode(&streams)?)
    }

    // ── Catalog dispatch ────────────────────────────────

    fn provider_for(&self, stream: &ReleaseStream) -> &dyn ReleaseProvider {
        match stream.stream_type {
            ReleaseStreamType::GitHub => self.github.as_ref(),
        }
    }

    /// Most recent releases first, 50 when no limit is given.
    pub async fn last_releases(
        &self,
        stream: &ReleaseStream,
        limit: Option<usize>,
    ) -> LauncherResult<Vec<AppRelease>> {
        self.provider_for(stream)
            .last_releases(stream, Some(limit.unwrap_or(DEFAULT_RELEASES_LIMIT)))
            .await
    }

    pub async fn release(
        &self,
        stream: &ReleaseStream,
        version: &str,
    ) -> LauncherResult<Option<AppRelease>> {
        self.provider_for(stream).release(stream, version).await
    }

    pub async fn find_update(
        &self,
        stream: &ReleaseStream,
        version: &str,
    ) -> LauncherResult<Option<AppRelease>> {
        self.provider_for(stream).find_update(stream, version).await
    }

    pub async fn download_artifact(
        &self,
        stream: &ReleaseStream,
        version: &str,
        destination: &Path,
        on_progress: &mut (dyn FnMut(u64) + Send),
    ) -> LauncherResult<DownloadedArtifact> {
        self.provider_for(stream)
            .download_artifact(stream, version, destination, on_progress)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Provider that records the limits it was asked for.
    #[derive(Default)]
    struct RecordingProvider {
        limits: Mutex<Vec<Option<usize>>>,
    }

    #[async_trait]
    impl ReleaseProvider for RecordingProvider {
        async fn last_releases(
            &self,
            _stream: &ReleaseStream,
            limit: Option<usize>,
        ) -> LauncherResult<Vec<AppRelease>> {
            self.limits.lock().unwrap().push(limit);
            Ok(Vec::new())
        }

        async fn release(&self, _: &ReleaseStream, _: &str) -> LauncherResult<Option<AppRelease>> {
            Ok(None)
        }

        async fn find_update(&self, _: &ReleaseStream, _: &str) -> LauncherResult<Option<AppRelease>> {
            Ok(None)
        }

        async fn download_artifact(
            &self,
            _: &ReleaseStream,
            version: &str,
            _: &Path,
            _: &mut (dyn FnMut(u64) + Send),
        ) -> LauncherResult<DownloadedArtifact> {
            Err(LauncherError::Other(format!("no artifact for {version}")))
        }
    }

    fn service() -> (ReleaseService, Arc<RecordingProvider>) {
        let provider = Arc::new(RecordingProvider::default());
        let service = ReleaseService::new(
            Arc::new(MemoryStore::new()),
            ReleaseStream::github(DEFAULT_STREAM_ID, "Owner/Main"),
            provider.clone(),
        );
        (service, provider)
    }

    #[test]
    fn default_stream_comes_first_and_cannot_be_shadowed() {
        let (service, _) = service();
        assert!(service.add_stream(ReleaseStream::github("beta", "Owner/Beta")).unwrap());
        assert!(!service.add_stream(ReleaseStream::github(DEFAULT_STREAM_ID, "Evil/Repo")).unwrap());

        let ids: Vec<String> = service.streams().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["default", "beta"]);
        assert_eq!(service.streams()[0].repository_ref, "Owner/Main");
    }

    #[test]
    fn adding_existing_id_replaces_it() {
        let (service, _) = service();
        service.add_stream(ReleaseStream::github("beta", "Owner/Old")).unwrap();
        service
            .add_stream(ReleaseStream::github("beta", "Owner/New").with_token(Some("t".into())))
            .unwrap();

        let streams = service.streams();
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[1].repository_ref, "Owner/New");
        assert_eq!(streams[1].auth_token.as_deref(), Some("t"));
    }

    #[test]
    fn remove_rejects_default_and_unknown() {
        let (service, _) = service();
        service.add_stream(ReleaseStream::github("beta", "Owner/Beta")).unwrap();

        assert!(!service.remove_stream(DEFAULT_STREAM_ID).unwrap());
        assert!(!service.remove_stream("missing").unwrap());
        assert!(service.remove_stream("beta").unwrap());
        assert_eq!(service.streams().len(), 1);
        assert!(service.find_stream("beta").is_none());
    }

    #[tokio::test]
    async fn listing_defaults_to_fifty_releases() {
        let (service, provider) = service();
        let stream = service.default_stream().clone();

        service.last_releases(&stream, None).await.unwrap();
        service.last_releases(&stream, Some(5)).await.unwrap();

        assert_eq!(*provider.limits.lock().unwrap(), vec![Some(50), Some(5)]);
    }
}
