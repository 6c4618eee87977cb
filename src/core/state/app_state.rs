use std::sync::Arc;

use reqwest::Client;
use tracing::info;

use crate::core::config::LauncherConfig;
use crate::core::error::LauncherResult;
use crate::core::http::build_http_client;
use crate::core::installation::InstallationManager;
use crate::core::launch::LaunchCoordinator;
use crate::core::paths::RuntimePaths;
use crate::core::platform::current_platform;
use crate::core::release::{
    GithubReleaseProvider, LauncherUpdateService, ReleaseService, ReleaseStream, DEFAULT_STREAM_ID,
};
use crate::core::store::{JsonFileStore, SettingsStore};

/// Every launcher service, wired once at startup and shared behind an `Arc`.
pub struct AppState {
    pub paths: RuntimePaths,
    pub config: LauncherConfig,
    pub store: Arc<dyn SettingsStore>,
    pub releases: Arc<ReleaseService>,
    pub installs: Arc<InstallationManager>,
    pub launcher: Arc<LaunchCoordinator>,
    pub launcher_updates: Arc<LauncherUpdateService>,
}

impl AppState {
    /// Load config and settings from the data directory of `paths`.
    pub fn new(paths: RuntimePaths) -> LauncherResult<Self> {
        let config = LauncherConfig::load(&paths.config_path())?;
        let store: Arc<dyn SettingsStore> = Arc::new(JsonFileStore::open(paths.settings_path()));
        let client = build_http_client()?;
        Self::with_parts(paths, config, store, client)
    }

    pub fn with_parts(
        paths: RuntimePaths,
        config: LauncherConfig,
        store: Arc<dyn SettingsStore>,
        client: Client,
    ) -> LauncherResult<Self> {
        let platform = current_platform()?;

        let default_stream = ReleaseStream::github(DEFAULT_STREAM_ID, &config.default_stream_repository)
            .with_token(config.default_stream_token.clone());
        let github = Arc::new(GithubReleaseProvider::new(
            client.clone(),
            &config.github_api_base_url,
            platform,
        ));
        let releases = Arc::new(ReleaseService::new(store.clone(), default_stream, github));

        let installs = Arc::new(InstallationManager::new(
            store.clone(),
            releases.clone(),
            paths.clone(),
            &config.executable_name,
        ));
        let launcher = Arc::new(LaunchCoordinator::new(
            store.clone(),
            releases.clone(),
            installs.clone(),
            &config.executable_name,
        ));
        let launcher_updates = Arc::new(LauncherUpdateService::new(
            client,
            &config.github_api_base_url,
            config.launcher_repository.clone(),
            store.clone(),
        ));

        info!(
            "Launcher state ready (platform {}, data dir {:?})",
            platform,
            paths.app_data_dir()
        );

        Ok(Self {
            paths,
            config,
            store,
            releases,
            installs,
            launcher,
            launcher_updates,
        })
    }

    /// Recover from an install interrupted by a previous run. Must complete
    /// before any install is accepted.
    pub async fn initialize(&self) {
        self.installs.cleanup_interrupted_install().await;
    }
}

#[cfg(all(test, any(target_os = "linux", target_os = "windows")))]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    #[tokio::test]
    async fn wiring_uses_config_and_initialize_recovers() {
        let temp = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::new(temp.path().join("app"), temp.path().join("tmp"));
        let config = LauncherConfig {
            default_stream_repository: "Studio/Game-Releases".into(),
            default_stream_token: Some("token".into()),
            ..LauncherConfig::default()
        };

        let state = AppState::with_parts(
            paths.clone(),
            config,
            Arc::new(MemoryStore::new()),
            Client::new(),
        )
        .unwrap();

        let streams = state.releases.streams();
        assert_eq!(streams[0].repository_ref, "Studio/Game-Releases");
        assert_eq!(streams[0].auth_token.as_deref(), Some("token"));
        assert_eq!(state.installs.install_location(), paths.default_install_location());

        std::fs::create_dir_all(paths.app_data_dir()).unwrap();
        std::fs::write(
            paths.install_lock_path(),
            r#"{"schemaVersion":1,"streamId":"default","version":"1.0.0"}"#,
        )
        .unwrap();
        state.initialize().await;
        assert!(!paths.install_lock_path().exists());
    }

    #[test]
    fn new_reads_config_file_from_data_dir() {
        let temp = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::new(temp.path().join("app"), temp.path().join("tmp"));
        std::fs::create_dir_all(paths.app_data_dir()).unwrap();
        std::fs::write(paths.config_path(), r#"{"executable_name":"Other"}"#).unwrap();

        let state = AppState::new(paths).unwrap();
        assert_eq!(state.config.executable_name, "Other");
        assert_eq!(state.releases.streams().len(), 1);
    }
}
