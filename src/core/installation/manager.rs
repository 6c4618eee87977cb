// ─── Installation Manager ───
// Turns a (stream, version) request into an installed directory:
//
//   <installLocation>/<streamId>/<version>/
//     .version        concrete version installed there
//     <executable>
//
// Only one install may mutate the disk at a time. The lock record in the app
// data directory names the (stream, version) being written so an interrupted
// run can be wiped on the next start.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use super::lock::InstallLock;
use super::progress::{InstallProgress, InstallStage, InstallationStatus};
use crate::core::error::{error_chain_message, LauncherError, LauncherResult};
use crate::core::installer::ArchiveInstaller;
use crate::core::paths::RuntimePaths;
use crate::core::platform::executable_file_name;
use crate::core::release::ReleaseService;
use crate::core::store::{SettingsStore, StoreValue};

const INSTALL_LOCATION_KEY: &str = "gameInstallLocation";
const VERSION_FILE: &str = ".version";
const WRITE_PROBE_FILE: &str = "checkCanWrite";

pub struct InstallationManager {
    store: Arc<dyn SettingsStore>,
    releases: Arc<ReleaseService>,
    paths: RuntimePaths,
    executable_name: String,
}

impl InstallationManager {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        releases: Arc<ReleaseService>,
        paths: RuntimePaths,
        executable_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            releases,
            paths,
            executable_name: executable_name.into(),
        }
    }

    // ── Install location ────────────────────────────────

    pub fn install_location(&self) -> PathBuf {
        self.store
            .get(INSTALL_LOCATION_KEY)
            .and_then(|v| v.as_text().map(PathBuf::from))
            .unwrap_or_else(|| self.paths.default_install_location())
    }

    /// Change the install location after checking it is writable.
    /// Existing installs are not moved.
    pub async fn set_install_location(&self, location: &Path) -> LauncherResult<()> {
        if location.as_os_str().is_empty() {
            return Err(LauncherError::MissingArgument("location"));
        }

        tokio::fs::create_dir_all(location)
            .await
            .map_err(|source| LauncherError::Io {
                path: location.to_path_buf(),
                source,
            })?;

        let probe = location.join(WRITE_PROBE_FILE);
        tokio::fs::write(&probe, b"")
            .await
            .map_err(|source| LauncherError::Io {
                path: probe.clone(),
                source,
            })?;
        tokio::fs::remove_file(&probe)
            .await
            .map_err(|source| LauncherError::Io {
                path: probe.clone(),
                source,
            })?;

        info!("Install location set to {:?}", location);
        self.store.set(
            INSTALL_LOCATION_KEY,
            StoreValue::Text(location.to_string_lossy().into_owned()),
        )
    }

    /// Directory of `version` of `stream_id` under the current install location.
    pub fn version_install_dir(&self, stream_id: &str, version: &str) -> LauncherResult<PathBuf> {
        if stream_id.is_empty() {
            return Err(LauncherError::MissingArgument("streamId"));
        }
        if version.is_empty() {
            return Err(LauncherError::MissingArgument("version"));
        }

        Ok(self.install_location().join(stream_id).join(version))
    }

    // ── Installed check ─────────────────────────────────

    pub async fn is_version_installed(
        &self,
        stream_id: &str,
        version: &str,
    ) -> LauncherResult<InstallationStatus> {
        let version_file = self.version_install_dir(stream_id, version)?.join(VERSION_FILE);
        let stamp = tokio::fs::read_to_string(&version_file)
            .await
            .ok()
            .filter(|s| !s.is_empty());

        Ok(InstallationStatus {
            installed: stamp.is_some(),
            real_version: stamp,
        })
    }

    pub async fn are_versions_installed(
        &self,
        stream_id: &str,
        versions: &[String],
    ) -> LauncherResult<Vec<InstallationStatus>> {
        let checks = versions
            .iter()
            .map(|version| self.is_version_installed(stream_id, version));
        join_all(checks).await.into_iter().collect()
    }

    // ── Install / update ────────────────────────────────

    /// Install `version` of `stream_id`, or update it if it is already
    /// installed and `force` is not set.
    ///
    /// Every stage is passed to `on_progress` before it starts. Precondition
    /// failures, including another install holding the lock, return `Err`
    /// without reporting anything. All other failures are reported as a
    /// `Failed` stage, trigger the interrupted-install cleanup and are
    /// returned as that terminal progress.
    pub async fn install_or_update(
        &self,
        stream_id: &str,
        version: &str,
        force: bool,
        on_progress: &mut (dyn FnMut(&InstallProgress) + Send),
    ) -> LauncherResult<InstallProgress> {
        if stream_id.is_empty() {
            return Err(LauncherError::MissingArgument("streamId"));
        }
        if version.is_empty() {
            return Err(LauncherError::MissingArgument("version"));
        }

        let lock_path = self.paths.install_lock_path();
        let mut progress = InstallProgress::new(InstallStage::RequestingLatestReleaseInfo);

        match InstallLock::new(stream_id, version).acquire(&lock_path).await {
            Ok(()) => {}
            Err(LauncherError::InstallInProgress) => {
                info!(
                    "Install of {}/{} rejected: another install is in progress",
                    stream_id, version
                );
                return Err(LauncherError::InstallInProgress);
            }
            Err(err) => return Ok(self.fail(progress, err, on_progress).await),
        }

        info!("Install of {}/{} started (force: {})", stream_id, version, force);

        let outcome = match self
            .run_install(stream_id, version, force, &mut progress, on_progress)
            .await
        {
            Ok(()) => InstallLock::release(&lock_path).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(()) => {
                info!("Install of {}/{} finished: {:?}", stream_id, version, progress.stage);
                Ok(progress)
            }
            Err(err) => Ok(self.fail(progress, err, on_progress).await),
        }
    }

    async fn run_install(
        &self,
        stream_id: &str,
        version: &str,
        force: bool,
        progress: &mut InstallProgress,
        on_progress: &mut (dyn FnMut(&InstallProgress) + Send),
    ) -> LauncherResult<()> {
        on_progress(progress);

        let install_dir = self.version_install_dir(stream_id, version)?;
        let status = self.is_version_installed(stream_id, version).await?;
        let stream = self
            .releases
            .find_stream(stream_id)
            .ok_or_else(|| LauncherError::StreamNotFound(stream_id.to_string()))?;

        let release = match (&status.real_version, force) {
            (Some(installed), false) => self.releases.find_update(&stream, installed).await?,
            _ => self.releases.release(&stream, version).await?,
        };

        let Some(release) = release else {
            debug!("{}/{} has nothing newer to install", stream_id, version);
            progress.enter(InstallStage::AlreadyLatest);
            on_progress(progress);
            return Ok(());
        };

        progress.version = Some(release.version.clone());
        progress.download_size_bytes = release.download_size_bytes;
        progress.enter(InstallStage::PreCleanup);
        on_progress(progress);

        if tokio::fs::try_exists(&install_dir).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&install_dir)
                .await
                .map_err(|source| LauncherError::Io {
                    path: install_dir.clone(),
                    source,
                })?;
        }
        tokio::fs::create_dir_all(&install_dir)
            .await
            .map_err(|source| LauncherError::Io {
                path: install_dir.clone(),
                source,
            })?;

        progress.enter(InstallStage::Downloading);
        on_progress(progress);

        let artifact = self
            .releases
            .download_artifact(&stream, &release.version, self.paths.temp_dir(), &mut |bytes| {
                progress.set_bytes(bytes);
                on_progress(progress);
            })
            .await?;
        if progress.stage_progress < 1.0 {
            progress.stage_progress = 1.0;
            on_progress(progress);
        }

        progress.enter(InstallStage::Installing);
        on_progress(progress);

        ArchiveInstaller::install(&artifact.artifact_path, &install_dir, &mut |bytes| {
            progress.set_bytes(bytes);
            on_progress(progress);
        })
        .await?;
        progress.stage_progress = 1.0;
        on_progress(progress);

        self.mark_executable(&install_dir).await?;

        let version_file = install_dir.join(VERSION_FILE);
        tokio::fs::write(&version_file, release.version.as_bytes())
            .await
            .map_err(|source| LauncherError::Io {
                path: version_file.clone(),
                source,
            })?;

        progress.enter(InstallStage::PostCleanup);
        on_progress(progress);

        tokio::fs::remove_file(&artifact.artifact_path)
            .await
            .map_err(|source| LauncherError::Io {
                path: artifact.artifact_path.clone(),
                source,
            })?;

        progress.enter(InstallStage::Complete);
        on_progress(progress);
        Ok(())
    }

    async fn mark_executable(&self, install_dir: &Path) -> LauncherResult<()> {
        let executable = install_dir.join(executable_file_name(&self.executable_name));
        let metadata = tokio::fs::metadata(&executable)
            .await
            .map_err(|source| LauncherError::Io {
                path: executable.clone(),
                source,
            })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = metadata.permissions();
            perms.set_mode(0o755);
            tokio::fs::set_permissions(&executable, perms)
                .await
                .map_err(|source| LauncherError::Io {
                    path: executable.clone(),
                    source,
                })?;
        }
        #[cfg(not(unix))]
        let _ = metadata;

        Ok(())
    }

    async fn fail(
        &self,
        mut progress: InstallProgress,
        err: LauncherError,
        on_progress: &mut (dyn FnMut(&InstallProgress) + Send),
    ) -> InstallProgress {
        let message = error_chain_message(&err);
        error!("Install failed: {}", message);

        progress.stage = InstallStage::Failed;
        progress.error = Some(message);
        on_progress(&progress);

        self.cleanup_interrupted_install().await;
        progress
    }

    // ── Crash recovery ──────────────────────────────────

    /// Wipe whatever an interrupted install left behind: the temp directory,
    /// and the version directory named by the lock record, then the record.
    ///
    /// Runs at startup and after every failed install. Individual failures are
    /// logged and do not stop the pass.
    pub async fn cleanup_interrupted_install(&self) {
        let temp_dir = self.paths.temp_dir();
        if tokio::fs::try_exists(temp_dir).await.unwrap_or(false) {
            if let Err(err) = tokio::fs::remove_dir_all(temp_dir).await {
                warn!("Failed to remove temp dir {:?}: {}", temp_dir, err);
            }
        }

        let lock_path = self.paths.install_lock_path();
        match InstallLock::read(&lock_path).await {
            Ok(None) => return,
            Ok(Some(lock)) => {
                info!(
                    "Cleaning up interrupted install of {}/{}",
                    lock.stream_id, lock.version
                );
                match self.version_install_dir(&lock.stream_id, &lock.version) {
                    Ok(dir) => {
                        if tokio::fs::try_exists(&dir).await.unwrap_or(false) {
                            if let Err(err) = tokio::fs::remove_dir_all(&dir).await {
                                warn!("Failed to remove version dir {:?}: {}", dir, err);
                            }
                        }
                    }
                    Err(err) => warn!("Install lock names no valid directory: {}", err),
                }
            }
            Err(err) => warn!("Unreadable install lock at {:?}, discarding: {}", lock_path, err),
        }

        if let Err(err) = InstallLock::release(&lock_path).await {
            warn!("Failed to remove install lock {:?}: {}", lock_path, err);
        }
    }
}
