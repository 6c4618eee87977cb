// ─── Launch Coordinator ───
// Resolves the selected stream and version, finds the installed executable
// and runs it. At most one launched process is tracked at a time.

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::installation::InstallationManager;
use crate::core::platform::executable_file_name;
use crate::core::release::{ReleaseService, ReleaseStream, DEFAULT_STREAM_ID, LATEST_VERSION};
use crate::core::store::{SettingsStore, StoreValue};

const CURRENT_STREAM_KEY: &str = "currentReleaseStream";
const CURRENT_VERSION_KEY: &str = "currentAppVersion";
const GRAPHICS_API_KEY: &str = "graphicsApi";

/// Rendering backend forced on the launched executable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GraphicsApi {
    Vulkan,
    Dx12,
    Dx11,
}

impl GraphicsApi {
    pub fn as_str(self) -> &'static str {
        match self {
            GraphicsApi::Vulkan => "Vulkan",
            GraphicsApi::Dx12 => "Dx12",
            GraphicsApi::Dx11 => "Dx11",
        }
    }

    pub fn launch_arg(self) -> &'static str {
        match self {
            GraphicsApi::Vulkan => "-force-vulkan",
            GraphicsApi::Dx12 => "-force-d3d12",
            GraphicsApi::Dx11 => "-force-d3d11",
        }
    }
}

impl FromStr for GraphicsApi {
    type Err = LauncherError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Vulkan" => Ok(GraphicsApi::Vulkan),
            "Dx12" => Ok(GraphicsApi::Dx12),
            "Dx11" => Ok(GraphicsApi::Dx11),
            other => Err(LauncherError::Other(format!("Unknown graphics API: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LaunchOutcome {
    /// The launched process ran and exited.
    Exited { code: Option<i32> },
    /// A previously launched process is still running; nothing was started.
    AlreadyRunning { pid: u32 },
}

pub struct LaunchCoordinator {
    store: Arc<dyn SettingsStore>,
    releases: Arc<ReleaseService>,
    installs: Arc<InstallationManager>,
    executable_name: String,
    running: Arc<Mutex<Option<u32>>>,
}

impl LaunchCoordinator {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        releases: Arc<ReleaseService>,
        installs: Arc<InstallationManager>,
        executable_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            releases,
            installs,
            executable_name: executable_name.into(),
            running: Arc::new(Mutex::new(None)),
        }
    }

    // ── Selection ───────────────────────────────────────

    /// Selected stream. A stored id that no longer names a stream is cleared
    /// and the default stream is returned.
    pub fn current_stream(&self) -> LauncherResult<ReleaseStream> {
        let Some(stream_id) = self.stored_text(CURRENT_STREAM_KEY) else {
            return Ok(self.releases.default_stream().clone());
        };

        match self.releases.find_stream(&stream_id) {
            Some(stream) => Ok(stream),
            None => {
                warn!("Selected stream {} no longer exists, using default", stream_id);
                self.store.delete(CURRENT_STREAM_KEY)?;
                Ok(self.releases.default_stream().clone())
            }
        }
    }

    /// Select a stream. `None` or the default id resets the selection.
    /// Returns `false` for an unknown stream.
    pub fn set_current_stream(&self, stream_id: Option<&str>) -> LauncherResult<bool> {
        match stream_id {
            None | Some("") | Some(DEFAULT_STREAM_ID) => {
                self.store.delete(CURRENT_STREAM_KEY)?;
                Ok(true)
            }
            Some(id) => {
                if self.releases.find_stream(id).is_none() {
                    return Ok(false);
                }
                self.store.set(CURRENT_STREAM_KEY, StoreValue::from(id))?;
                Ok(true)
            }
        }
    }

    /// Selected version, `latest` when none is stored.
    pub fn current_version(&self) -> String {
        self.stored_text(CURRENT_VERSION_KEY)
            .unwrap_or_else(|| LATEST_VERSION.to_string())
    }

    /// Select a version. Whether it exists is not checked.
    pub fn set_current_version(&self, version: Option<&str>) -> LauncherResult<bool> {
        match version {
            None | Some("") | Some(LATEST_VERSION) => self.store.delete(CURRENT_VERSION_KEY)?,
            Some(version) => self.store.set(CURRENT_VERSION_KEY, StoreValue::from(version))?,
        }
        Ok(true)
    }

    pub fn graphics_api(&self) -> Option<GraphicsApi> {
        self.stored_text(GRAPHICS_API_KEY)
            .and_then(|value| value.parse().ok())
    }

    pub fn set_graphics_api(&self, api: Option<GraphicsApi>) -> LauncherResult<()> {
        match api {
            Some(api) => self.store.set(GRAPHICS_API_KEY, StoreValue::from(api.as_str())),
            None => self.store.delete(GRAPHICS_API_KEY),
        }
    }

    fn stored_text(&self, key: &str) -> Option<String> {
        self.store
            .get(key)
            .and_then(|value| value.as_text().map(str::to_string))
            .filter(|value| !value.is_empty())
    }

    fn launch_args(&self) -> Vec<String> {
        self.graphics_api()
            .map(|api| vec![api.launch_arg().to_string()])
            .unwrap_or_default()
    }

    // ── Process ─────────────────────────────────────────

    pub fn running_pid(&self) -> Option<u32> {
        self.running.lock().ok().and_then(|slot| *slot)
    }

    /// Launch the selected version and wait for it to exit.
    ///
    /// If a launched process is still running nothing is started.
    pub async fn launch(&self) -> LauncherResult<LaunchOutcome> {
        let mut child = {
            let mut slot = self
                .running
                .lock()
                .map_err(|_| LauncherError::Other("Launch state is poisoned".into()))?;
            if let Some(pid) = *slot {
                info!("Process {} is still running, not launching again", pid);
                return Ok(LaunchOutcome::AlreadyRunning { pid });
            }

            let stream = self.current_stream()?;
            let version = self.current_version();
            let install_dir = self.installs.version_install_dir(&stream.id, &version)?;
            let executable = install_dir.join(executable_file_name(&self.executable_name));
            let args = self.launch_args();

            debug!("Launching {:?} with args {:?}", executable, args);
            let child = Command::new(&executable)
                .args(&args)
                .current_dir(&install_dir)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(|e| LauncherError::Launch {
                    path: executable.clone(),
                    reason: e.to_string(),
                })?;

            info!(
                "Launched {}/{} (PID {})",
                stream.id,
                version,
                child.id()
            );
            *slot = Some(child.id());
            child
        };

        if let Some(stdout) = child.stdout.take() {
            tokio::task::spawn_blocking(move || {
                for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                    info!("[app][stdout] {}", line);
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::task::spawn_blocking(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    warn!("[app][stderr] {}", line);
                }
            });
        }

        // The waiter owns the slot reset, so it still runs if this future is dropped.
        let running = Arc::clone(&self.running);
        let waited = tokio::task::spawn_blocking(move || {
            let status = child.wait();
            if let Ok(mut slot) = running.lock() {
                *slot = None;
            }
            status
        })
        .await;

        let status = waited
            .map_err(|e| LauncherError::Other(format!("Process wait task failed: {e}")))?
            .map_err(LauncherError::from)?;
        info!("Launched process exited with {}", status);

        Ok(LaunchOutcome::Exited {
            code: status.code(),
        })
    }
}
