use std::path::{Path, PathBuf};

use crate::core::error::{LauncherError, LauncherResult};

pub const APP_DIR_NAME: &str = "StreamLauncher";

const SETTINGS_FILE: &str = "settings.json";
const CONFIG_FILE: &str = "config.json";
const INSTALL_LOCK_FILE: &str = ".installLock.json";
const DEFAULT_INSTALL_DIR: &str = "game";

/// Filesystem layout of the launcher.
///
/// Everything the launcher writes lives either under the application data
/// directory or under the per-app temp directory. The temp directory is wiped
/// by the interrupted-install cleanup pass, so nothing else may live there.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    app_data_dir: PathBuf,
    temp_dir: PathBuf,
}

impl RuntimePaths {
    pub fn new(app_data_dir: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_data_dir: app_data_dir.into(),
            temp_dir: temp_dir.into(),
        }
    }

    /// Resolve the platform data directory and create it if missing.
    pub fn detect() -> LauncherResult<Self> {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME);
        let temp_dir = std::env::temp_dir().join(APP_DIR_NAME);

        let canonical_data = canonical_or_create_dir(&data_dir)?;

        Ok(Self {
            app_data_dir: canonical_data,
            temp_dir,
        })
    }

    pub fn app_data_dir(&self) -> &Path {
        &self.app_data_dir
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn settings_path(&self) -> PathBuf {
        self.app_data_dir.join(SETTINGS_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.app_data_dir.join(CONFIG_FILE)
    }

    pub fn install_lock_path(&self) -> PathBuf {
        self.app_data_dir.join(INSTALL_LOCK_FILE)
    }

    pub fn default_install_location(&self) -> PathBuf {
        self.app_data_dir.join(DEFAULT_INSTALL_DIR)
    }
}

fn canonical_or_create_dir(path: &Path) -> LauncherResult<PathBuf> {
    std::fs::create_dir_all(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    std::fs::canonicalize(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })
}
