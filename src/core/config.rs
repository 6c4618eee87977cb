// ─── Launcher Config ───
// Static launcher configuration read once at startup from `config.json`
// in the application data directory. Every field has a default so the file
// is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};

pub const GITHUB_API_BASE_URL: &str = "https://api.github.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// "Owner/Repository" of the built-in default stream.
    pub default_stream_repository: String,
    /// Token for the default stream when its repository is private.
    pub default_stream_token: Option<String>,
    /// "Owner/Repository" of the launcher itself, used for self-update checks.
    pub launcher_repository: Option<String>,
    /// Executable name inside every install directory, without `.exe`.
    pub executable_name: String,
    pub github_api_base_url: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            default_stream_repository: "Megaspell/Megaspell-Releases".into(),
            default_stream_token: None,
            launcher_repository: Some("Megaspell/MegaspellLauncher".into()),
            executable_name: "Megaspell".into(),
            github_api_base_url: GITHUB_API_BASE_URL.into(),
        }
    }
}

impl LauncherConfig {
    /// Load the config file, falling back to defaults when it does not exist.
    ///
    /// A file that exists but cannot be parsed is an error: silently ignoring
    /// it would point the launcher at the wrong repository.
    pub fn load(path: &Path) -> LauncherResult<Self> {
        if !path.exists() {
            info!("No launcher config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: LauncherConfig = serde_json::from_str(&raw)?;

        if config.default_stream_repository.trim().is_empty() {
            warn!("Launcher config at {:?} has an empty default repository", path);
            return Err(LauncherError::MissingArgument("default_stream_repository"));
        }

        Ok(config)
    }
}
