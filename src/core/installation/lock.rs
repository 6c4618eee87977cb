// ─── Install Lock ───
// Durable record of the install currently mutating the disk. Created with
// O_EXCL before anything is touched, removed only after full success or by
// the interrupted-install cleanup pass.

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::core::error::{LauncherError, LauncherResult};

pub const LOCK_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    LOCK_SCHEMA_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstallLock {
    /// Records written before the field existed are version 1.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub stream_id: String,
    pub version: String,
}

impl InstallLock {
    pub fn new(stream_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            schema_version: LOCK_SCHEMA_VERSION,
            stream_id: stream_id.into(),
            version: version.into(),
        }
    }

    /// Atomically create the lock record at `path`.
    ///
    /// Fails with `InstallInProgress` when a record already exists.
    pub async fn acquire(&self, path: &Path) -> LauncherResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| LauncherError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(LauncherError::InstallInProgress)
            }
            Err(source) => {
                return Err(LauncherError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let json = serde_json::to_vec(self)?;
        file.write_all(&json)
            .await
            .map_err(|source| LauncherError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        file.sync_all().await.map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read the record at `path`. `None` when there is no record.
    pub async fn read(path: &Path) -> LauncherResult<Option<Self>> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(LauncherError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Remove the record at `path`. A missing record is not an error.
    pub async fn release(path: &Path) -> LauncherResult<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LauncherError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
