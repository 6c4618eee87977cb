use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the launcher backend.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {url} failed: HTTP {status}")]
    RequestFailed { url: String, status: u16 },

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Archive entry escapes install directory: {0}")]
    UnsafeArchiveEntry(String),

    // ── Preconditions ───────────────────────────────────
    #[error("{0} is required")]
    MissingArgument(&'static str),

    #[error("Searching for updates to '{0}' version is not allowed")]
    PseudoVersionNotAllowed(String),

    #[error("Another installation is already in progress")]
    InstallInProgress,

    // ── Resolution ──────────────────────────────────────
    #[error("Release stream {0} not found")]
    StreamNotFound(String),

    #[error("Release not found for version {version} in stream {stream}")]
    ReleaseNotFound { stream: String, version: String },

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    // ── Launch ──────────────────────────────────────────
    #[error("Failed to launch {path:?}: {reason}")]
    Launch { path: PathBuf, reason: String },

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl LauncherError {
    /// Precondition failures are reported straight to the caller and never
    /// turned into a `Failed` install stage.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            LauncherError::MissingArgument(_)
                | LauncherError::PseudoVersionNotAllowed(_)
                | LauncherError::InstallInProgress
        )
    }
}

/// Render an error followed by its chain of causes, one per line, each
/// level indented by one more space.
pub fn error_chain_message(error: &(dyn std::error::Error + 'static)) -> String {
    let mut lines = Vec::new();
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(error);
    let mut depth = 0;

    while let Some(err) = current {
        lines.push(format!("{}{}", " ".repeat(depth), err));
        current = err.source();
        depth += 1;
    }

    lines.join("\n")
}

// ── Serialization for Tauri IPC ─────────────────────────
// Tauri commands require the error type to implement `Serialize`.
impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_message_includes_io_source() {
        let err = LauncherError::Io {
            path: PathBuf::from("/tmp/game"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let message = error_chain_message(&err);
        let lines: Vec<&str> = message.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("/tmp/game"));
        assert_eq!(lines[1], " denied");
    }

    #[test]
    fn precondition_classification() {
        assert!(LauncherError::InstallInProgress.is_precondition());
        assert!(LauncherError::MissingArgument("streamId").is_precondition());
        assert!(!LauncherError::StreamNotFound("beta".into()).is_precondition());
    }
}
