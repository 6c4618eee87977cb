use serde::{Deserialize, Serialize};

/// Stages of an install-or-update run, in the order they are reported.
/// `Failed`, `AlreadyLatest` and `Complete` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InstallStage {
    Failed,
    RequestingLatestReleaseInfo,
    AlreadyLatest,
    PreCleanup,
    Downloading,
    Installing,
    PostCleanup,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstallProgress {
    pub stage: InstallStage,
    /// Progress of the current stage, from 0 to 1.
    pub stage_progress: f64,
    /// Concrete version being installed, known once the release is resolved.
    pub version: Option<String>,
    pub download_size_bytes: u64,
    pub error: Option<String>,
}

impl InstallProgress {
    pub fn new(stage: InstallStage) -> Self {
        Self {
            stage,
            stage_progress: 0.0,
            version: None,
            download_size_bytes: 0,
            error: None,
        }
    }

    pub(crate) fn enter(&mut self, stage: InstallStage) {
        self.stage = stage;
        self.stage_progress = 0.0;
    }

    /// Set stage progress from a byte count against the declared download
    /// size. Sizes that under-report the real transfer are capped at 1.
    pub(crate) fn set_bytes(&mut self, bytes: u64) {
        self.stage_progress = if self.download_size_bytes == 0 {
            1.0
        } else {
            (bytes as f64 / self.download_size_bytes as f64).min(1.0)
        };
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstallationStatus {
    pub installed: bool,
    /// Concrete version found on disk. For "latest" this is the release that
    /// was current when it was installed.
    pub real_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_progress_is_scaled_and_capped() {
        let mut progress = InstallProgress::new(InstallStage::Downloading);
        progress.download_size_bytes = 200;
        progress.set_bytes(50);
        assert_eq!(progress.stage_progress, 0.25);
        progress.set_bytes(500);
        assert_eq!(progress.stage_progress, 1.0);

        progress.download_size_bytes = 0;
        progress.set_bytes(10);
        assert_eq!(progress.stage_progress, 1.0);
    }

    #[test]
    fn serialized_progress_uses_camel_case() {
        let json = serde_json::to_value(InstallProgress::new(InstallStage::PreCleanup)).unwrap();
        assert_eq!(json["stage"], "PreCleanup");
        assert_eq!(json["stageProgress"], 0.0);
        assert!(json.get("downloadSizeBytes").is_some());
    }
}
