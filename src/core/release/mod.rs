pub mod github;
pub mod launcher_update;
pub mod model;
pub mod provider;
pub mod service;
pub mod version;

pub use github::GithubReleaseProvider;
pub use launcher_update::{LauncherUpdate, LauncherUpdateService};
pub use model::{
    AppRelease, DownloadedArtifact, ReleaseArtifact, ReleaseAsset, ReleaseStream,
    ReleaseStreamType, DEFAULT_STREAM_ID, LATEST_VERSION,
};
pub use provider::ReleaseProvider;
pub use service::ReleaseService;
