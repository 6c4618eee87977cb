pub mod lock;
pub mod manager;
pub mod progress;

pub use lock::InstallLock;
pub use manager::InstallationManager;
pub use progress::{InstallProgress, InstallStage, InstallationStatus};
