pub mod coordinator;

pub use coordinator::{GraphicsApi, LaunchCoordinator, LaunchOutcome};
