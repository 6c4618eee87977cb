// ─── StreamLauncher Core ───
// Backend of a launcher that installs and runs versioned releases.
//
// Architecture:
//   core/
//     release/      — Streams, GitHub catalog provider, launcher self-update check
//     downloader/   — Multi-volume artifact transfer
//     installer/    — Zip extraction into an install directory
//     installation/ — Install/update state machine, lock record, crash recovery
//     launch/       — Selected stream/version and process tracking
//     store/        — Typed key/value settings
//     state/        — Service wiring

pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod installation;
pub mod installer;
pub mod launch;
pub mod paths;
pub mod platform;
pub mod release;
pub mod state;
pub mod store;
