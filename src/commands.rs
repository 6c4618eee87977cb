use std::path::PathBuf;
use std::sync::Arc;

use tauri::Emitter;
use tauri_plugin_opener::OpenerExt;
use tracing::info;

use crate::core::error::LauncherError;
use crate::core::installation::{InstallProgress, InstallationStatus};
use crate::core::launch::{GraphicsApi, LaunchOutcome};
use crate::core::release::{AppRelease, LauncherUpdate, ReleaseStream};
use crate::core::state::AppState;

const INSTALL_PROGRESS_EVENT: &str = "install-progress";

type AppStateHandle<'a> = tauri::State<'a, Arc<AppState>>;

fn find_stream(state: &AppState, stream_id: &str) -> Result<ReleaseStream, LauncherError> {
    state
        .releases
        .find_stream(stream_id)
        .ok_or_else(|| LauncherError::StreamNotFound(stream_id.to_string()))
}

// ── Release streams ─────────────────────────────────────

#[tauri::command]
pub async fn get_release_streams(
    state: AppStateHandle<'_>,
) -> Result<Vec<ReleaseStream>, LauncherError> {
    Ok(state.releases.streams())
}

#[tauri::command]
pub async fn add_release_stream(
    state: AppStateHandle<'_>,
    stream: ReleaseStream,
) -> Result<bool, LauncherError> {
    state.releases.add_stream(stream)
}

#[tauri::command]
pub async fn remove_release_stream(
    state: AppStateHandle<'_>,
    stream_id: String,
) -> Result<bool, LauncherError> {
    state.releases.remove_stream(&stream_id)
}

#[tauri::command]
pub async fn get_last_releases(
    state: AppStateHandle<'_>,
    stream_id: String,
    limit: Option<usize>,
) -> Result<Vec<AppRelease>, LauncherError> {
    let stream = find_stream(&state, &stream_id)?;
    state.releases.last_releases(&stream, limit).await
}

#[tauri::command]
pub async fn get_release(
    state: AppStateHandle<'_>,
    stream_id: String,
    version: String,
) -> Result<Option<AppRelease>, LauncherError> {
    let stream = find_stream(&state, &stream_id)?;
    state.releases.release(&stream, &version).await
}

#[tauri::command]
pub async fn find_update(
    state: AppStateHandle<'_>,
    stream_id: String,
    version: String,
) -> Result<Option<AppRelease>, LauncherError> {
    let stream = find_stream(&state, &stream_id)?;
    state.releases.find_update(&stream, &version).await
}

// ── Installation ────────────────────────────────────────

#[tauri::command]
pub async fn get_install_location(state: AppStateHandle<'_>) -> Result<PathBuf, LauncherError> {
    Ok(state.installs.install_location())
}

#[tauri::command]
pub async fn set_install_location(
    state: AppStateHandle<'_>,
    location: PathBuf,
) -> Result<(), LauncherError> {
    state.installs.set_install_location(&location).await
}

#[tauri::command]
pub async fn get_version_install_dir(
    state: AppStateHandle<'_>,
    stream_id: String,
    version: String,
) -> Result<PathBuf, LauncherError> {
    state.installs.version_install_dir(&stream_id, &version)
}

#[tauri::command]
pub async fn is_version_installed(
    state: AppStateHandle<'_>,
    stream_id: String,
    version: String,
) -> Result<InstallationStatus, LauncherError> {
    state.installs.is_version_installed(&stream_id, &version).await
}

#[tauri::command]
pub async fn are_versions_installed(
    state: AppStateHandle<'_>,
    stream_id: String,
    versions: Vec<String>,
) -> Result<Vec<InstallationStatus>, LauncherError> {
    state.installs.are_versions_installed(&stream_id, &versions).await
}

/// Runs an install or update, emitting every progress value as an
/// `install-progress` event. Resolves with the terminal progress.
#[tauri::command]
pub async fn install_or_update(
    app: tauri::AppHandle,
    state: AppStateHandle<'_>,
    stream_id: String,
    version: String,
    force: bool,
) -> Result<InstallProgress, LauncherError> {
    let state = state.inner().clone();
    let mut emit = |progress: &InstallProgress| {
        let _ = app.emit(INSTALL_PROGRESS_EVENT, progress);
    };

    state
        .installs
        .install_or_update(&stream_id, &version, force, &mut emit)
        .await
}

// ── Launch ──────────────────────────────────────────────

#[tauri::command]
pub async fn get_current_release_stream(
    state: AppStateHandle<'_>,
) -> Result<ReleaseStream, LauncherError> {
    state.launcher.current_stream()
}

#[tauri::command]
pub async fn set_current_release_stream(
    state: AppStateHandle<'_>,
    stream_id: Option<String>,
) -> Result<bool, LauncherError> {
    state.launcher.set_current_stream(stream_id.as_deref())
}

#[tauri::command]
pub async fn get_current_app_version(state: AppStateHandle<'_>) -> Result<String, LauncherError> {
    Ok(state.launcher.current_version())
}

#[tauri::command]
pub async fn set_current_app_version(
    state: AppStateHandle<'_>,
    version: Option<String>,
) -> Result<bool, LauncherError> {
    state.launcher.set_current_version(version.as_deref())
}

#[tauri::command]
pub async fn get_graphics_api(
    state: AppStateHandle<'_>,
) -> Result<Option<GraphicsApi>, LauncherError> {
    Ok(state.launcher.graphics_api())
}

#[tauri::command]
pub async fn set_graphics_api(
    state: AppStateHandle<'_>,
    api: Option<GraphicsApi>,
) -> Result<(), LauncherError> {
    state.launcher.set_graphics_api(api)
}

#[tauri::command]
pub async fn launch_app(state: AppStateHandle<'_>) -> Result<LaunchOutcome, LauncherError> {
    let state = state.inner().clone();
    state.launcher.launch().await
}

// ── Launcher update ─────────────────────────────────────

#[tauri::command]
pub async fn get_launcher_update(
    state: AppStateHandle<'_>,
) -> Result<Option<LauncherUpdate>, LauncherError> {
    Ok(state.launcher_updates.available_update().await)
}

#[tauri::command]
pub async fn take_unseen_launcher_update(
    state: AppStateHandle<'_>,
) -> Result<Option<LauncherUpdate>, LauncherError> {
    state.launcher_updates.take_unseen_update().await
}

#[tauri::command]
pub async fn open_launcher_update(
    app: tauri::AppHandle,
    state: AppStateHandle<'_>,
) -> Result<(), LauncherError> {
    let Some(update) = state.launcher_updates.available_update().await else {
        return Ok(());
    };

    info!("Opening launcher update page {}", update.url);
    app.opener()
        .open_url(update.url, None::<&str>)
        .map_err(|e| LauncherError::Other(format!("Failed to open update page: {e}")))
}
