#[cfg(feature = "desktop")]
mod commands;
pub mod core;

use tracing_subscriber::EnvFilter;

/// Initialize structured logging. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,stream_launcher_lib=debug")),
        )
        .try_init();
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use std::sync::Arc;
    use tauri::Manager;

    use crate::core::paths::RuntimePaths;
    use crate::core::state::AppState;

    init_tracing();
    tracing::info!("StreamLauncher starting...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let paths = RuntimePaths::detect()?;
            let state = Arc::new(AppState::new(paths)?);
            tauri::async_runtime::block_on(state.initialize());
            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_release_streams,
            commands::add_release_stream,
            commands::remove_release_stream,
            commands::get_last_releases,
            commands::get_release,
            commands::find_update,
            commands::get_install_location,
            commands::set_install_location,
            commands::get_version_install_dir,
            commands::is_version_installed,
            commands::are_versions_installed,
            commands::install_or_update,
            commands::get_current_release_stream,
            commands::set_current_release_stream,
            commands::get_current_app_version,
            commands::set_current_app_version,
            commands::get_graphics_api,
            commands::set_graphics_api,
            commands::launch_app,
            commands::get_launcher_update,
            commands::take_unseen_launcher_update,
            commands::open_launcher_update,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
