use crate::core::error::{LauncherError, LauncherResult};

/// Platform identifier used in artifact names (`<platform>.zip`).
pub fn current_platform() -> LauncherResult<&'static str> {
    if cfg!(all(target_os = "windows", target_pointer_width = "64")) {
        Ok("win64")
    } else if cfg!(all(target_os = "linux", target_pointer_width = "64")) {
        Ok("linux64")
    } else {
        Err(LauncherError::UnsupportedPlatform(format!(
            "{}-{}",
            std::env::consts::OS,
            std::env::consts::ARCH
        )))
    }
}

/// File name of the installed binary for this platform.
pub fn executable_file_name(base_name: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{base_name}.exe")
    } else {
        base_name.to_string()
    }
}
