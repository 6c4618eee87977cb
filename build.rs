#[cfg(feature = "desktop")]
fn ensure_frontend_placeholder() {
    use std::fs;
    use std::path::Path;

    let ui_dir = Path::new("ui");
    let index = ui_dir.join("index.html");

    if let Err(error) = fs::create_dir_all(ui_dir) {
        panic!("failed to create frontend directory: {error}");
    }

    if !index.exists() {
        if let Err(error) = fs::write(&index, b"<!doctype html><title>StreamLauncher</title>\n") {
            panic!("failed to create frontend placeholder file: {error}");
        }
    }
}

fn main() {
    #[cfg(feature = "desktop")]
    {
        ensure_frontend_placeholder();
        tauri_build::build();
    }
}
