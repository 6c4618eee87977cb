// ─── Archive Installer ───
// Unpacks a downloaded zip artifact into an install directory, reporting the
// cumulative compressed size of the entries written so far.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::core::error::{LauncherError, LauncherResult};

pub struct ArchiveInstaller;

impl ArchiveInstaller {
    /// Extract `artifact` into `target_dir`.
    ///
    /// `on_progress` receives the cumulative compressed size of fully written
    /// file entries. Returns the final cumulative size. Decompression runs on
    /// the blocking pool; progress is relayed back to the calling task.
    pub async fn install(
        artifact: &Path,
        target_dir: &Path,
        on_progress: &mut (dyn FnMut(u64) + Send),
    ) -> LauncherResult<u64> {
        info!("Unpacking {:?} into {:?}", artifact, target_dir);

        let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
        let artifact_path = artifact.to_path_buf();
        let target = target_dir.to_path_buf();
        let task = tokio::task::spawn_blocking(move || {
            extract_zip(&artifact_path, &target, |bytes| {
                let _ = tx.send(bytes);
            })
        });

        while let Some(bytes) = rx.recv().await {
            on_progress(bytes);
        }

        let result = task
            .await
            .map_err(|e| LauncherError::Other(format!("Extraction task failed: {e}")))
            .and_then(|r| r);

        match &result {
            Ok(total) => debug!("Unpacked {} compressed byte(s) from {:?}", total, artifact),
            Err(err) => error!("Failed to unpack {:?}: {}", artifact, err),
        }
        result
    }
}

fn extract_zip(
    artifact: &Path,
    target_dir: &Path,
    mut on_progress: impl FnMut(u64),
) -> LauncherResult<u64> {
    let file = std::fs::File::open(artifact).map_err(|source| LauncherError::Io {
        path: artifact.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut processed: u64 = 0;

    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index)?;
        let relative: PathBuf = zipped
            .enclosed_name()
            .ok_or_else(|| LauncherError::UnsafeArchiveEntry(zipped.name().to_string()))?;
        let out_path = target_dir.join(relative);

        if zipped.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|source| LauncherError::Io {
                path: out_path,
                source,
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LauncherError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut out = std::fs::File::create(&out_path).map_err(|source| LauncherError::Io {
            path: out_path.clone(),
            source,
        })?;
        std::io::copy(&mut zipped, &mut out).map_err(|source| LauncherError::Io {
            path: out_path.clone(),
            source,
        })?;

        #[cfg(unix)]
        if let Some(mode) = zipped.unix_mode().filter(|m| m & 0o777 != 0) {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode & 0o7777))
                .map_err(|source| LauncherError::Io {
                    path: out_path.clone(),
                    source,
                })?;
        }

        processed = processed.saturating_add(zipped.compressed_size());
        on_progress(processed);
    }

    Ok(processed)
}

/// Build an in-memory zip from `(name, contents)` pairs. Names ending in `/`
/// become directory entries.
#[cfg(test)]
pub(crate) fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().unix_permissions(0o644);
    for (name, contents) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}
