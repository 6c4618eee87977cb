use std::path::Path;

use futures_util::StreamExt;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::release::ReleaseAsset;

/// Streams artifact volumes from the catalog host into a single local file.
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    // ── Multi-volume download ───────────────────────────

    /// Download `volumes` in order, appending each body to `dest`.
    ///
    /// `on_progress` receives the cumulative byte count across all volumes
    /// after every chunk. A stale file at `dest` is removed first. The first
    /// failing volume aborts the transfer; whatever was written stays on disk
    /// for the caller's cleanup pass.
    pub async fn download_volumes(
        &self,
        volumes: &[ReleaseAsset],
        dest: &Path,
        auth_token: Option<&str>,
        on_progress: &mut (dyn FnMut(u64) + Send),
    ) -> LauncherResult<u64> {
        if tokio::fs::try_exists(dest).await.unwrap_or(false) {
            tokio::fs::remove_file(dest)
                .await
                .map_err(|source| LauncherError::Io {
                    path: dest.to_path_buf(),
                    source,
                })?;
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| LauncherError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        info!(
            "Downloading {} volume(s) into {:?}",
            volumes.len(),
            dest
        );

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dest)
            .await
            .map_err(|source| LauncherError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        let mut downloaded: u64 = 0;
        for volume in volumes {
            let mut request = self
                .client
                .get(&volume.url)
                .header(ACCEPT, HeaderValue::from_static("application/octet-stream"));
            if let Some(token) = auth_token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(LauncherError::DownloadFailed {
                    url: volume.url.clone(),
                    status: status.as_u16(),
                });
            }

            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk)
                    .await
                    .map_err(|source| LauncherError::Io {
                        path: dest.to_path_buf(),
                        source,
                    })?;
                downloaded = downloaded.saturating_add(chunk.len() as u64);
                on_progress(downloaded);
            }

            debug!("Downloaded volume {} ({} bytes so far)", volume.name, downloaded);
        }

        file.flush().await.map_err(|source| LauncherError::Io {
            path: dest.to_path_buf(),
            source,
        })?;

        Ok(downloaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn asset(server_url: &str, id: u64, name: &str, size: u64) -> ReleaseAsset {
        ReleaseAsset {
            id,
            url: format!("{server_url}/assets/{id}"),
            name: name.into(),
            size_bytes: size,
        }
    }

    #[tokio::test]
    async fn volumes_are_concatenated_in_order_with_cumulative_progress() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/assets/1")
            .match_header("accept", "application/octet-stream")
            .with_body("hello ")
            .create_async()
            .await;
        let second = server
            .mock("GET", "/assets/2")
            .with_body("world")
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("nested").join("linux64.zip");
        let volumes = vec![
            asset(&server.url(), 1, "linux64.zip.001", 6),
            asset(&server.url(), 2, "linux64.zip.002", 5),
        ];

        let mut seen = Vec::new();
        let total = Downloader::new(Client::new())
            .download_volumes(&volumes, &dest, None, &mut |bytes| seen.push(bytes))
            .await
            .unwrap();

        assert_eq!(total, 11);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "hello world");
        assert_eq!(seen.last().copied(), Some(11));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn stale_destination_is_replaced_and_token_is_sent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/assets/7")
            .match_header("authorization", "Bearer secret")
            .with_body("fresh")
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("linux64.zip");
        std::fs::write(&dest, "stale bytes that must disappear").unwrap();

        Downloader::new(Client::new())
            .download_volumes(
                &[asset(&server.url(), 7, "linux64.zip", 5)],
                &dest,
                Some("secret"),
                &mut |_| {},
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "fresh");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failing_volume_aborts_transfer() {
        let mut server = Server::new_async().await;
        let _first = server
            .mock("GET", "/assets/1")
            .with_body("part-one")
            .create_async()
            .await;
        let _second = server
            .mock("GET", "/assets/2")
            .with_status(500)
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("linux64.zip");
        let volumes = vec![
            asset(&server.url(), 1, "linux64.zip.001", 8),
            asset(&server.url(), 2, "linux64.zip.002", 8),
        ];

        let err = Downloader::new(Client::new())
            .download_volumes(&volumes, &dest, None, &mut |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::DownloadFailed { status: 500, .. }));
        // Partial output is left for the install cleanup pass.
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "part-one");
    }
}
