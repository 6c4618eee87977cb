// ─── Launcher Update Check ───
// Asks the launcher's own release repository whether a newer launcher build
// exists. The launcher does not update itself; the result only drives an
// "update available" notice that is shown once per version.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use super::version::is_newer;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::store::{SettingsStore, StoreValue};

const SHOWN_UPDATE_KEY: &str = "updateMessageShownVersion";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LauncherUpdate {
    pub current_version: String,
    pub update_version: String,
    pub update_date: DateTime<Utc>,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    prerelease: bool,
    html_url: String,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
}

pub struct LauncherUpdateService {
    client: Client,
    api_base_url: String,
    repository: Option<String>,
    current_version: String,
    store: Arc<dyn SettingsStore>,
    cached: OnceCell<Option<LauncherUpdate>>,
}

impl LauncherUpdateService {
    pub fn new(
        client: Client,
        api_base_url: impl Into<String>,
        repository: Option<String>,
        store: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            repository,
            current_version: env!("CARGO_PKG_VERSION").to_string(),
            store,
            cached: OnceCell::new(),
        }
    }

    /// Override the running launcher version used for comparison.
    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    /// Newer launcher release, if any. Checked once per process.
    pub async fn available_update(&self) -> Option<LauncherUpdate> {
        self.cached
            .get_or_init(|| self.request_latest_update())
            .await
            .clone()
    }

    /// The available update, but only the first time it is asked for a given
    /// update version.
    pub async fn take_unseen_update(&self) -> LauncherResult<Option<LauncherUpdate>> {
        let Some(update) = self.available_update().await else {
            return Ok(None);
        };

        let shown = self
            .store
            .get(SHOWN_UPDATE_KEY)
            .and_then(|v| v.as_text().map(str::to_string));
        if shown.as_deref() == Some(update.update_version.as_str()) {
            return Ok(None);
        }

        self.store
            .set(SHOWN_UPDATE_KEY, StoreValue::from(update.update_version.clone()))?;
        Ok(Some(update))
    }

    async fn request_latest_update(&self) -> Option<LauncherUpdate> {
        let Some(repository) = &self.repository else {
            debug!("No launcher repository configured, skipping update check");
            return None;
        };

        let latest = match self.fetch_latest(repository).await {
            Ok(latest) => latest,
            Err(err) => {
                error!("Failed to get latest launcher update: {}", err);
                return None;
            }
        };

        let latest_version = latest
            .tag_name
            .strip_prefix('v')
            .unwrap_or(&latest.tag_name)
            .to_string();

        if !is_newer(&latest_version, &self.current_version) {
            info!(
                "No launcher update available, current {} vs latest {}",
                self.current_version, latest_version
            );
            return None;
        }
        if latest.draft || latest.prerelease {
            error!("Latest launcher version {} is a draft or prerelease", latest_version);
            return None;
        }

        info!(
            "Launcher update available: current {}, new {}",
            self.current_version, latest_version
        );
        Some(LauncherUpdate {
            current_version: self.current_version.clone(),
            update_version: latest_version,
            update_date: latest.published_at.unwrap_or_else(Utc::now),
            url: latest.html_url,
        })
    }

    async fn fetch_latest(&self, repository: &str) -> LauncherResult<LatestRelease> {
        let url = format!("{}/repos/{}/releases/latest", self.api_base_url, repository);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::RequestFailed {
                url,
                status: status.as_u16(),
            });
        }

        Ok(response.json::<LatestRelease>().await?)
    }
}
