//! One unattended sync run: log in, snapshot the catalog, and pull the
//! localization document when the editor version moves forward.

use crate::auth::SessionAuthenticator;
use crate::config::SyncConfig;
use crate::extract::{detect_version, CatalogExtractor};
use crate::http::LocalizationClient;
use crate::renderer::{BrowsingSession, LaunchOptions, SessionLauncher};
use crate::storage::{DataDir, VERSION_FILE};
use crate::types::{SyncOutcome, SyncReport, SyncResult};

/// Drives a full run against a launcher-provided browser.
pub struct SyncOrchestrator<L> {
    config: SyncConfig,
    launcher: L,
    localization: LocalizationClient,
}

impl<L: SessionLauncher> SyncOrchestrator<L> {
    pub fn new(config: SyncConfig, launcher: L) -> Self {
        let localization =
            LocalizationClient::new(config.endpoints.clone(), config.timeouts.fetch);
        Self {
            config,
            launcher,
            localization,
        }
    }

    /// Run the sync. The browsing session is closed on every path.
    pub async fn run(&self) -> SyncResult<SyncOutcome> {
        if self.config.skip {
            tracing::info!("Skip flag set, not syncing blocks");
            return Ok(SyncOutcome::Skipped);
        }

        let options = LaunchOptions::for_config(&self.config);
        let mut session = self.launcher.launch(&options).await?;

        let result = self.sync_session(session.as_mut()).await;

        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close browsing session: {e}");
        }

        match result {
            Ok(report) => {
                tracing::info!("All tasks complete");
                Ok(SyncOutcome::Completed(report))
            }
            Err(e) => {
                tracing::error!("Sync failed: {e}");
                Err(e)
            }
        }
    }

    async fn sync_session(&self, session: &mut dyn BrowsingSession) -> SyncResult<SyncReport> {
        let login = SessionAuthenticator::from_config(&self.config)
            .establish(session, &self.config.credentials)
            .await?;

        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }

        let data = DataDir::new(self.config.data_dir.clone());
        let catalog = CatalogExtractor.extract(session).await?;
        data.write_catalog(&catalog)?;

        tracing::info!("Saving version info");
        let observed_version = match detect_version(session).await? {
            Some(version) => version,
            None => {
                tracing::warn!("No main bundle script found, assuming version 0");
                0
            }
        };
        let version = data.version_store().propose(observed_version)?;

        let localization_fetched = if version.advanced {
            tracing::info!("Fetching i18n for version {observed_version}");
            if let Err(e) = self.refresh_localization(&data, observed_version).await {
                tracing::error!(
                    path = %data.localization_path().display(),
                    url = %self.config.endpoints.localization_url(observed_version),
                    "i18n.json is stale: {VERSION_FILE} already holds {observed_version}, so later \
                     runs will not refetch it. Restore {VERSION_FILE} to {} or fetch the url by hand",
                    version.previous,
                );
                return Err(e);
            }
            true
        } else {
            tracing::info!(
                stored = version.current,
                observed = observed_version,
                "Editor version unchanged, keeping i18n"
            );
            false
        };

        Ok(SyncReport {
            login,
            blocks: catalog.len(),
            observed_version,
            version,
            localization_fetched,
        })
    }

    async fn refresh_localization(&self, data: &DataDir, version: u64) -> SyncResult<()> {
        let document = self.localization.fetch(version).await?;
        data.write_localization(&document)?;
        Ok(())
    }
}
