//! HTTP client for the version-qualified localization document.
//!
//! Not a browser, just one GET. The document is opaque JSON and is stored
//! as-is.

use std::time::Duration;

use crate::config::PortalEndpoints;
use crate::types::{FetchError, FetchResult};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/131.0.0.0 Safari/537.36";

/// Downloads `{base}/{version}/assets/i18n/en-US.json`.
#[derive(Clone)]
pub struct LocalizationClient {
    client: reqwest::Client,
    endpoints: PortalEndpoints,
}

impl LocalizationClient {
    pub fn new(endpoints: PortalEndpoints, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self { client, endpoints }
    }

    /// Fetch the localization document for `version`.
    pub async fn fetch(&self, version: u64) -> FetchResult<serde_json::Value> {
        let url = self.endpoints.localization_url(version);
        tracing::debug!(%url, "fetching localization");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        Ok(resp.json::<serde_json::Value>().await?)
    }
}
