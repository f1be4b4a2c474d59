//! Run configuration and portal URL construction.

use std::path::PathBuf;
use std::time::Duration;

use crate::types::{Credentials, Mode};

pub const DEFAULT_APP_BASE: &str = "https://portal.battlefield.com";

/// Playground whose rules editor exposes the full block table.
pub const DEFAULT_PLAYGROUND_ID: &str = "a56cf4d0-c713-11ec-b056-e3dbf89f52ce";

/// Cookies can only be set while the browser is on this domain.
pub const IDENTITY_DOMAIN: &str = "accounts.ea.com";
pub const IDENTITY_PATH: &str = "/connect";

/// Present once the rules editor workspace has loaded.
pub const READY_SELECTOR: &str = ".blocklyWorkspace";

/// Where the portal and its identity provider live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalEndpoints {
    pub app_base: String,
    pub playground_id: String,
    pub identity_domain: String,
    pub identity_path: String,
}

impl Default for PortalEndpoints {
    fn default() -> Self {
        Self {
            app_base: DEFAULT_APP_BASE.to_string(),
            playground_id: DEFAULT_PLAYGROUND_ID.to_string(),
            identity_domain: IDENTITY_DOMAIN.to_string(),
            identity_path: IDENTITY_PATH.to_string(),
        }
    }
}

impl PortalEndpoints {
    fn base(&self) -> &str {
        self.app_base.trim_end_matches('/')
    }

    /// The rules editor page for the configured playground.
    pub fn target_url(&self) -> String {
        format!(
            "{}/experience/rules?playgroundId={}",
            self.base(),
            self.playground_id
        )
    }

    pub fn login_url(&self) -> String {
        format!("{}/login", self.base())
    }

    pub fn identity_url(&self) -> String {
        format!("https://{}{}", self.identity_domain, self.identity_path)
    }

    /// Version-qualified localization document.
    pub fn localization_url(&self, version: u64) -> String {
        format!("{}/{version}/assets/i18n/en-US.json", self.base())
    }

    /// Host name of the portal, for operator-facing messages.
    pub fn app_host(&self) -> String {
        url::Url::parse(&self.app_base)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.app_base.clone())
    }
}

/// Bounded waits used during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Wait for the workspace when checking for an existing login.
    pub probe: Duration,
    /// Wait for the workspace after injecting credentials.
    pub login: Duration,
    /// Single page navigation.
    pub navigation: Duration,
    /// Localization download.
    pub fetch: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe: Duration::from_secs(10),
            login: Duration::from_secs(20),
            navigation: Duration::from_secs(30),
            fetch: Duration::from_secs(30),
        }
    }
}

/// Immutable configuration for one sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub mode: Mode,
    pub credentials: Credentials,
    pub skip: bool,
    pub data_dir: PathBuf,
    pub endpoints: PortalEndpoints,
    pub timeouts: Timeouts,
    /// Pause after login so late-registering blocks are present.
    pub settle_delay: Duration,
    pub chromium_path: Option<PathBuf>,
}

impl SyncConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: Mode::default(),
            credentials: Credentials::default(),
            skip: false,
            data_dir: data_dir.into(),
            endpoints: PortalEndpoints::default(),
            timeouts: Timeouts::default(),
            settle_delay: Duration::from_secs(5),
            chromium_path: None,
        }
    }
}
