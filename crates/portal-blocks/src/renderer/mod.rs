//! Browser abstraction for driving the portal.
//!
//! Defines the `SessionLauncher` and `BrowsingSession` traits that abstract
//! over the browser engine (currently Chromium via chromiumoxide).

pub mod chromium;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;
use crate::types::{BrowserResult, Mode, SessionCookie};

/// Profile kept between debug runs so a previous login survives.
pub const DEBUG_PROFILE_DIR: &str = "/tmp/portal-blocks-profile";

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// How to start the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub headless: bool,
    pub window_size: (u32, u32),
    pub ignore_certificate_errors: bool,
    pub user_data_dir: Option<PathBuf>,
    pub chromium_path: Option<PathBuf>,
    pub navigation_timeout: Duration,
}

impl LaunchOptions {
    pub fn for_config(config: &SyncConfig) -> Self {
        let (headless, user_data_dir) = match config.mode {
            Mode::Production => (true, None),
            Mode::Debug => (false, Some(PathBuf::from(DEBUG_PROFILE_DIR))),
        };
        Self {
            headless,
            window_size: (1920, 1200),
            ignore_certificate_errors: headless,
            user_data_dir,
            chromium_path: config.chromium_path.clone(),
            navigation_timeout: config.timeouts.navigation,
        }
    }
}

/// Starts a browser and hands back a single page to drive.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> BrowserResult<Box<dyn BrowsingSession>>;
}

/// A single browser page with cookies and state.
#[async_trait]
pub trait BrowsingSession: Send + Sync {
    /// Navigate to a URL.
    async fn navigate(&mut self, url: &str) -> BrowserResult<NavigationResult>;
    /// Poll until an element matching `selector` exists, or time out.
    /// Driver failures while polling are returned as they happen.
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> BrowserResult<()>;
    /// Set a cookie. The page must currently be on the cookie's domain.
    async fn inject_cookie(&self, cookie: &SessionCookie) -> BrowserResult<()>;
    /// Evaluate a JavaScript expression and return its JSON value.
    async fn evaluate(&self, script: &str) -> BrowserResult<serde_json::Value>;
    /// Get the current URL.
    async fn current_url(&self) -> BrowserResult<String>;
    /// Close the page and the browser behind it.
    async fn close(self: Box<Self>) -> BrowserResult<()>;
}
