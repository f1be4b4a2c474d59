//! Scripted in-memory portal used by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use portal_blocks::{
    BrowserError, BrowserResult, BrowsingSession, Credentials, LaunchOptions, NavigationResult,
    PortalEndpoints, SessionCookie, SessionLauncher, SyncConfig,
};

/// What the fake portal serves.
#[derive(Debug, Clone)]
pub struct Portal {
    pub endpoints: PortalEndpoints,
    /// The browser profile is already logged in.
    pub pre_authenticated: bool,
    /// Injected cookies are accepted by the login flow.
    pub accepts_login: bool,
    /// Navigations to these URLs are refused at the transport level.
    pub refused_urls: Vec<String>,
    /// The element wait fails at the transport level instead of finding or missing.
    pub drops_connection_on_wait: bool,
    pub block_keys: Vec<String>,
    /// The page's `<base href>`; script sources are resolved against it.
    pub base_href: String,
    /// Raw `src` attribute text of each script, `None` for inline scripts.
    pub script_sources: Vec<Option<String>>,
}

impl Portal {
    pub fn new(endpoints: PortalEndpoints) -> Self {
        let base_href = format!("{}/", endpoints.app_base);
        Self {
            endpoints,
            pre_authenticated: false,
            accepts_login: true,
            refused_urls: Vec::new(),
            drops_connection_on_wait: false,
            block_keys: vec!["Wait".into(), "If".into(), "Teleport".into()],
            base_href,
            script_sources: vec![
                Some("/7/polyfills.js".into()),
                None,
                Some("/7/main.abc123.js".into()),
            ],
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.script_sources = vec![
            Some(format!("/{version}/runtime.js")),
            None,
            Some(format!("/{version}/main.deadbeef.js")),
        ];
        self
    }

    /// An Angular-style build: bundles referenced relative to a versioned base.
    pub fn with_relative_bundles(mut self, version: u64) -> Self {
        self.base_href = format!("{}/{version}/", self.endpoints.app_base);
        self.script_sources = vec![
            Some("runtime.abc.js".into()),
            None,
            Some("main.def.js".into()),
        ];
        self
    }

    /// What `script.src` reports in a browser: resolved URLs, `""` when inline.
    fn resolved_script_sources(&self) -> Vec<String> {
        let base = Url::parse(&self.base_href).expect("base href");
        self.script_sources
            .iter()
            .map(|src| match src {
                Some(src) => base.join(src).expect("script src").to_string(),
                None => String::new(),
            })
            .collect()
    }
}

/// Everything the fake observed.
#[derive(Debug, Default)]
pub struct Journal {
    pub launches: usize,
    pub closes: usize,
    pub navigations: Vec<String>,
    pub cookies: Vec<SessionCookie>,
    pub waits: Vec<Duration>,
}

pub type SharedJournal = Arc<Mutex<Journal>>;

pub struct FakeLauncher {
    pub portal: Portal,
    pub journal: SharedJournal,
}

impl FakeLauncher {
    pub fn new(portal: Portal) -> Self {
        Self {
            portal,
            journal: SharedJournal::default(),
        }
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self, _options: &LaunchOptions) -> BrowserResult<Box<dyn BrowsingSession>> {
        self.journal.lock().unwrap().launches += 1;
        Ok(Box::new(FakeSession::new(
            self.portal.clone(),
            Arc::clone(&self.journal),
        )))
    }
}

pub struct FakeSession {
    portal: Portal,
    journal: SharedJournal,
    current_url: String,
    visited_login: bool,
}

impl FakeSession {
    pub fn new(portal: Portal, journal: SharedJournal) -> Self {
        Self {
            portal,
            journal,
            current_url: "about:blank".into(),
            visited_login: false,
        }
    }

    pub fn journal(&self) -> SharedJournal {
        Arc::clone(&self.journal)
    }

    fn workspace_visible(&self) -> bool {
        if self.current_url != self.portal.endpoints.target_url() {
            return false;
        }
        if self.portal.pre_authenticated {
            return true;
        }
        let cookies = self.journal.lock().unwrap().cookies.len();
        self.portal.accepts_login && self.visited_login && cookies >= 2
    }
}

#[async_trait]
impl BrowsingSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> BrowserResult<NavigationResult> {
        self.journal.lock().unwrap().navigations.push(url.to_string());
        if self.portal.refused_urls.iter().any(|u| u == url) {
            return Err(BrowserError::ConnectionRefused {
                url: url.to_string(),
            });
        }
        if url == self.portal.endpoints.login_url() {
            self.visited_login = true;
        }
        self.current_url = url.to_string();
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 1,
        })
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        self.journal.lock().unwrap().waits.push(timeout);
        if self.portal.drops_connection_on_wait {
            return Err(BrowserError::Protocol("websocket closed".into()));
        }
        if self.workspace_visible() {
            Ok(())
        } else {
            Err(BrowserError::ElementTimeout {
                selector: selector.to_string(),
                waited: timeout,
            })
        }
    }

    async fn inject_cookie(&self, cookie: &SessionCookie) -> BrowserResult<()> {
        let on_domain = self.current_url.contains(&cookie.domain);
        if !on_domain {
            return Err(BrowserError::Cookie(format!(
                "{} set while on {}",
                cookie.name, self.current_url
            )));
        }
        self.journal.lock().unwrap().cookies.push(cookie.clone());
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> BrowserResult<Value> {
        if script.contains("_Blockly.Blocks") {
            Ok(serde_json::json!(self.portal.block_keys))
        } else if script.contains("document.scripts") {
            Ok(serde_json::json!(self.portal.resolved_script_sources()))
        } else {
            Err(BrowserError::Script(format!("unexpected script: {script}")))
        }
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(self.current_url.clone())
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        self.journal.lock().unwrap().closes += 1;
        Ok(())
    }
}

pub fn credentials() -> Credentials {
    Credentials::new(Some("remid-token".into()), Some("sid-token".into()))
}

/// A config pointed at `data_dir` and `app_base`, with no settle delay.
pub fn config(data_dir: &std::path::Path, app_base: &str) -> SyncConfig {
    let mut config = SyncConfig::new(data_dir);
    config.endpoints.app_base = app_base.to_string();
    config.credentials = credentials();
    config.settle_delay = Duration::ZERO;
    config
}
