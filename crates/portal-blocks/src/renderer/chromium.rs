//! Chromium-backed browsing session using chromiumoxide.

use super::{BrowsingSession, LaunchOptions, NavigationResult, SessionLauncher};
use crate::types::{BrowserError, BrowserResult, SessionCookie};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Interval between element lookups while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.clone());
        }
    }

    if let Some(home) = dirs::home_dir() {
        let bundled = home.join(".cache/portal-blocks/chrome-linux64/chrome");
        if bundled.exists() {
            return Some(bundled);
        }
    }

    ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"]
        .into_iter()
        .find_map(|name| which::which(name).ok())
        .or_else(|| {
            let mac = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
            (cfg!(target_os = "macos") && mac.exists()).then_some(mac)
        })
}

/// Launches a fresh Chromium process per session.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumLauncher;

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self, options: &LaunchOptions) -> BrowserResult<Box<dyn BrowsingSession>> {
        let chrome_path = find_chromium(options.chromium_path.as_ref()).ok_or_else(|| {
            BrowserError::Launch("Chromium not found; set PORTAL_CHROMIUM_PATH".to_string())
        })?;

        let (width, height) = options.window_size;
        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(width, height)
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !options.headless {
            builder = builder.with_head();
        }
        if options.ignore_certificate_errors {
            builder = builder.arg("--ignore-certificate-errors");
        }
        if let Some(dir) = &options.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        let config = builder
            .build()
            .map_err(|e| BrowserError::Launch(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Launch(format!("failed to create new page: {e}")))?;

        tracing::debug!(headless = options.headless, "Chromium launched");

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler,
            navigation_timeout: options.navigation_timeout,
        }))
    }
}

/// A single Chromium page plus the browser that owns it.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

fn is_connection_refused(err: &CdpError) -> bool {
    if let CdpError::Io(io) = err {
        if io.kind() == std::io::ErrorKind::ConnectionRefused {
            return true;
        }
    }
    err.to_string().contains("ERR_CONNECTION_REFUSED")
}

/// Replies from the browser that mean the element is not in the DOM yet.
/// Transport failures (closed socket, dead handler, I/O) are not among them.
fn is_element_absent(err: &CdpError) -> bool {
    matches!(
        err,
        CdpError::Chrome(_)
            | CdpError::ChromeMessage(_)
            | CdpError::NotFound
            | CdpError::FrameNotFound(_)
    )
}

fn protocol(err: CdpError) -> BrowserError {
    BrowserError::Protocol(err.to_string())
}

#[async_trait]
impl BrowsingSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> BrowserResult<NavigationResult> {
        let start = Instant::now();
        let timeout_ms = self.navigation_timeout.as_millis();

        let result = tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await;

        match result {
            Ok(Ok(_)) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| url.to_string());
                Ok(NavigationResult {
                    final_url,
                    load_time_ms: start.elapsed().as_millis() as u64,
                })
            }
            Ok(Err(e)) if is_connection_refused(&e) => Err(BrowserError::ConnectionRefused {
                url: url.to_string(),
            }),
            Ok(Err(e)) => Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: format!("timed out after {timeout_ms}ms"),
            }),
        }
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        let poll = async {
            loop {
                match self.page.find_element(selector).await {
                    Ok(_) => return Ok(()),
                    Err(e) if is_element_absent(&e) => {}
                    Err(e) => return Err(protocol(e)),
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| BrowserError::ElementTimeout {
                selector: selector.to_string(),
                waited: timeout,
            })?
    }

    async fn inject_cookie(&self, cookie: &SessionCookie) -> BrowserResult<()> {
        let param = CookieParam::builder()
            .name(cookie.name.clone())
            .value(cookie.value.clone())
            .domain(cookie.domain.clone())
            .path(cookie.path.clone())
            .build()
            .map_err(BrowserError::Cookie)?;

        self.page
            .set_cookie(param)
            .await
            .map_err(|e| BrowserError::Cookie(format!("{}: {e}", cookie.name)))?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> BrowserResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;

        result
            .into_value()
            .map_err(|e| BrowserError::Script(format!("failed to convert JS result: {e:?}")))
    }

    async fn current_url(&self) -> BrowserResult<String> {
        let url = self.page.url().await.map_err(protocol)?.unwrap_or_default();
        Ok(url)
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        let ChromiumSession {
            mut browser,
            page,
            handler,
            ..
        } = *self;

        let _ = page.close().await;
        let closed = browser.close().await.map(|_| ()).map_err(protocol);
        let _ = browser.wait().await;
        handler.abort();
        closed
    }
}
