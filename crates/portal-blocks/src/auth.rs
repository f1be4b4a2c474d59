//! Session establishment for the rules editor.
//!
//! Authentication is a small state machine:
//!
//! ```text
//! ProbeLoggedIn ──found──────────────────────────────▶ Ready(ExistingSession)
//!       │ timeout
//!       ▼
//! Authenticating ──found─────────────────────────────▶ Ready(LoggedIn)
//!       │ timeout                 │ connection refused
//!       ▼                         ▼
//! AuthError::LoginTimeout   AuthError::ConnectionRefused
//! ```
//!
//! Production runs start in `Authenticating`; only debug runs, which reuse a
//! browser profile, probe for an existing login. There is exactly one login
//! attempt per run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{PortalEndpoints, SyncConfig, READY_SELECTOR};
use crate::renderer::BrowsingSession;
use crate::types::{AuthError, AuthResult, BrowserError, Credentials};

/// How a session became ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authenticated {
    /// The browser profile was already logged in.
    ExistingSession,
    /// Credentials were injected and the login flow completed.
    LoggedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthState {
    ProbeLoggedIn,
    Authenticating,
    Ready(Authenticated),
}

/// Drives a browsing session until the rules editor workspace is visible.
#[derive(Debug, Clone)]
pub struct SessionAuthenticator {
    endpoints: PortalEndpoints,
    probe_existing: bool,
    probe_timeout: Duration,
    login_timeout: Duration,
}

impl SessionAuthenticator {
    pub fn new(endpoints: PortalEndpoints, probe_existing: bool) -> Self {
        let defaults = crate::config::Timeouts::default();
        Self {
            endpoints,
            probe_existing,
            probe_timeout: defaults.probe,
            login_timeout: defaults.login,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            endpoints: config.endpoints.clone(),
            probe_existing: config.mode.probes_existing_session(),
            probe_timeout: config.timeouts.probe,
            login_timeout: config.timeouts.login,
        }
    }

    pub fn with_timeouts(mut self, probe: Duration, login: Duration) -> Self {
        self.probe_timeout = probe;
        self.login_timeout = login;
        self
    }

    fn initial_state(&self) -> AuthState {
        if self.probe_existing {
            AuthState::ProbeLoggedIn
        } else {
            AuthState::Authenticating
        }
    }

    /// Bring `session` to the loaded rules editor.
    pub async fn establish(
        &self,
        session: &mut dyn BrowsingSession,
        credentials: &Credentials,
    ) -> AuthResult<Authenticated> {
        let mut state = self.initial_state();
        loop {
            state = match state {
                AuthState::ProbeLoggedIn => self.probe(session).await?,
                AuthState::Authenticating => self.log_in(session, credentials).await?,
                AuthState::Ready(how) => return Ok(how),
            };
        }
    }

    async fn probe(&self, session: &mut dyn BrowsingSession) -> AuthResult<AuthState> {
        navigate(session, &self.endpoints.target_url()).await?;

        match session
            .wait_for_element(READY_SELECTOR, self.probe_timeout)
            .await
        {
            Ok(()) => {
                tracing::info!("Already logged in");
                Ok(AuthState::Ready(Authenticated::ExistingSession))
            }
            Err(BrowserError::ElementTimeout { .. }) => {
                tracing::info!("Not logged in");
                Ok(AuthState::Authenticating)
            }
            Err(e) => Err(classify(e)),
        }
    }

    async fn log_in(
        &self,
        session: &mut dyn BrowsingSession,
        credentials: &Credentials,
    ) -> AuthResult<AuthState> {
        let cookies = credentials.cookies(
            &self.endpoints.identity_domain,
            &self.endpoints.identity_path,
        )?;

        // Cookies are only accepted for the domain the page is on.
        navigate(session, &self.endpoints.identity_url()).await?;
        for cookie in &cookies {
            session.inject_cookie(cookie).await.map_err(classify)?;
        }

        navigate(session, &self.endpoints.login_url()).await?;

        tracing::debug!("Waiting for playground to load");
        navigate(session, &self.endpoints.target_url()).await?;
        if let Ok(url) = session.current_url().await {
            tracing::debug!("at {url}");
        }

        match session
            .wait_for_element(READY_SELECTOR, self.login_timeout)
            .await
        {
            Ok(()) => {
                tracing::info!("Login successful");
                Ok(AuthState::Ready(Authenticated::LoggedIn))
            }
            Err(BrowserError::ElementTimeout { waited, .. }) => {
                tracing::debug!("Login failed, credentials were set");
                Err(AuthError::LoginTimeout { waited })
            }
            Err(e) => Err(classify(e)),
        }
    }
}

async fn navigate(session: &mut dyn BrowsingSession, url: &str) -> AuthResult<()> {
    let nav = session.navigate(url).await.map_err(classify)?;
    tracing::debug!(url, final_url = %nav.final_url, load_time_ms = nav.load_time_ms, "navigated");
    Ok(())
}

fn classify(err: BrowserError) -> AuthError {
    match err {
        BrowserError::ConnectionRefused { url } => AuthError::ConnectionRefused { url },
        other => AuthError::Browser(other),
    }
}
