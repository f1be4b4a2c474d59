//! Core data types for the block catalog, credentials, and sync results.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::Authenticated;
use crate::storage::VersionUpdate;

/// Keys registered in `_Blockly.Blocks` that are not real blocks.
///
/// `If` is the "Control" flow group, not the actual if block (`controls_if_if`).
pub const BLOCK_DENYLIST: &[&str] = &[
    "If",
    "Compare",
    "IndexOfFirstTrue",
    "actionComment",
    "missingActionBlockType_v1",
    "missingValueBlockType_v1",
];

/// Ordered set of block names exposed by the rules editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub blocks: Vec<String>,
}

impl Catalog {
    /// Build a catalog from the runtime's keys, dropping denylisted names.
    ///
    /// Relative order of the remaining names is preserved.
    pub fn from_candidates<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let blocks = candidates
            .into_iter()
            .map(Into::into)
            .filter(|name| !is_denylisted(name))
            .collect();
        Self { blocks }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blocks.iter().any(|b| b == name)
    }
}

/// Whether a runtime key is on the static denylist.
pub fn is_denylisted(name: &str) -> bool {
    BLOCK_DENYLIST.contains(&name)
}

/// Deployment mode.
///
/// Debug mode reuses a persistent browser profile and probes for an existing
/// login first. Production sessions never start authenticated, so the probe
/// is skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Debug,
    #[default]
    Production,
}

impl Mode {
    pub fn probes_existing_session(self) -> bool {
        matches!(self, Mode::Debug)
    }
}

/// EA account tokens used to log into the portal.
#[derive(Clone, Default)]
pub struct Credentials {
    remid: Option<String>,
    sid: Option<String>,
}

impl Credentials {
    pub fn new(remid: Option<String>, sid: Option<String>) -> Self {
        Self { remid, sid }
    }

    /// Build the cookies to inject, scoped to `domain` and `path`.
    pub fn cookies(&self, domain: &str, path: &str) -> Result<Vec<SessionCookie>, AuthError> {
        [("remid", &self.remid), ("sid", &self.sid)]
            .into_iter()
            .map(|(name, value)| {
                let value = value
                    .as_deref()
                    .filter(|v| !v.is_empty())
                    .ok_or(AuthError::MissingCredential(name))?;
                Ok(SessionCookie {
                    name: name.to_string(),
                    value: value.to_string(),
                    domain: domain.to_string(),
                    path: path.to_string(),
                })
            })
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.cookies("", "").is_ok()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("remid", &self.remid.as_ref().map(|_| "<redacted>"))
            .field("sid", &self.sid.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A domain/path scoped cookie to place in the browser.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .finish()
    }
}

/// Result of a sync run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The skip flag was set; nothing was launched or written.
    Skipped,
    Completed(SyncReport),
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub login: Authenticated,
    pub blocks: usize,
    pub observed_version: u64,
    pub version: VersionUpdate,
    pub localization_fetched: bool,
}

/// Errors raised by a browsing session.
#[derive(thiserror::Error, Debug)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Connection refused: {url}")]
    ConnectionRefused { url: String },

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timed out after {waited:?} waiting for {selector}")]
    ElementTimeout { selector: String, waited: Duration },

    #[error("Cookie rejected: {0}")]
    Cookie(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Browser error: {0}")]
    Protocol(String),
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// Terminal authentication failures.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Login timed out after {waited:?} waiting for the rules editor")]
    LoginTimeout { waited: Duration },

    #[error("Connection refused while loading {url}")]
    ConnectionRefused { url: String },

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Errors reading data out of the loaded page.
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("Unexpected block table shape: {0}")]
    UnexpectedShape(String),

    #[error("Script resource {src} has no numeric version segment")]
    VersionSegment { src: String },

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// Errors touching the data directory.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt version file {}: {content:?}", path.display())]
    CorruptVersion { path: PathBuf, content: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors downloading the localization document.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GET {url} returned {status}")]
    Status { url: String, status: u16 },
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Anything that can end a sync run.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub type SyncResult<T> = Result<T, SyncError>;
