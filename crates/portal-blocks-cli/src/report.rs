//! Operator-facing output: failure messages, console groups, and status.

use std::path::PathBuf;

use serde::Serialize;

use portal_blocks::{AuthError, DataDir, PortalEndpoints, StoreResult, SyncError};

/// One-line message printed before exiting with a failure status.
pub fn failure_message(err: &SyncError, endpoints: &PortalEndpoints) -> String {
    match err {
        SyncError::Auth(AuthError::LoginTimeout { .. }) => "Login failed... exiting".to_string(),
        SyncError::Auth(AuthError::ConnectionRefused { .. }) => {
            format!("Unable to connect to {}.. exiting", endpoints.app_host())
        }
        other => format!("Error: {other}"),
    }
}

/// Wraps output in a collapsible GitHub Actions log group.
pub struct ConsoleGroup {
    enabled: bool,
}

impl ConsoleGroup {
    pub fn open(title: &str, enabled: bool) -> Self {
        if enabled {
            println!("::group::{title}");
        }
        Self { enabled }
    }
}

impl Drop for ConsoleGroup {
    fn drop(&mut self) {
        if self.enabled {
            println!("::endgroup::");
        }
    }
}

/// Snapshot of what the data directory currently holds.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub data_dir: PathBuf,
    pub version: u64,
    pub history: Vec<u64>,
    pub blocks: Option<usize>,
    pub localization: bool,
}

impl StatusReport {
    pub fn collect(data: &DataDir) -> StoreResult<Self> {
        let store = data.version_store();
        Ok(Self {
            data_dir: data.path().to_path_buf(),
            version: store.read_current()?,
            history: store.history()?,
            blocks: data.read_catalog()?.map(|c| c.len()),
            localization: data.has_localization(),
        })
    }

    pub fn render(&self) -> String {
        let history = if self.history.is_empty() {
            "-".to_string()
        } else {
            self.history
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        let blocks = self
            .blocks
            .map(|n| n.to_string())
            .unwrap_or_else(|| "not synced".to_string());

        format!(
            "Data dir:       {}\n\
             Editor version: {}\n\
             History:        {}\n\
             Blocks:         {}\n\
             i18n.json:      {}",
            self.data_dir.display(),
            self.version,
            history,
            blocks,
            if self.localization { "present" } else { "missing" },
        )
    }
}
