//! Durable artifacts in the data directory.
//!
//! Each file is written independently. Overwrites go through a sibling temp
//! file and a rename, so a reader never sees a half-written file, but there
//! is no coupling between files.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::types::{Catalog, StoreError, StoreResult};

pub const CATALOG_FILE: &str = "enabled_blocks.json";
pub const VERSION_FILE: &str = "rules_editor_version";
pub const VERSION_HISTORY_FILE: &str = "rules_editor_version_history";
pub const LOCALIZATION_FILE: &str = "i18n.json";

/// The directory holding every persisted artifact.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_FILE)
    }

    pub fn localization_path(&self) -> PathBuf {
        self.root.join(LOCALIZATION_FILE)
    }

    pub fn version_store(&self) -> VersionStore {
        VersionStore::new(&self.root)
    }

    /// Replace the catalog file wholesale.
    pub fn write_catalog(&self, catalog: &Catalog) -> StoreResult<()> {
        write_atomic(&self.catalog_path(), &serde_json::to_vec(catalog)?)
    }

    /// Read the last written catalog, if any.
    pub fn read_catalog(&self) -> StoreResult<Option<Catalog>> {
        match std::fs::read(self.catalog_path()) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the localization document wholesale.
    pub fn write_localization(&self, document: &serde_json::Value) -> StoreResult<()> {
        write_atomic(&self.localization_path(), &serde_json::to_vec(document)?)
    }

    pub fn has_localization(&self) -> bool {
        self.localization_path().is_file()
    }
}

/// Result of offering an observed version to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionUpdate {
    /// Stored version before the proposal.
    pub previous: u64,
    /// Stored version after the proposal.
    pub current: u64,
    pub advanced: bool,
}

/// High-water mark of the synced editor version plus its history log.
#[derive(Debug, Clone)]
pub struct VersionStore {
    record_path: PathBuf,
    history_path: PathBuf,
}

impl VersionStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            record_path: dir.join(VERSION_FILE),
            history_path: dir.join(VERSION_HISTORY_FILE),
        }
    }

    /// The stored version, or 0 before the first successful sync.
    pub fn read_current(&self) -> StoreResult<u64> {
        let content = match std::fs::read_to_string(&self.record_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        match content.lines().map(str::trim).filter(|l| !l.is_empty()).last() {
            None => Ok(0),
            Some(line) => line.parse::<u64>().map_err(|_| StoreError::CorruptVersion {
                path: self.record_path.clone(),
                content: line.to_string(),
            }),
        }
    }

    /// Record `observed` if it is newer than the stored version.
    ///
    /// The superseded version is appended to the history before the record
    /// is overwritten. Older or equal versions leave both files untouched.
    pub fn propose(&self, observed: u64) -> StoreResult<VersionUpdate> {
        let current = self.read_current()?;
        if observed <= current {
            return Ok(VersionUpdate {
                previous: current,
                current,
                advanced: false,
            });
        }

        if let Some(parent) = self.history_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut history = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.history_path)?;
        writeln!(history, "{current}")?;
        history.sync_all()?;

        write_atomic(&self.record_path, observed.to_string().as_bytes())?;

        tracing::info!(previous = current, current = observed, "Editor version advanced");
        Ok(VersionUpdate {
            previous: current,
            current: observed,
            advanced: true,
        })
    }

    /// Every superseded version, oldest first.
    pub fn history(&self) -> StoreResult<Vec<u64>> {
        let content = match std::fs::read_to_string(&self.history_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|line| {
                line.parse::<u64>().map_err(|_| StoreError::CorruptVersion {
                    path: self.history_path.clone(),
                    content: line.to_string(),
                })
            })
            .collect()
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = parent.join(format!(".{name}.tmp"));
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
