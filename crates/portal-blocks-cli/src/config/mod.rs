//! Configuration loading and resolution.
//!
//! Every option comes from the environment, with command-line flags taking
//! precedence where one exists.

use std::path::PathBuf;

use portal_blocks::{Credentials, Mode, SyncConfig};

pub const ENV_DEBUG: &str = "DEBUG";
pub const ENV_REMID: &str = "REMID";
pub const ENV_SID: &str = "SID";
pub const ENV_SKIP: &str = "SKIP_GETTING_BLOCK_NAMES";
pub const ENV_DATA_DIR: &str = "DATA_DIR";
pub const ENV_BASE_URL: &str = "PORTAL_BASE_URL";
pub const ENV_PLAYGROUND_ID: &str = "PORTAL_PLAYGROUND_ID";
pub const ENV_CHROMIUM_PATH: &str = "PORTAL_CHROMIUM_PATH";
pub const ENV_GITHUB_ACTIONS: &str = "GITHUB_ACTIONS";

pub const DEFAULT_DATA_DIR: &str = "data";

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub debug: bool,
}

/// Interpret an environment flag. Unset and empty are false.
pub fn env_flag(value: Option<&str>) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => false,
        Some(v) => !matches!(v.as_str(), "" | "0" | "false" | "no" | "off"),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Resolve the data directory.
pub fn resolve_data_dir<F>(explicit: Option<&PathBuf>, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = explicit {
        return path.clone();
    }

    if let Some(env_path) = non_empty(lookup(ENV_DATA_DIR)) {
        return PathBuf::from(env_path);
    }

    PathBuf::from(DEFAULT_DATA_DIR)
}

/// Build the run configuration from `lookup` (normally the process env).
pub fn resolve_config<F>(overrides: &Overrides, lookup: F) -> SyncConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = SyncConfig::new(resolve_data_dir(overrides.data_dir.as_ref(), &lookup));

    config.mode = if overrides.debug || env_flag(lookup(ENV_DEBUG).as_deref()) {
        Mode::Debug
    } else {
        Mode::Production
    };
    config.skip = env_flag(lookup(ENV_SKIP).as_deref());
    config.credentials = Credentials::new(non_empty(lookup(ENV_REMID)), non_empty(lookup(ENV_SID)));

    if let Some(base) = non_empty(lookup(ENV_BASE_URL)) {
        config.endpoints.app_base = base;
    }
    if let Some(id) = non_empty(lookup(ENV_PLAYGROUND_ID)) {
        config.endpoints.playground_id = id;
    }
    config.chromium_path = non_empty(lookup(ENV_CHROMIUM_PATH)).map(PathBuf::from);

    config
}

/// Build the run configuration from the process environment.
pub fn from_env(overrides: &Overrides) -> SyncConfig {
    resolve_config(overrides, |key| std::env::var(key).ok())
}

/// Whether console grouping markers should be printed.
pub fn in_github_actions() -> bool {
    std::env::var(ENV_GITHUB_ACTIONS).is_ok_and(|v| v == "true")
}
