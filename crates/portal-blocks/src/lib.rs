//! portal-blocks — sync the Battlefield Portal rules-editor block catalog,
//! editor version, and localization into a local data directory.

pub mod auth;
pub mod config;
pub mod extract;
pub mod http;
pub mod renderer;
pub mod storage;
pub mod sync;
pub mod types;

pub use auth::{Authenticated, SessionAuthenticator};
pub use config::{PortalEndpoints, SyncConfig, Timeouts};
pub use extract::{detect_version, version_from_sources, CatalogExtractor};
pub use http::LocalizationClient;
pub use renderer::chromium::ChromiumLauncher;
pub use renderer::{BrowsingSession, LaunchOptions, NavigationResult, SessionLauncher};
pub use storage::{DataDir, VersionStore, VersionUpdate};
pub use sync::SyncOrchestrator;
pub use types::*;
