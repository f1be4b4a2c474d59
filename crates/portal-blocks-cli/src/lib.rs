//! portal-blocks CLI — configuration and reporting for unattended sync runs.

pub mod config;
pub mod report;

pub use config::{from_env, resolve_config, Overrides};
pub use report::{failure_message, ConsoleGroup, StatusReport};
