//! End-to-end sync runs against the scripted portal and a mock i18n server.

mod common;

use common::{config, FakeLauncher, Portal};
use portal_blocks::storage::{
    CATALOG_FILE, LOCALIZATION_FILE, VERSION_FILE, VERSION_HISTORY_FILE,
};
use portal_blocks::{
    AuthError, Authenticated, DataDir, SyncError, SyncOrchestrator, SyncOutcome,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn read(dir: &std::path::Path, name: &str) -> Vec<u8> {
    std::fs::read(dir.join(name)).unwrap()
}

fn dir_entries(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

async fn mount_i18n(server: &MockServer, version: u64, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/{version}/assets/i18n/en-US.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": version,
            "block.Wait": "Wait",
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_first_run_advances_and_fetches() {
    let server = MockServer::start().await;
    mount_i18n(&server, 5, 1).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &server.uri());
    let launcher = FakeLauncher::new(Portal::new(config.endpoints.clone()).with_version(5));
    let journal = launcher.journal.clone();

    let outcome = SyncOrchestrator::new(config, launcher).run().await.unwrap();

    let SyncOutcome::Completed(report) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(report.login, Authenticated::LoggedIn);
    assert_eq!(report.observed_version, 5);
    assert!(report.version.advanced);
    assert!(report.localization_fetched);
    assert_eq!(report.blocks, 2);

    assert_eq!(read(dir.path(), VERSION_FILE), b"5");
    assert_eq!(read(dir.path(), VERSION_HISTORY_FILE), b"0\n");
    let i18n: serde_json::Value = serde_json::from_slice(&read(dir.path(), LOCALIZATION_FILE)).unwrap();
    assert_eq!(i18n["version"], 5);

    let catalog = DataDir::new(dir.path()).read_catalog().unwrap().unwrap();
    assert_eq!(catalog.blocks, vec!["Wait", "Teleport"]);

    let journal = journal.lock().unwrap();
    assert_eq!(journal.launches, 1);
    assert_eq!(journal.closes, 1);
}

#[tokio::test]
async fn test_unchanged_version_is_noop() {
    let server = MockServer::start().await;
    mount_i18n(&server, 5, 0).await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(VERSION_FILE), "5").unwrap();
    std::fs::write(dir.path().join(VERSION_HISTORY_FILE), "0\n").unwrap();
    std::fs::write(dir.path().join(LOCALIZATION_FILE), b"{\"old\":true}").unwrap();

    let config = config(dir.path(), &server.uri());
    let launcher = FakeLauncher::new(Portal::new(config.endpoints.clone()).with_version(5));

    let outcome = SyncOrchestrator::new(config, launcher).run().await.unwrap();

    let SyncOutcome::Completed(report) = outcome else {
        panic!("expected a completed run");
    };
    assert!(!report.version.advanced);
    assert!(!report.localization_fetched);
    assert_eq!(read(dir.path(), VERSION_FILE), b"5");
    assert_eq!(read(dir.path(), VERSION_HISTORY_FILE), b"0\n");
    assert_eq!(read(dir.path(), LOCALIZATION_FILE), b"{\"old\":true}");
    // The catalog is still refreshed.
    assert!(dir.path().join(CATALOG_FILE).exists());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    mount_i18n(&server, 9, 1).await;
    let dir = tempfile::tempdir().unwrap();

    for _ in 0..2 {
        let config = config(dir.path(), &server.uri());
        let launcher = FakeLauncher::new(Portal::new(config.endpoints.clone()).with_version(9));
        SyncOrchestrator::new(config, launcher).run().await.unwrap();
    }

    assert_eq!(read(dir.path(), VERSION_FILE), b"9");
    assert_eq!(read(dir.path(), VERSION_HISTORY_FILE), b"0\n");
}

#[tokio::test]
async fn test_login_timeout_closes_session_and_writes_nothing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &server.uri());
    let mut portal = Portal::new(config.endpoints.clone());
    portal.accepts_login = false;
    let launcher = FakeLauncher::new(portal);
    let journal = launcher.journal.clone();

    let err = SyncOrchestrator::new(config, launcher).run().await.unwrap_err();

    assert!(matches!(err, SyncError::Auth(AuthError::LoginTimeout { .. })));
    let journal = journal.lock().unwrap();
    assert_eq!(journal.launches, 1);
    assert_eq!(journal.closes, 1);
    assert_eq!(dir_entries(dir.path()), 0);
}

#[tokio::test]
async fn test_connection_refused_closes_session() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &server.uri());
    let mut portal = Portal::new(config.endpoints.clone());
    portal.refused_urls = vec![config.endpoints.identity_url()];
    let launcher = FakeLauncher::new(portal);
    let journal = launcher.journal.clone();

    let err = SyncOrchestrator::new(config, launcher).run().await.unwrap_err();

    assert!(matches!(err, SyncError::Auth(AuthError::ConnectionRefused { .. })));
    assert_eq!(journal.lock().unwrap().closes, 1);
    assert_eq!(dir_entries(dir.path()), 0);
}

#[tokio::test]
async fn test_skip_flag_launches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), "http://127.0.0.1:9");
    config.skip = true;
    let launcher = FakeLauncher::new(Portal::new(config.endpoints.clone()));
    let journal = launcher.journal.clone();

    let outcome = SyncOrchestrator::new(config, launcher).run().await.unwrap();

    assert_eq!(outcome, SyncOutcome::Skipped);
    assert_eq!(journal.lock().unwrap().launches, 0);
    assert_eq!(dir_entries(dir.path()), 0);
}

#[tokio::test]
async fn test_missing_version_metadata_is_safe_noop() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(VERSION_FILE), "3").unwrap();
    let config = config(dir.path(), &server.uri());
    let mut portal = Portal::new(config.endpoints.clone());
    portal.script_sources = vec![Some("/3/vendor.js".into()), None];
    let launcher = FakeLauncher::new(portal);

    let outcome = SyncOrchestrator::new(config, launcher).run().await.unwrap();

    let SyncOutcome::Completed(report) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(report.observed_version, 0);
    assert!(!report.version.advanced);
    assert_eq!(read(dir.path(), VERSION_FILE), b"3");
    assert!(!dir.path().join(VERSION_HISTORY_FILE).exists());
    assert!(!dir.path().join(LOCALIZATION_FILE).exists());
}

#[tokio::test]
async fn test_failed_fetch_still_closes_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &server.uri());
    let launcher = FakeLauncher::new(Portal::new(config.endpoints.clone()).with_version(2));
    let journal = launcher.journal.clone();

    let err = SyncOrchestrator::new(config, launcher).run().await.unwrap_err();

    assert!(matches!(err, SyncError::Fetch(_)));
    assert_eq!(journal.lock().unwrap().closes, 1);
    assert!(!dir.path().join(LOCALIZATION_FILE).exists());

    // The record already advanced, so a rerun at the same version leaves i18n missing.
    assert_eq!(read(dir.path(), VERSION_FILE), b"2");
    assert_eq!(read(dir.path(), VERSION_HISTORY_FILE), b"0\n");

    let rerun = common::config(dir.path(), &server.uri());
    let launcher = FakeLauncher::new(Portal::new(rerun.endpoints.clone()).with_version(2));
    let outcome = SyncOrchestrator::new(rerun, launcher).run().await.unwrap();
    let SyncOutcome::Completed(report) = outcome else {
        panic!("expected a completed run");
    };
    assert!(!report.localization_fetched);
    assert!(!dir.path().join(LOCALIZATION_FILE).exists());
}

#[tokio::test]
async fn test_relative_bundles_resolve_against_versioned_base() {
    let server = MockServer::start().await;
    mount_i18n(&server, 4512, 1).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &server.uri());
    let launcher =
        FakeLauncher::new(Portal::new(config.endpoints.clone()).with_relative_bundles(4512));

    let outcome = SyncOrchestrator::new(config, launcher).run().await.unwrap();

    let SyncOutcome::Completed(report) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(report.observed_version, 4512);
    assert!(report.localization_fetched);
    assert_eq!(read(dir.path(), VERSION_FILE), b"4512");
}
