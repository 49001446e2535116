//! Asset upload scenarios against an in-memory releaser.

use std::path::{Path, PathBuf};

use tagship_reconcile::{
    upload_asset, upload_assets, ReleaseConfig, ReleaseError, RepoSlug,
};
use tagship_testing::{asset, Call, MockReleaser};

const ENDPOINT: &str = "https://uploads.example.com/releases/7/assets";

fn config(fail_on_asset_upload_issue: bool) -> ReleaseConfig {
    ReleaseConfig {
        fail_on_asset_upload_issue,
        ..ReleaseConfig::new(RepoSlug::new("octo", "hello"))
    }
}

fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn test_replaces_same_named_asset() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "app.zip", b"zip bytes");
    let releaser = MockReleaser::new();
    let current = vec![asset(11, "notes.txt"), asset(12, "app.zip")];

    let meta = upload_asset(&config(false), &releaser, ENDPOINT, &path, &current)
        .await
        .unwrap();

    assert_eq!(meta.name(), Some("app.zip"));
    assert_eq!(
        releaser.calls(),
        vec![
            Call::DeleteAsset { asset_id: 12 },
            Call::UploadAsset {
                endpoint: ENDPOINT.to_string(),
                name: "app.zip".to_string(),
                mime: "application/zip".to_string(),
                size: 9,
            },
        ]
    );
}

#[tokio::test]
async fn test_name_match_is_case_sensitive() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "app.zip", b"zip");
    let releaser = MockReleaser::new();

    upload_asset(&config(false), &releaser, ENDPOINT, &path, &[asset(12, "APP.zip")])
        .await
        .unwrap();

    assert_eq!(releaser.count(|c| matches!(c, Call::DeleteAsset { .. })), 0);
}

#[tokio::test]
async fn test_tolerated_failure_returns_empty_result() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_file(dir.path(), "good.tar.gz", b"good");
    let bad = write_file(dir.path(), "bad.bin", b"bad");
    let releaser = MockReleaser::new().fail_upload("bad.bin");

    let results = upload_assets(&config(false), &releaser, ENDPOINT, &[bad, good], &[])
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_empty());
    assert_eq!(results[1].name(), Some("good.tar.gz"));
    assert_eq!(releaser.count(|c| matches!(c, Call::UploadAsset { .. })), 2);
}

#[tokio::test]
async fn test_strict_failure_aborts_batch() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_file(dir.path(), "good.tar.gz", b"good");
    let bad = write_file(dir.path(), "bad.bin", b"bad");
    let releaser = MockReleaser::new().fail_upload("bad.bin");

    let err = upload_assets(&config(true), &releaser, ENDPOINT, &[good, bad], &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ReleaseError::AssetUpload { ref name, .. } if name == "bad.bin"));
}

#[tokio::test]
async fn test_delete_failure_follows_tolerance_policy() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "app.zip", b"zip");
    let current = [asset(12, "app.zip")];

    let tolerant = MockReleaser::new().fail_delete(12);
    let meta = upload_asset(&config(false), &tolerant, ENDPOINT, &path, &current)
        .await
        .unwrap();
    assert!(meta.is_empty());
    assert_eq!(tolerant.count(|c| matches!(c, Call::UploadAsset { .. })), 0);

    let strict = MockReleaser::new().fail_delete(12);
    let err = upload_asset(&config(true), &strict, ENDPOINT, &path, &current)
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::Remote { status: 500, .. }));
}

#[tokio::test]
async fn test_missing_file_always_fails() {
    let dir = tempfile::tempdir().unwrap();
    let releaser = MockReleaser::new();

    let err = upload_asset(
        &config(false),
        &releaser,
        ENDPOINT,
        &dir.path().join("missing.zip"),
        &[],
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ReleaseError::Io { .. }));
    assert!(releaser.calls().is_empty());
}

#[tokio::test]
async fn test_results_strip_uploader() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "app.zip", b"zip");
    let releaser = MockReleaser::new();

    let results = upload_assets(&config(false), &releaser, ENDPOINT, &[path], &[])
        .await
        .unwrap();

    assert!(results[0].get("uploader").is_none());
    assert_eq!(
        results[0].get("state"),
        Some(&serde_json::json!("uploaded"))
    );
}
