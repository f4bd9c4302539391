use heron_core::prelude::*;
use heron_local::LocalSession;
use heron_remote::prelude::*;
use std::fs;
use std::path::Path;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn staging_is_empty(home: &Path) -> bool {
    let tmp = home.join(".heron/tmp");
    !tmp.exists() || fs::read_dir(tmp).unwrap().next().is_none()
}

#[tokio::test]
async fn upload_expands_home_and_cleans_up() {
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write(work.path(), "run.py", "print(1)");
    write(work.path(), "data/input.csv", "a,b");
    write(work.path(), ".venv/bin/python", "#!");

    let session = LocalSession::new(home.path());
    ArchiveTransfer::default()
        .upload(&session, work.path(), "~/heron-jobs/abc")
        .await
        .unwrap();

    let remote = home.path().join("heron-jobs/abc");
    assert_eq!(fs::read_to_string(remote.join("data/input.csv")).unwrap(), "a,b");
    assert!(remote.join("run.py").is_file());
    assert!(!remote.join(".venv").exists());
    assert!(staging_is_empty(home.path()));
}

#[tokio::test]
async fn upload_rejects_a_file_source() {
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write(work.path(), "run.py", "");

    let session = LocalSession::new(home.path());
    let err = ArchiveTransfer::default()
        .upload(&session, &work.path().join("run.py"), "~/x")
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::NotADirectory(_)));
}

#[tokio::test]
async fn download_respects_overwrite_flag() {
    let home = tempfile::tempdir().unwrap();
    write(home.path(), "jobs/1/out/result.txt", "42");
    write(home.path(), "jobs/1/execution.log", "done");

    let local = tempfile::tempdir().unwrap();
    let dest = local.path().join("artifacts");
    write(&dest, "stale.txt", "old");

    let session = LocalSession::new(home.path());
    let transfer = ArchiveTransfer::default();

    let err = transfer
        .download(&session, "~/jobs/1", &dest, false)
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::DestinationNotEmpty(_)));
    assert!(dest.join("stale.txt").exists());

    transfer
        .download(&session, "~/jobs/1", &dest, true)
        .await
        .unwrap();
    assert_eq!(fs::read_to_string(dest.join("out/result.txt")).unwrap(), "42");
    assert!(dest.join("execution.log").is_file());
    assert!(!dest.join("stale.txt").exists());
    assert!(staging_is_empty(home.path()));
}

#[tokio::test]
async fn download_of_missing_remote_dir_fails_cleanly() {
    let home = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let session = LocalSession::new(home.path());

    let err = ArchiveTransfer::default()
        .download(&session, "~/nope", &local.path().join("dest"), true)
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::RemoteNotFound(_)));
    assert!(!local.path().join("dest").exists());
}

#[tokio::test]
async fn download_accepts_windows_separators() {
    let home = tempfile::tempdir().unwrap();
    write(home.path(), "jobs/2/a.txt", "a");
    let local = tempfile::tempdir().unwrap();
    let session = LocalSession::new(home.path());

    ArchiveTransfer::default()
        .download(&session, r"~\jobs\2", local.path(), false)
        .await
        .unwrap();
    assert!(local.path().join("a.txt").is_file());
}

#[tokio::test]
async fn closed_session_surfaces_as_transfer_error() {
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let mut session = LocalSession::new(home.path());
    session.close().await.unwrap();

    let err = ArchiveTransfer::default()
        .upload(&session, work.path(), "~/x")
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::Session(SessionError::NotConnected)));
}

#[tokio::test]
async fn custom_staging_directory_is_used_and_emptied() {
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write(work.path(), "run.py", "print(1)");

    let session = LocalSession::new(home.path());
    ArchiveTransfer::default()
        .with_remote_tmp_dir("scratch/staging")
        .upload(&session, work.path(), "~/job")
        .await
        .unwrap();

    let staging = home.path().join("scratch/staging");
    assert!(staging.is_dir());
    assert!(fs::read_dir(&staging).unwrap().next().is_none());
    assert!(!home.path().join(".heron").exists());
    assert!(home.path().join("job/run.py").is_file());
}
