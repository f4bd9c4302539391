use heron_core::prelude::*;
use heron_local::LocalSession;
use heron_remote::prelude::*;
use std::fs;
use std::path::Path;

fn sh_runner(working_dir: &str) -> ScriptRunner {
    ScriptRunner::new(RunOptions {
        interpreter: Some("sh".to_string()),
        working_dir: Some(working_dir.to_string()),
        python_path: Some(".".to_string()),
        ..RunOptions::default()
    })
}

fn script(home: &Path, rel: &str, body: &str) {
    let path = home.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

#[tokio::test]
async fn output_is_captured_and_logged() {
    let home = tempfile::tempdir().unwrap();
    script(
        home.path(),
        "job/run.sh",
        "echo \"pp=$PYTHONPATH\"\necho oops >&2\npwd > where.txt\n",
    );

    let session = LocalSession::new(home.path());
    let out = sh_runner("~/job")
        .execute_python_script(&session, "~/job/run.sh", Some("~/job/execution.log"))
        .await
        .unwrap();

    assert!(out.success());
    assert_eq!(out.stdout, "pp=.\n");
    assert_eq!(out.stderr, "oops\n");

    let log = fs::read_to_string(home.path().join("job/execution.log")).unwrap();
    assert!(log.contains("pp=."));
    assert!(log.contains("oops"));
    assert!(!home.path().join("job/execution.log.status").exists());

    let cwd = fs::read_to_string(home.path().join("job/where.txt")).unwrap();
    assert!(cwd.trim_end().ends_with("job"));
}

#[tokio::test]
async fn exit_code_survives_the_tee() {
    let home = tempfile::tempdir().unwrap();
    script(home.path(), "job/fail.sh", "echo partial > out.txt\nexit 7\n");

    let session = LocalSession::new(home.path());
    let out = sh_runner("~/job")
        .execute_python_script(&session, "~/job/fail.sh", Some("~/job/execution.log"))
        .await
        .unwrap();

    assert_eq!(out.exit_code, 7);
    assert!(home.path().join("job/out.txt").is_file());
}

#[tokio::test]
async fn missing_script_is_an_error() {
    let home = tempfile::tempdir().unwrap();
    let session = LocalSession::new(home.path());

    let err = sh_runner("~")
        .execute_python_script(&session, "~/nope.py", None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::ScriptNotFound(_)));
}

#[tokio::test]
async fn discovery_prefers_requested_then_newest_install() {
    let home = tempfile::tempdir().unwrap();
    for (dir, version) in [(".py39", "3.9.18"), (".py311", "3.11.4"), (".py310", "3.10.2")] {
        let bin = home.path().join(dir).join("bin/python3");
        script(home.path(), &format!("{dir}/bin/python3"), &format!("#!/bin/sh\necho Python {version}\n"));
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();
        }
    }
    let session = LocalSession::new(home.path());
    let home_str = home.path().to_string_lossy().to_string();

    let newest = ScriptRunner::new(RunOptions::default())
        .discover_interpreter(&session, &home_str)
        .await
        .unwrap();
    assert!(newest.0.contains(".py311/bin/python3"));
    assert!(newest.0.ends_with(" -u"));

    let pinned = ScriptRunner::new(RunOptions {
        python_version: Some("39".to_string()),
        ..RunOptions::default()
    })
    .discover_interpreter(&session, &home_str)
    .await
    .unwrap();
    assert!(pinned.0.contains(".py39/bin/python3"));
}
