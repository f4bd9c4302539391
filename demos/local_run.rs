//! # Local Run Example
//!
//! Runs one job end to end against a sandbox directory standing in for the remote
//! home, then prints the result.
//!
//! ## Usage
//!
//! ```sh
//! cargo run --example local_run --features "jobs local"
//! ```

use heron::prelude::*;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let work = tempfile::tempdir()?;
    let sandbox = tempfile::tempdir()?;
    std::fs::write(
        work.path().join("hello.sh"),
        "echo hello from $(pwd)\nmkdir -p out && date > out/stamp.txt\n",
    )?;

    // The local transport runs commands with `sh`, so skip python discovery.
    let mut config = ConnectionConfig::from_lookup(|key| match key {
        env::LOCAL_PORT => None,
        _ => Some("local".to_string()),
    })?;
    config.interpreter = Some("sh".to_string());

    let manager = TaskManager::new(
        LocalConnector::new(sandbox.path()),
        config,
        TaskManagerConfig::default().with_poll_interval(Duration::from_millis(100)),
    );

    let response = manager.submit(work.path().join("hello.sh"), work.path());
    println!("{}", serde_json::to_string_pretty(&response)?);

    manager.wait(Duration::from_secs(60)).await;
    println!("{}", serde_json::to_string_pretty(&manager.get_last_result())?);
    Ok(())
}
