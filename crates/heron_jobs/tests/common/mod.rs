#![allow(dead_code)]

use heron_core::prelude::*;
use heron_jobs::{TaskManager, TaskManagerConfig};
use heron_local::{Faults, LocalConnector};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub struct Harness {
    pub manager: TaskManager<LocalConnector, ConnectionConfig>,
    pub connector: LocalConnector,
    pub work: TempDir,
    pub remote_home: TempDir,
}

pub fn config() -> ConnectionConfig {
    let mut config = ConnectionConfig::from_lookup(|key| match key {
        env::LOCAL_PORT => None,
        _ => Some("test".to_string()),
    })
    .unwrap();
    config.interpreter = Some("sh".to_string());
    config
}

pub fn settings() -> TaskManagerConfig {
    TaskManagerConfig::default().with_poll_interval(Duration::from_millis(20))
}

impl Harness {
    pub fn new() -> Self {
        Self::with_faults(Faults::default())
    }

    pub fn with_faults(faults: Faults) -> Self {
        let remote_home = tempfile::tempdir().unwrap();
        let connector = LocalConnector::new(remote_home.path()).with_faults(faults);
        Self {
            manager: TaskManager::new(connector.clone(), config(), settings()),
            connector,
            work: tempfile::tempdir().unwrap(),
            remote_home,
        }
    }

    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.work.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    pub fn dir(&self) -> &Path {
        self.work.path()
    }

    pub async fn run(&self, name: &str, body: &str) -> JobResult {
        let script = self.script(name, body);
        let response = self.manager.submit(&script, self.dir());
        assert!(response.accepted, "{}", response.message);
        let status = self.manager.wait(Duration::from_secs(30)).await;
        assert!(status.is_terminal(), "job did not finish: {status:?}");
        self.manager.get_last_result().result.unwrap()
    }
}
