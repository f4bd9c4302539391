//! # Heron Server
//!
//! An Axum front end for a [`TaskManager`].
//!
//! | Route | |
//! |---|---|
//! | `GET /health` | liveness |
//! | `POST /jobs` | submit `{"script_path", "directory_path"}` |
//! | `GET /jobs/status` | current job snapshot |
//! | `GET /jobs/result` | last terminal result |
//! | `GET /jobs/wait?timeout_secs=N` | block until the job finishes |
//!
//! ## Example
//!
//! ```no_run
//! use heron_core::prelude::*;
//! use heron_jobs::{TaskManager, TaskManagerConfig};
//! use heron_local::LocalConnector;
//! use heron_server::HeronServer;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let manager = TaskManager::new(
//!     LocalConnector::new("/tmp/sandbox"),
//!     EnvConfigProvider,
//!     TaskManagerConfig::default(),
//! );
//! let app = HeronServer::default().build(manager);
//! heron_server::serve("127.0.0.1:3000", app).await?;
//! # Ok(())
//! # }
//! ```

mod api;

pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use heron_core::constants::routes;
use heron_core::traits::{ConfigProvider, Connector};
use heron_jobs::TaskManager;
use state::AppState;
use std::time::Duration;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use api::{RequestError, SubmitRequest};

#[derive(Clone, Debug, Default)]
pub struct HeronServer {
    config: HeronServerConfig,
}

#[derive(Clone, Debug)]
pub struct HeronServerConfig {
    /// Used when `/jobs/wait` has no `timeout_secs`.
    pub default_wait: Duration,
    pub max_wait: Duration,
}

impl Default for HeronServerConfig {
    fn default() -> Self {
        Self {
            default_wait: Duration::from_secs(60),
            max_wait: Duration::from_secs(3600),
        }
    }
}

impl HeronServer {
    pub fn new(config: HeronServerConfig) -> Self {
        Self { config }
    }

    pub fn build<C: Connector, P: ConfigProvider>(self, manager: TaskManager<C, P>) -> Router {
        let state = AppState {
            manager,
            config: self.config,
        };

        Router::new()
            .route(routes::HEALTH, get(|| async { "OK" }))
            .route(routes::JOBS, post(api::submit_job))
            .route(routes::JOBS_STATUS, get(api::job_status))
            .route(routes::JOBS_RESULT, get(api::last_result))
            .route(routes::JOBS_WAIT, get(api::wait_job))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

/// Binds `addr` and serves `app` until the process is stopped.
pub async fn serve(addr: impl ToSocketAddrs, app: Router) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::state::*;
    pub use crate::{HeronServer, HeronServerConfig, RequestError, SubmitRequest};
}
