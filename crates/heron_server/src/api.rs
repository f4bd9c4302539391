use crate::state::AppState;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use heron_core::prelude::*;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("timeout_secs must be at most {max}")]
    WaitTooLong { max: u64 },
}

pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Some(err) = self.0.downcast_ref::<RequestError>() {
            return match err {
                RequestError::WaitTooLong { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
            }
            .into_response();
        }

        error!("Internal Server Error: {:?}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub script_path: PathBuf,
    pub directory_path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct WaitParams {
    pub timeout_secs: Option<u64>,
}

/// POST /jobs
/// 202 when accepted, 409 while another job runs, 400 for bad paths.
pub async fn submit_job<C: Connector, P: ConfigProvider>(
    State(state): State<AppState<C, P>>,
    Json(req): Json<SubmitRequest>,
) -> impl IntoResponse {
    let response = state.manager.submit(&req.script_path, &req.directory_path);
    let status = match response.reason {
        None => StatusCode::ACCEPTED,
        Some(RejectReason::Busy) => StatusCode::CONFLICT,
        Some(RejectReason::InvalidInput) => StatusCode::BAD_REQUEST,
    };
    (status, Json(response))
}

/// GET /jobs/status
pub async fn job_status<C: Connector, P: ConfigProvider>(
    State(state): State<AppState<C, P>>,
) -> Json<JobSnapshot> {
    Json(state.manager.get_status())
}

/// GET /jobs/result
pub async fn last_result<C: Connector, P: ConfigProvider>(
    State(state): State<AppState<C, P>>,
) -> Json<LastResult> {
    Json(state.manager.get_last_result())
}

/// GET /jobs/wait?timeout_secs=N
/// Blocks until the job leaves `running` or the timeout passes.
pub async fn wait_job<C: Connector, P: ConfigProvider>(
    State(state): State<AppState<C, P>>,
    Query(params): Query<WaitParams>,
) -> Result<Json<JobSnapshot>, ApiError> {
    let max = state.config.max_wait.as_secs();
    let secs = params
        .timeout_secs
        .unwrap_or(state.config.default_wait.as_secs());
    if secs > max {
        return Err(RequestError::WaitTooLong { max }.into());
    }
    Ok(Json(state.manager.wait(Duration::from_secs(secs)).await))
}
