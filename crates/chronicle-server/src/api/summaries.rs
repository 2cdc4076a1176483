//! Summary run trigger.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use chronicle_pipeline::PipelineRequest;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TriggerResponse {
    pub run_id: Uuid,
    pub accepted: bool,
}

/// Validates the request, starts the run in the background and answers
/// `202 Accepted` without waiting for it. The outcome is delivered to the
/// request's callback URL.
pub(super) async fn trigger_summaries(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<PipelineRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<TriggerResponse>>), ApiError> {
    let rid = &req_id.0;

    let Json(request) =
        body.map_err(|e| ApiError::new(rid, "validation_error", e.body_text()))?;
    let job = request
        .validate()
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "summary_run",
        run_id = %run_id,
        request_id = %rid,
        account = %job.account_id
    );
    let orchestrator = Arc::clone(&state.orchestrator);
    tokio::spawn(
        async move {
            orchestrator.run(job).await;
        }
        .instrument(span),
    );
    tracing::info!(run_id = %run_id, request_id = %rid, "summary run accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: TriggerResponse {
                run_id,
                accepted: true,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
