use axum::{Json, extract::State, http::StatusCode};

use crate::{
    application::dto::{
        HealthResponse, IngestAcceptedResponse, TrafficLogResponse, UpdateAppliedResponse,
    },
    interface::http::problem::{ApiProblem, ApiResult},
    state::AppState,
};

pub async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Accept an arbitrary JSON payload and queue it for the ingestion drain
/// worker. 202: the write is buffered, not yet durable.
pub async fn submit_ingestion(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<(StatusCode, Json<IngestAcceptedResponse>)> {
    state
        .pipeline
        .submit_ingestion(&payload)
        .await
        .map_err(ApiProblem::from_pipeline)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestAcceptedResponse { status: "queued" }),
    ))
}

/// Rewrite a random record's cache entry now and queue the durable rewrite.
pub async fn apply_random_update(
    State(state): State<AppState>,
) -> ApiResult<Json<UpdateAppliedResponse>> {
    let id = state
        .pipeline
        .apply_random_update()
        .await
        .map_err(ApiProblem::from_pipeline)?;

    Ok(Json(UpdateAppliedResponse { id }))
}

/// Read a random record from the cache. A miss answers 200 with a null
/// body; the durable store is never consulted here.
pub async fn read_random(
    State(state): State<AppState>,
) -> ApiResult<Json<Option<TrafficLogResponse>>> {
    let record = state
        .pipeline
        .read_random()
        .await
        .map_err(ApiProblem::from_pipeline)?;

    Ok(Json(record.map(TrafficLogResponse::from)))
}
