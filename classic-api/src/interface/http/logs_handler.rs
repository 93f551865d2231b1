use axum::{Json, extract::State, http::StatusCode};

use crate::{
    application::dto::{
        HealthResponse, IngestRecordedResponse, TrafficLogResponse, UpdateAppliedResponse,
    },
    interface::http::problem::{ApiProblem, ApiResult},
    state::AppState,
};

pub async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Insert the payload synchronously. 201: the row is durable on return.
pub async fn submit_ingestion(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<(StatusCode, Json<IngestRecordedResponse>)> {
    let row = state
        .log_service
        .ingest(&payload)
        .await
        .map_err(ApiProblem::from_pipeline)?;

    Ok((
        StatusCode::CREATED,
        Json(IngestRecordedResponse {
            status: "recorded",
            id: row.id,
        }),
    ))
}

pub async fn apply_random_update(
    State(state): State<AppState>,
) -> ApiResult<Json<UpdateAppliedResponse>> {
    let id = state
        .log_service
        .update_random()
        .await
        .map_err(ApiProblem::from_pipeline)?;

    Ok(Json(UpdateAppliedResponse { id }))
}

pub async fn read_random(
    State(state): State<AppState>,
) -> ApiResult<Json<Option<TrafficLogResponse>>> {
    let record = state
        .log_service
        .read_random()
        .await
        .map_err(ApiProblem::from_pipeline)?;

    Ok(Json(record.map(TrafficLogResponse::from)))
}
