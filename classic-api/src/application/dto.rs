use chrono::{DateTime, Utc};
use serde::Serialize;
use traffic_log_core::TrafficLog;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Acknowledgement for a direct write: the row is durable on return.
#[derive(Debug, Serialize)]
pub struct IngestRecordedResponse {
    pub status: &'static str,
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct UpdateAppliedResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct TrafficLogResponse {
    pub id: i64,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

impl From<TrafficLog> for TrafficLogResponse {
    fn from(value: TrafficLog) -> Self {
        Self {
            id: value.id,
            payload: value.payload,
            created_at: value.created_at,
        }
    }
}
