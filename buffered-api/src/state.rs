use std::sync::Arc;

use traffic_log_core::LogPipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<LogPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<LogPipeline>) -> Self {
        Self { pipeline }
    }
}
