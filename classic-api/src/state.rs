use std::sync::Arc;

use crate::application::log_service::ClassicLogService;

#[derive(Clone)]
pub struct AppState {
    pub log_service: Arc<ClassicLogService>,
}

impl AppState {
    pub fn new(log_service: Arc<ClassicLogService>) -> Self {
        Self { log_service }
    }
}
