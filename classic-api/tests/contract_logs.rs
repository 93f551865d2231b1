use std::sync::Arc;

use axum::http::StatusCode;
use traffic_log_classic_api::{
    application::log_service::ClassicLogService, build_router, state::AppState,
};
use traffic_log_core::store::LogStore;
use traffic_log_core::store::in_memory::InMemoryLogStore;
use traffic_log_shared_tests::{
    run_health_contract, run_ingest_contract, run_read_miss_contract, run_read_random_contract,
    run_update_contract,
};

async fn primed_app(payloads: &[&str]) -> (axum::Router, Arc<InMemoryLogStore>) {
    let store = Arc::new(InMemoryLogStore::new());
    store.seed(payloads).await;

    let service = Arc::new(
        ClassicLogService::with_startup_range(store.clone())
            .await
            .unwrap(),
    );

    (build_router(AppState::new(service)), store)
}

#[tokio::test]
async fn log_contract_matches_shared_expectations() {
    let (app, _store) = primed_app(&["hello test_load"]).await;

    run_health_contract(app.clone()).await;
    run_read_random_contract(app.clone()).await;
    run_ingest_contract(app.clone(), StatusCode::CREATED, "recorded").await;
    run_update_contract(app).await;
}

#[tokio::test]
async fn read_miss_answers_null() {
    let (app, _store) = primed_app(&[]).await;
    run_read_miss_contract(app).await;
}

#[tokio::test]
async fn ingest_is_durable_on_return() {
    let (app, store) = primed_app(&[]).await;

    run_ingest_contract(app, StatusCode::CREATED, "recorded").await;

    let row = store.fetch_by_id(1).await.unwrap().unwrap();
    assert!(row.payload.contains("load-generator"));
}
