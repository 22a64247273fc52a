mod common;

use std::sync::Arc;

use allure_art_storefront::routes::health::health_check;
use axum::extract::State;
use common::{FakeBackend, app_state};

#[tokio::test]
async fn health_check_returns_ok() {
    let state = app_state(Arc::new(FakeBackend::default()));
    state.sessions.session("user-1");

    let response = health_check(State(state)).await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.active_sessions, 1);
    assert_eq!(data.static_cache_entries, 0);
}
