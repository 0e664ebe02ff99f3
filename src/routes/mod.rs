pub mod location;
pub mod user;

use axum::Json;
use serde::Serialize;

use crate::{
    AppState,
    utils::{ApiResponse, success_to_api_response},
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
    pub tracked_users: usize,
}

pub async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<ApiResponse<HealthResponse>> {
    success_to_api_response(HealthResponse {
        status: "ok",
        store: state.service.backend_name(),
        tracked_users: state.service.index().len(),
    })
}
