//! Health and classifier status handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use crate::classifier::{ClassifierStatus, Method};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    classifier: Method,
    timestamp: i64,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        classifier: state.identifier.status().method,
        timestamp: chrono::Utc::now().timestamp(),
    })
}

/// Which identification strategy is serving requests
pub async fn classifier_status(State(state): State<AppState>) -> Json<ClassifierStatus> {
    Json(state.identifier.status())
}
