use axum::extract::State;
use axum::http::StatusCode;
use axum::http::Uri;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::ApiSuccess;
use crate::inbound::http::errors::ApiError;
use crate::inbound::http::router::AppState;

pub const SERVICE_NAME: &str = "session-service";

pub async fn service_info(State(state): State<AppState>) -> ApiSuccess<ServiceInfoData> {
    ApiSuccess::new(
        StatusCode::OK,
        "Session service is running",
        ServiceInfoData {
            app_name: SERVICE_NAME.to_string(),
            status: "Running".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: state.environment.to_string(),
            timestamp: Utc::now(),
        },
    )
}

pub async fn health(State(state): State<AppState>) -> ApiSuccess<HealthData> {
    ApiSuccess::new(
        StatusCode::OK,
        "Health Check Successful",
        HealthData {
            status: "ok".to_string(),
            service: SERVICE_NAME.to_string(),
            environment: state.environment.to_string(),
            store: state.store.to_string(),
            uptime_secs: state.started_at.elapsed().as_secs(),
            timestamp: Utc::now(),
        },
    )
}

pub async fn not_found(uri: Uri) -> ApiError {
    tracing::debug!(uri = %uri, "Route not found");
    ApiError::route_not_found(uri.path())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfoData {
    pub app_name: String,
    pub status: String,
    pub version: String,
    pub environment: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub status: String,
    pub service: String,
    pub environment: String,
    pub store: String,
    pub uptime_secs: u64,
    pub timestamp: DateTime<Utc>,
}
