//! Health endpoint: liveness plus whether the assistant can answer.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::schemas::health::{AssistantStatus, HealthReport};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health), components(schemas(HealthReport, AssistantStatus)))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Always 200 while the process is up. `assistant` reports whether an
/// upstream credential is configured; `model` is set only when it is.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is up", body = HealthReport)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    let client = state.completion.as_deref();
    Json(HealthReport {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        assistant: if client.is_some() { AssistantStatus::Ready } else { AssistantStatus::MissingCredential },
        model: client.map(|c| c.model().to_owned()),
    })
}
