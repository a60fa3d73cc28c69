//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional OpenAPI document (disable with `FOLIO_ENABLE_DOCS=false`)
//! - Health route
//! - The assistant endpoint

mod assistant;
pub mod doc;
mod health;

use std::sync::Arc;

use axum::Router;
use axum::middleware;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .merge(assistant::router());

    if state.config.enable_docs {
        app = app.merge(doc::router());
    }

    app.layer(cors::cors_layer(&state))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}
