//! # polyseal-api: HTTP Serving Layer
//!
//! ## API Surface
//!
//! | Prefix        | Module             | Purpose                               |
//! |---------------|--------------------|---------------------------------------|
//! | `/policy/*`   | [`routes::policy`] | prepare configs, validate and store documents |
//! | `/proof/*`    | [`routes::proof`]  | generate and verify proofs            |
//! | `/health/*`   | this module        | liveness and readiness probes         |
//!
//! ## Middleware Stack
//!
//! ```text
//! TraceLayer → Handler
//! ```
//!
//! Errors leave every handler as [`error::AppError`], which fixes the
//! status code and the `{ "error": { code, message, details } }` body.

pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::policy::router())
        .merge(routes::proof::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

/// Liveness probe: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 503 while the prover is known to be down.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.proofs.has_prover() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "prover unavailable")
    }
}
