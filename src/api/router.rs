//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`. Every response carries
//! `Cache-Control: no-store`; CORS is open so the web client and the job
//! runner can call in from other origins.

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route("/patients/:id", get(endpoints::patients::detail))
        .route(
            "/patients/:id/assessments",
            get(endpoints::patients::assessments),
        )
        .route("/patients/:id/goals", get(endpoints::goals::list))
        .route("/assessments", post(endpoints::assessments::submit))
        .route("/assessments/tags", get(endpoints::assessments::tags))
        .route("/assessments/:id", get(endpoints::assessments::detail))
        .route(
            "/assessments/:id/recommendation",
            get(endpoints::assessments::latest_recommendation),
        )
        .route("/recommendations", post(endpoints::recommendations::create))
        .route("/recommendations/:id", get(endpoints::recommendations::detail))
        .route(
            "/recommendations/:id/plans",
            get(endpoints::recommendations::plans),
        )
        .route(
            "/recommendations/:id/selection",
            post(endpoints::recommendations::select),
        )
        .route(
            "/webhook/ai-recommendation",
            get(endpoints::webhook::liveness).post(endpoints::webhook::receive),
        )
        .with_state(ctx);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .nest("/api", routes)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(cors)
}
