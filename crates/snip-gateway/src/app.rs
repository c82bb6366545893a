use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::any::Any;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::handlers::{create_url_handler, get_mapping_handler, health_handler, redirect_handler};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/shorten", post(create_url_handler))
            .route("/v1/mappings/{short_key}", get(get_mapping_handler))
            .route("/{short_key}", get(redirect_handler))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(CatchPanicLayer::custom(panic_response)),
            )
            .with_state(state)
    }
}

/// Turns a handler panic into a 500 instead of a dropped connection.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    AppError::Panic(detail).into_response()
}
