use crate::error::{AppError, Result};
use crate::model::{CreateUrlRequest, CreateUrlResponse, MappingResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use snip_core::{AllocationError, ShortKey};
use std::future::Future;
use tracing::debug;

pub async fn create_url_handler(
    State(state): State<AppState>,
    request: std::result::Result<Json<CreateUrlRequest>, JsonRejection>,
) -> Result<Json<CreateUrlResponse>> {
    let Json(request) = request.map_err(|rejection| {
        debug!(error = %rejection, "rejected create request body");
        AppError::InvalidInput("Invalid request".to_string())
    })?;

    validate_url(&request.url)?;

    let cancel = state.shutdown().child_token();
    let allocation = state
        .allocator()
        .allocate_with_cancel(&request.url, &cancel);

    let key = within_deadline(&state, allocation).await?;

    Ok(Json(CreateUrlResponse {
        short_url: key.to_url(state.base_url()),
        short_key: key.into_string(),
    }))
}

pub async fn redirect_handler(
    Path(short_key): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    let key = parse_key(short_key)?;
    let original_url = within_deadline(&state, state.allocator().resolve(&key)).await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, original_url)]).into_response())
}

pub async fn get_mapping_handler(
    Path(short_key): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MappingResponse>> {
    let key = parse_key(short_key)?;
    let mapping = within_deadline(&state, state.allocator().mapping(&key)).await?;

    Ok(Json(MappingResponse {
        short_url: mapping.short_key.to_url(state.base_url()),
        short_key: mapping.short_key.into_string(),
        original_url: mapping.original_url,
        created_at: mapping.created_at,
    }))
}

/// Bounds an allocator call by the per-request deadline.
async fn within_deadline<T>(
    state: &AppState,
    call: impl Future<Output = std::result::Result<T, AllocationError>>,
) -> Result<T> {
    match tokio::time::timeout(state.request_timeout(), call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(AppError::Timeout),
    }
}

/// A key that could never have been issued is reported as not found.
fn parse_key(raw: String) -> Result<ShortKey> {
    ShortKey::new(raw).map_err(|_| AppError::NotFound)
}

/// Accepts only absolute `http`/`https` URLs with a host.
fn validate_url(raw: &str) -> Result<()> {
    if raw.is_empty() {
        return Err(AppError::InvalidInput("URL is required".to_string()));
    }

    let invalid = || AppError::InvalidInput("Invalid URL format".to_string());
    let parsed = ::url::Url::parse(raw).map_err(|_| invalid())?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }

    Ok(())
}
