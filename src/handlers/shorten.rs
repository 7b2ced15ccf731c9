use crate::{
    models::{ShortenRequest, ShortenResponse},
    AppState,
};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// POST /shorten
///
/// Store the submitted URL under a new short id, persist the store, and
/// return the public short URL. A failed save is logged but the link is
/// still handed out: memory stays authoritative until the next save.
///
/// The body is decoded as JSON whatever `Content-Type` says, so a bare
/// `curl -d '{"url": ...}'` works.
pub async fn shorten(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: ShortenRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            tracing::debug!("Rejected shorten request body: {}", e);
            return (StatusCode::BAD_REQUEST, "invalid request body").into_response();
        }
    };

    let url = req.url.trim().to_owned();
    if let Err(msg) = validate_url(&url) {
        return (StatusCode::BAD_REQUEST, msg).into_response();
    }

    let short_id = state.store.create(url).await;

    if let Err(e) = state.store.save().await {
        tracing::error!("Failed to save store after creating '{}': {}", short_id, e);
    }

    tracing::info!("Created short id '{}'", short_id);

    Json(ShortenResponse {
        short_url: state.config.short_url(&short_id),
    })
    .into_response()
}

/// Basic URL checks: non-empty, http(s) scheme, usable as a `Location` header.
fn validate_url(url: &str) -> Result<(), &'static str> {
    if url.is_empty() {
        return Err("url must not be empty");
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err("url must start with http:// or https://");
    }
    if HeaderValue::try_from(url).is_err() {
        return Err("url contains characters that cannot be redirected to");
    }
    Ok(())
}
