use crate::{error::NotFound, AppState};
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// GET /:id
///
/// Resolve the short id (counting the click) and answer with a 302 to the
/// original URL, or 404 if the id was never issued.
pub async fn redirect(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let original_url = match state.store.resolve(&id).await {
        Ok(url) => url,
        Err(NotFound(_)) => {
            return (StatusCode::NOT_FOUND, "URL not found").into_response();
        }
    };

    match HeaderValue::try_from(original_url.as_str()) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(e) => {
            // Only reachable for records loaded from a hand-edited data file.
            tracing::error!("Stored URL for '{}' is not a valid Location: {}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Invalid redirect target").into_response()
        }
    }
}
