use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{cache::AssetRequest, state::AppState};

const MAX_FORWARDED_BODY: usize = 1024 * 1024;

/// Everything outside `/api` goes to the storefront shell through the cache.
pub async fn serve_asset(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let Ok(body) = to_bytes(body, MAX_FORWARDED_BODY).await else {
        return StatusCode::PAYLOAD_TOO_LARGE.into_response();
    };

    let asset = AssetRequest::from_parts(parts.method, &parts.uri, parts.headers, body);
    state.cache.handle(asset).await.into_response()
}
