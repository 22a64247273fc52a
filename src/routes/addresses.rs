use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::addresses::SavedAddresses,
    error::AppResult,
    middleware::auth::Session,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_addresses))
}

#[utoipa::path(
    get,
    path = "/api/addresses",
    responses(
        (status = 200, description = "Saved addresses and the defaults used to prefill checkout", body = ApiResponse<SavedAddresses>),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "Backend unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    user: Session,
) -> AppResult<Json<ApiResponse<SavedAddresses>>> {
    let saved = state.addresses.list_addresses(&user.credential()).await?;
    let meta = Meta::count(saved.len() as i64);
    Ok(Json(ApiResponse::success(
        "OK",
        SavedAddresses::from(saved),
        Some(meta),
    )))
}
