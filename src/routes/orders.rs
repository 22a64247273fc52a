use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    error::{AppError, AppResult},
    middleware::auth::Session,
    models::Order,
    response::{ApiResponse, Meta},
    services::backend::BackendError,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/{id}", get(get_order))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    responses(
        (status = 200, description = "The shopper's orders, newest first", body = ApiResponse<Vec<Order>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: Session,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let mut orders = state.orders.list_orders(&user.credential()).await?;
    // Undated orders sort last.
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let meta = Meta::count(orders.len() as i64);
    Ok(Json(ApiResponse::success("OK", orders, Some(meta))))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = String, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order as stored by the backend", body = ApiResponse<Order>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: Session,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state
        .orders
        .get_order(&user.credential(), &id)
        .await
        .map_err(|err| match err {
            BackendError::Status { status: 404, .. } => AppError::NotFound,
            other => AppError::Backend(other),
        })?;

    Ok(Json(ApiResponse::success("OK", order, None)))
}
