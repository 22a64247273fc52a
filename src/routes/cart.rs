use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};

use crate::{
    audit::log_audit,
    dto::cart::{AddToCartRequest, CartView, UpdateQuantityRequest},
    error::{AppError, AppResult},
    middleware::auth::Session,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart_list).post(add_to_cart))
        .route("/{product_id}", put(update_quantity).delete(remove_from_cart))
}

fn cart_response(message: &str, view: CartView) -> Json<ApiResponse<CartView>> {
    let meta = Meta::count(view.total_items as i64);
    Json(ApiResponse::success(message, view, Some(meta)))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart lines with derived totals", body = ApiResponse<CartView>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_list(
    State(state): State<AppState>,
    user: Session,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let shopper = state.sessions.session(&user.user_id);
    let view = CartView::from(&*shopper.cart.read().await);
    Ok(cart_response("OK", view))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Add one unit of a product", body = ApiResponse<CartView>),
        (status = 400, description = "Missing id, negative price or total out of range"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: Session,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    if payload.product.id.trim().is_empty() {
        return Err(AppError::BadRequest("product id is required".to_string()));
    }

    let product_id = payload.product.id.clone();
    let shopper = state.sessions.session(&user.user_id);
    let view = {
        let mut cart = shopper.cart.write().await;
        cart.add_to_cart(payload.product)?;
        CartView::from(&*cart)
    };

    log_audit(
        &user.user_id,
        "cart_add",
        Some("cart"),
        Some(serde_json::json!({ "product_id": product_id })),
    );
    Ok(cart_response("Added to cart", view))
}

#[utoipa::path(
    put,
    path = "/api/cart/{product_id}",
    params(
        ("product_id" = String, Path, description = "Product ID")
    ),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Quantity set; zero or less removes the line", body = ApiResponse<CartView>),
        (status = 400, description = "Quantity or total out of range"),
        (status = 404, description = "Product not in cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_quantity(
    State(state): State<AppState>,
    user: Session,
    Path(product_id): Path<String>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let shopper = state.sessions.session(&user.user_id);
    let view = {
        let mut cart = shopper.cart.write().await;
        if cart.get(&product_id).is_none() {
            return Err(AppError::NotFound);
        }
        cart.update_quantity(&product_id, payload.quantity)?;
        CartView::from(&*cart)
    };

    log_audit(
        &user.user_id,
        "cart_update",
        Some("cart"),
        Some(serde_json::json!({ "product_id": product_id, "quantity": payload.quantity })),
    );
    Ok(cart_response("OK", view))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{product_id}",
    params(
        ("product_id" = String, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Removed from cart", body = ApiResponse<CartView>),
        (status = 404, description = "Product not in cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: Session,
    Path(product_id): Path<String>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let shopper = state.sessions.session(&user.user_id);
    let view = {
        let mut cart = shopper.cart.write().await;
        if cart.get(&product_id).is_none() {
            return Err(AppError::NotFound);
        }
        cart.remove_from_cart(&product_id);
        CartView::from(&*cart)
    };

    log_audit(
        &user.user_id,
        "cart_remove",
        Some("cart"),
        Some(serde_json::json!({ "product_id": product_id })),
    );
    Ok(cart_response("Removed from cart", view))
}
