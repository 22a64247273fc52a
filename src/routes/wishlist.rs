use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    audit::log_audit,
    dto::{
        cart::CartView,
        wishlist::{AddToWishlistRequest, WishlistMembership, WishlistView},
    },
    error::{AppError, AppResult},
    middleware::auth::Session,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_wishlist).post(add_to_wishlist))
        .route("/{product_id}", get(wishlist_membership).delete(remove_from_wishlist))
        .route("/{product_id}/move-to-cart", post(move_to_cart))
}

fn wishlist_response(message: &str, view: WishlistView) -> Json<ApiResponse<WishlistView>> {
    let meta = Meta::count(view.count as i64);
    Json(ApiResponse::success(message, view, Some(meta)))
}

#[utoipa::path(
    get,
    path = "/api/wishlist",
    responses(
        (status = 200, description = "Saved products", body = ApiResponse<WishlistView>)
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn list_wishlist(
    State(state): State<AppState>,
    user: Session,
) -> AppResult<Json<ApiResponse<WishlistView>>> {
    let shopper = state.sessions.session(&user.user_id);
    let view = WishlistView::from(&*shopper.wishlist.read().await);
    Ok(wishlist_response("OK", view))
}

#[utoipa::path(
    post,
    path = "/api/wishlist",
    request_body = AddToWishlistRequest,
    responses(
        (status = 200, description = "Saved; adding twice keeps one entry", body = ApiResponse<WishlistView>),
        (status = 400, description = "Bad request"),
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    user: Session,
    Json(payload): Json<AddToWishlistRequest>,
) -> AppResult<Json<ApiResponse<WishlistView>>> {
    if payload.product.id.trim().is_empty() {
        return Err(AppError::BadRequest("product id is required".to_string()));
    }

    let product_id = payload.product.id.clone();
    let shopper = state.sessions.session(&user.user_id);
    let view = {
        let mut wishlist = shopper.wishlist.write().await;
        wishlist.add_to_wishlist(payload.product);
        WishlistView::from(&*wishlist)
    };

    log_audit(
        &user.user_id,
        "wishlist_add",
        Some("wishlist"),
        Some(serde_json::json!({ "product_id": product_id })),
    );
    Ok(wishlist_response("Added to wishlist", view))
}

#[utoipa::path(
    get,
    path = "/api/wishlist/{product_id}",
    params(
        ("product_id" = String, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Whether the product is saved", body = ApiResponse<WishlistMembership>)
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn wishlist_membership(
    State(state): State<AppState>,
    user: Session,
    Path(product_id): Path<String>,
) -> AppResult<Json<ApiResponse<WishlistMembership>>> {
    let shopper = state.sessions.session(&user.user_id);
    let in_wishlist = shopper.wishlist.read().await.is_in_wishlist(&product_id);

    Ok(Json(ApiResponse::success(
        "OK",
        WishlistMembership {
            product_id,
            in_wishlist,
        },
        None,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/wishlist/{product_id}",
    params(
        ("product_id" = String, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Removed from wishlist", body = ApiResponse<WishlistView>),
        (status = 404, description = "Product not saved")
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    user: Session,
    Path(product_id): Path<String>,
) -> AppResult<Json<ApiResponse<WishlistView>>> {
    let shopper = state.sessions.session(&user.user_id);
    let view = {
        let mut wishlist = shopper.wishlist.write().await;
        wishlist
            .remove_from_wishlist(&product_id)
            .ok_or(AppError::NotFound)?;
        WishlistView::from(&*wishlist)
    };

    log_audit(
        &user.user_id,
        "wishlist_remove",
        Some("wishlist"),
        Some(serde_json::json!({ "product_id": product_id })),
    );
    Ok(wishlist_response("Removed from wishlist", view))
}

#[utoipa::path(
    post,
    path = "/api/wishlist/{product_id}/move-to-cart",
    params(
        ("product_id" = String, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product moved into the cart", body = ApiResponse<CartView>),
        (status = 400, description = "Cart total out of range"),
        (status = 404, description = "Product not saved")
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn move_to_cart(
    State(state): State<AppState>,
    user: Session,
    Path(product_id): Path<String>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let shopper = state.sessions.session(&user.user_id);
    shopper
        .move_to_cart(&product_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let view = CartView::from(&*shopper.cart.read().await);

    log_audit(
        &user.user_id,
        "wishlist_move_to_cart",
        Some("wishlist"),
        Some(serde_json::json!({ "product_id": product_id })),
    );
    let meta = Meta::count(view.total_items as i64);
    Ok(Json(ApiResponse::success("Moved to cart", view, Some(meta))))
}
