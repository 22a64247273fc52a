use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tokio::time::timeout;

use crate::{
    audit::log_audit,
    dto::checkout::{CheckoutRequest, PaymentCallback},
    error::{AppError, AppResult},
    middleware::auth::Session,
    response::ApiResponse,
    services::{checkout::CheckoutState, payment::WidgetOutcome},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout_status).post(start_checkout))
        .route("/payment", post(payment_callback))
}

#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 202, description = "Checkout started; poll for progress", body = ApiResponse<CheckoutState>),
        (status = 401, description = "Sign in first"),
        (status = 409, description = "A checkout is already in progress"),
        (status = 422, description = "Cart is empty")
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn start_checkout(
    State(state): State<AppState>,
    user: Session,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CheckoutState>>)> {
    let shopper = state.sessions.session(&user.user_id);
    let user_id = user.user_id.clone();
    let started = shopper.start_checkout(user, payload.into()).await?;

    log_audit(&user_id, "checkout_started", Some("checkout"), None);
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success("Checkout started", started, None)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/checkout",
    responses(
        (status = 200, description = "State of the current or most recent attempt", body = ApiResponse<CheckoutState>)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn checkout_status(
    State(state): State<AppState>,
    user: Session,
) -> AppResult<Json<ApiResponse<CheckoutState>>> {
    let shopper = state.sessions.session(&user.user_id);
    Ok(Json(ApiResponse::success(
        "OK",
        shopper.checkout_state(),
        None,
    )))
}

#[utoipa::path(
    post,
    path = "/api/checkout/payment",
    request_body = PaymentCallback,
    responses(
        (status = 200, description = "Outcome delivered; returns the state the attempt settled in", body = ApiResponse<CheckoutState>),
        (status = 409, description = "No payment is awaiting a result")
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn payment_callback(
    State(state): State<AppState>,
    user: Session,
    Json(payload): Json<PaymentCallback>,
) -> AppResult<Json<ApiResponse<CheckoutState>>> {
    let shopper = state.sessions.session(&user.user_id);
    let CheckoutState::AwaitingPayment { payment, .. } = shopper.checkout_state() else {
        return Err(AppError::Conflict("no payment is awaiting a result".to_string()));
    };

    let mut progress = shopper.watch_checkout();
    if !state.widget.resolve(&payment.order_id, WidgetOutcome::from(payload)) {
        return Err(AppError::Conflict("payment result was already received".to_string()));
    }

    // Verification is one more backend call; wait for it so the browser gets the outcome.
    let settle_within = state.config.backend_timeout * 2;
    let settled = match timeout(settle_within, progress.wait_for(|s| !s.is_in_flight())).await {
        Ok(Ok(current)) => current.clone(),
        _ => shopper.checkout_state(),
    };

    Ok(Json(ApiResponse::success(settled.name(), settled, None)))
}
