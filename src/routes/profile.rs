use axum::{Json, Router, extract::State, routing::get};

use crate::{
    audit::log_audit,
    dto::profile::{ProfileView, UpdateProfileRequest},
    error::{AppError, AppResult},
    middleware::auth::Session,
    models::Profile,
    response::ApiResponse,
    services::address_resolver::is_valid_phone,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_profile).put(update_profile))
}

#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Profile of the signed-in shopper", body = ApiResponse<ProfileView>),
        (status = 401, description = "Not signed in")
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: Session,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let profile = state.profiles.get_profile(&user.credential()).await?;
    let view = ProfileView::new(profile, user.email.as_deref());
    Ok(Json(ApiResponse::success("OK", view, None)))
}

#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile saved", body = ApiResponse<ProfileView>),
        (status = 400, description = "Missing display name or malformed phone")
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: Session,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let profile = Profile::from(payload);
    if profile.display_name.as_deref().is_none_or(str::is_empty) {
        return Err(AppError::BadRequest("display name is required".to_string()));
    }
    if profile.phone.as_deref().is_some_and(|phone| !is_valid_phone(phone)) {
        return Err(AppError::BadRequest("phone number is not valid".to_string()));
    }

    let saved = state
        .profiles
        .save_profile(&user.credential(), &profile)
        .await?;

    log_audit(&user.user_id, "profile_update", Some("profile"), None);
    let view = ProfileView::new(Some(saved), user.email.as_deref());
    Ok(Json(ApiResponse::success("Profile saved", view, None)))
}
