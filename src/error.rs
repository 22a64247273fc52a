use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    response::{ApiResponse, Meta},
    services::{backend::BackendError, checkout::CheckoutBlocked},
    store::cart::CartError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Conflict {0}")]
    Conflict(String),

    #[error("Unprocessable {0}")]
    Unprocessable(String),

    #[error("Backend error")]
    Backend(#[from] BackendError),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl From<CheckoutBlocked> for AppError {
    fn from(blocked: CheckoutBlocked) -> Self {
        match blocked {
            CheckoutBlocked::AuthenticationRequired => AppError::Unauthorized,
            CheckoutBlocked::CartEmpty => AppError::Unprocessable(blocked.to_string()),
            CheckoutBlocked::InProgress => AppError::Conflict(blocked.to_string()),
        }
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Backend(BackendError::Unauthorized) => StatusCode::UNAUTHORIZED,
            AppError::Backend(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        // Sign-in is a routing decision for the client, so point it at the login page.
        let redirect = (status == StatusCode::UNAUTHORIZED).then_some("/login?from=/checkout");

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
                redirect,
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
