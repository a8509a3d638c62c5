use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Could not validate credentials")]
    Unauthorized,

    #[error("Incorrect username or password")]
    BadCredentials,

    #[error("Username already registered")]
    UsernameTaken,

    #[error("Todo not found")]
    NotFound,

    #[error("{0}")]
    Invalid(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Unauthorized | AppError::BadCredentials => StatusCode::UNAUTHORIZED,
            AppError::UsernameTaken => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
