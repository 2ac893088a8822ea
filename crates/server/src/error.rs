use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    space_registry::SpaceRegistrationError, tab_persistence::TabPersistenceError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    TabPersistence(#[from] TabPersistenceError),
    #[error(transparent)]
    SpaceRegistration(#[from] SpaceRegistrationError),
    #[error("invalid request body: {0}")]
    Body(#[from] JsonRejection),
}

/// JSON request body whose rejection is reported as an [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::TabPersistence(err) => match err {
                TabPersistenceError::InvalidShape(_)
                | TabPersistenceError::InvalidSignature
                | TabPersistenceError::Unauthorized { .. }
                | TabPersistenceError::Mismatch(_) => StatusCode::BAD_REQUEST,
                TabPersistenceError::NotFound(_) => StatusCode::NOT_FOUND,
                TabPersistenceError::Rename(_)
                | TabPersistenceError::Storage(_)
                | TabPersistenceError::Authorization(_)
                | TabPersistenceError::CorruptDocument(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::SpaceRegistration(err) => match err {
                SpaceRegistrationError::InvalidShape(_)
                | SpaceRegistrationError::InvalidSignature => StatusCode::BAD_REQUEST,
                SpaceRegistrationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Body(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }
        let body = ApiResponse::<()>::error(self.to_string());
        (status, Json(body)).into_response()
    }
}
