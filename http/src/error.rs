use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use photon_application::ApplicationError;
use photon_domain::DomainError;
use serde_json::json;

#[derive(Debug)]
pub enum HttpError {
    Validation { message: String },
    NotFound { message: String },
    Internal { message: String },
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::Validation { .. } => StatusCode::BAD_REQUEST,
            HttpError::NotFound { .. } => StatusCode::NOT_FOUND,
            HttpError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            HttpError::Validation { message }
            | HttpError::NotFound { message }
            | HttpError::Internal { message } => message,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            HttpError::Validation { message }
            | HttpError::NotFound { message }
            | HttpError::Internal { message } => message,
        };

        (
            status,
            Json(json!({
                "error": message,
            })),
        )
            .into_response()
    }
}

pub fn error_mapper(error: ApplicationError) -> HttpError {
    match error {
        ApplicationError::Validation(message) => HttpError::Validation { message },
        ApplicationError::NotFound(message) => HttpError::NotFound { message },
        ApplicationError::Internal(message) => HttpError::Internal { message },
        ApplicationError::Domain(DomainError::InvalidInput(message)) => {
            HttpError::Validation { message }
        }
        ApplicationError::Domain(DomainError::NotFound(message)) => HttpError::NotFound { message },
        ApplicationError::Domain(error) => HttpError::Internal {
            message: error.to_string(),
        },
    }
}
