use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::state::session::{InvalidRoomId, ParticipantId};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// No participant with this identity is hosted here.
    #[error("unknown participant {0}")]
    UnknownParticipant(ParticipantId),
    /// The participant task is no longer running.
    #[error("participant {0} has left")]
    ParticipantGone(ParticipantId),
}

impl From<InvalidRoomId> for ServiceError {
    fn from(err: InvalidRoomId) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Resource existed but is gone.
    #[error("gone: {0}")]
    Gone(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::UnknownParticipant(id) => {
                AppError::NotFound(format!("participant {id}"))
            }
            ServiceError::ParticipantGone(id) => AppError::Gone(format!("participant {id}")),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Gone(_) => StatusCode::GONE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_status_codes() {
        let id = ParticipantId::new();
        let cases = [
            (
                ServiceError::InvalidInput("room".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ServiceError::UnknownParticipant(id), StatusCode::NOT_FOUND),
            (ServiceError::ParticipantGone(id), StatusCode::GONE),
        ];

        for (err, status) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }
}
