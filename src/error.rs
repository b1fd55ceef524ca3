use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;
use tracing::debug;

use crate::{
    auth::AuthError, permission::PathError, remote::RemoteError, workflow::WorkflowError,
};

#[derive(Debug, Error)]
pub enum QdocsError {
    #[error("{0}")]
    IO(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Path(#[from] PathError),

    #[error("{0}")]
    Workflow(#[from] WorkflowError),

    #[error("{0}")]
    Remote(#[from] RemoteError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Permission or visibility denied. Never carries detail.
    #[error("not permitted")]
    NotPermitted,

    #[error("{0}")]
    NotFound(String),

    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

impl IntoResponse for QdocsError {
    fn into_response(self) -> axum::response::Response {
        debug!("Responding with error: {self}");
        match self {
            QdocsError::IO(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
            QdocsError::Json(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
            QdocsError::Path(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
            QdocsError::Workflow(e) => {
                let status = match e {
                    WorkflowError::Precondition(_) | WorkflowError::Busy(_) => StatusCode::CONFLICT,
                    WorkflowError::Rejected(_) | WorkflowError::Transport(_) => {
                        StatusCode::BAD_GATEWAY
                    }
                    WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
                };
                (status, e.to_string()).into_response()
            }
            QdocsError::Remote(e) => (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
            QdocsError::Auth(e) => e.into_response(),
            QdocsError::NotPermitted => (StatusCode::FORBIDDEN, "not permitted").into_response(),
            QdocsError::NotFound(e) => (StatusCode::NOT_FOUND, e).into_response(),
            e @ QdocsError::InvalidBody(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
            }
        }
    }
}
