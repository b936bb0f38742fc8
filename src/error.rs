use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(action: &'static str, path: PathBuf, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path,
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("failed to load detector model {}: {reason}", .path.display())]
    Model { path: PathBuf, reason: String },

    #[error("detector inference failed: {0}")]
    Inference(String),
}

#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to decode image {name}: {reason}")]
    Decode { name: String, reason: String },

    #[error("failed to encode result image: {0}")]
    Encode(String),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error("detection task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Faults surfaced by the upload route. Client input problems never end up
/// here; they are answered with a redirect to the index page.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Annotate(#[from] AnnotateError),
}

impl AppError {
    fn public_message(&self) -> &'static str {
        match self {
            AppError::Store(_) => "failed to store the uploaded image",
            AppError::Annotate(AnnotateError::Decode { .. }) => {
                "the uploaded file could not be read as an image"
            }
            AppError::Annotate(AnnotateError::Detect(DetectError::Model { .. })) => {
                "face detector is not available"
            }
            AppError::Annotate(_) => "face detection failed",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "upload failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.public_message()).into_response()
    }
}
