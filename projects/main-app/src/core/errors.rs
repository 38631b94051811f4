use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// Everything that can go wrong between a tick being accepted and the
/// prediction being applied. All variants end up as the same status text;
/// the detail only reaches the log.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("no camera frame available")]
    EmptyFrame,
    #[error("failed to decode camera frame: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode capture surface: {0}")]
    Encode(#[source] image::ImageError),
    #[error("capture worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    #[error("prediction request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("malformed prediction response: {0}")]
    Parse(#[from] serde_json::Error),
}
