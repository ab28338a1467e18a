//! Common error type and result alias.
//!
//! Every workflow returns `AppResult<T>`; the HTTP layer turns an `AppError`
//! into a plain-text response with a matching status code.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no {0} detected")]
    NoDetection(String),

    #[error("{0} returned no image")]
    NoImageReturned(String),

    #[error("invalid model output: {0}")]
    InvalidModelOutput(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("inference error: {0}")]
    Inference(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NoDetection(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NoImageReturned(_)
            | AppError::InvalidModelOutput(_)
            | AppError::Provider(_)
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::Image(_)
            | AppError::Io(_)
            | AppError::Inference(_)
            | AppError::Config(_)
            | AppError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
