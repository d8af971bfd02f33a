use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

pub const GENERATION_FAILED_MESSAGE: &str =
    "Failed to generate image. The AI model may be overloaded or the prompt was rejected. Please try again.";
pub const NO_IMAGE_MESSAGE: &str = "No image was generated. Please try a different prompt or images.";

/// Everything a photoshoot caller can see go wrong. Messages are safe to show to end users.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    UploadTooLarge(String),
    #[error("{0}")]
    Normalization(String),
    #[error("{}", GENERATION_FAILED_MESSAGE)]
    GenerationFailed,
    #[error("{}", NO_IMAGE_MESSAGE)]
    NoImageProduced,
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::UploadTooLarge(_) => "upload_too_large",
            Self::Normalization(_) => "normalization",
            Self::GenerationFailed => "generation_failed",
            Self::NoImageProduced => "no_image_produced",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Normalization(_) | Self::NoImageProduced => StatusCode::UNPROCESSABLE_ENTITY,
            Self::GenerationFailed => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GenerationError {
    fn into_response(self) -> Response {
        let body = json!({ "error": { "kind": self.kind(), "message": self.to_string() } });
        (self.status(), Json(body)).into_response()
    }
}
