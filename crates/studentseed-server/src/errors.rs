use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use studentseed_core::StudentSeedError;

#[derive(Error, Debug)]
pub enum AppError {
    /// Connecting, loading the reference sample or building the batch failed.
    #[error("Error generating synthetic data: {0}")]
    Generation(#[from] StudentSeedError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Generation(e) => {
                error!("Generation failed: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "detail": self.to_string(),
        }));

        (status, body).into_response()
    }
}
