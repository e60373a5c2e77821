//! Error types for the drive_facade crate.

use thiserror::Error;

/// Errors that can occur when talking to Google Drive through the facade.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Invalid or missing service account credential: {0}")]
    InvalidCredential(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to encode JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid URL or ID: {0}")]
    InvalidUrlOrId(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JWT encoding error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Token refresh failed: {0}")]
    TokenRefreshError(String),

    #[error("Request cancelled")]
    Cancelled,
}

/// Result type alias for DriveError.
pub type Result<T> = std::result::Result<T, DriveError>;
