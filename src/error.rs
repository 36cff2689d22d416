use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Non-success HTTP status with the provider's error text.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Invalid settings: {0}")]
    Settings(String),
    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        AppError::Status {
            status,
            message: message.into(),
        }
    }
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        AppError::Other(value)
    }
}

impl From<&str> for AppError {
    fn from(value: &str) -> Self {
        AppError::Other(value.to_string())
    }
}
