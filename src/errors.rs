use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("No photos selected for upload")]
    EmptySession,

    #[error("Upload failed for {item_name}: {reason}")]
    TransportFailure { item_name: String, reason: String },

    #[error("Upload cancelled during {phase} for session {session_id}")]
    Cancelled { phase: String, session_id: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file type: {path}. Only image files are supported.")]
    InvalidFileType { path: String },

    #[error("File too large: {path}. Maximum size is {max_mb}MB.")]
    FileTooLarge { path: String, max_mb: u64 },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Invalid upload endpoint: {url}")]
    InvalidEndpoint { url: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

/// Error constructors and classification
impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn file_not_found(path: &str) -> Self {
        Self::FileNotFound {
            path: path.to_string(),
        }
    }

    pub fn invalid_file_type(path: &str) -> Self {
        Self::InvalidFileType {
            path: path.to_string(),
        }
    }

    pub fn file_too_large(path: &str, max_mb: u64) -> Self {
        Self::FileTooLarge {
            path: path.to_string(),
            max_mb,
        }
    }

    pub fn invalid_endpoint(url: &str) -> Self {
        Self::InvalidEndpoint {
            url: url.to_string(),
        }
    }

    pub fn transport_failure(item_name: &str, reason: &str) -> Self {
        Self::TransportFailure {
            item_name: item_name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn cancelled(phase: &str, session_id: &str) -> Self {
        Self::Cancelled {
            phase: phase.to_string(),
            session_id: session_id.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Network(_) | AppError::TransportFailure { .. } | AppError::Io(_)
        )
    }

    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            AppError::EmptySession
                | AppError::Cancelled { .. }
                | AppError::FileNotFound { .. }
                | AppError::InvalidFileType { .. }
                | AppError::FileTooLarge { .. }
                | AppError::Validation { .. }
                | AppError::InvalidEndpoint { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_retryable() {
        let err = AppError::transport_failure("photo-1.jpg", "server error 503");
        assert!(err.is_retryable());
        assert!(!err.is_permanent());
    }

    #[test]
    fn cancellation_is_terminal() {
        let err = AppError::cancelled("upload", "session-1");
        assert!(err.is_permanent());
        assert!(!err.is_retryable());
    }

    #[test]
    fn empty_session_is_not_retryable() {
        assert!(!AppError::EmptySession.is_retryable());
        assert!(AppError::EmptySession.is_permanent());
    }
}
