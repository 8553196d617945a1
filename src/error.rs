//! Error types for the cloud-drive client.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for client operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Everything an operation can fail with. None of these end the session.
#[derive(Debug, Error)]
pub enum CloudError {
    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Transport failure, or a response that could not be understood.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered but reported failure.
    #[error("{}", reason_or(.message, .fallback))]
    Application {
        /// Server-supplied reason, when present.
        message: Option<String>,
        /// Generic text for the operation, used when the server gave none.
        fallback: &'static str,
        /// HTTP status of the reply.
        status: Option<StatusCode>,
    },

    /// Writing a downloaded file locally failed.
    #[error("Could not save file: {0}")]
    Storage(String),
}

/// Client-side validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter username and password")]
    MissingCredentials,

    #[error("Please enter a 6-digit OTP")]
    MalformedOtp,

    #[error(
        "Not enough storage!\n\nFile size: {file_mb} MB\nFree space: {free_mb} MB\n\nPlease delete some files first."
    )]
    InsufficientStorage { file_mb: String, free_mb: String },

    #[error("Please wait {0}s before resending")]
    ResendCooldown(u64),

    #[error("An upload is already in progress")]
    UploadInProgress,

    #[error("No file named '{0}'")]
    UnknownFile(String),

    #[error("{0}")]
    InvalidInput(String),
}

fn reason_or<'a>(message: &'a Option<String>, fallback: &'a str) -> &'a str {
    message.as_deref().unwrap_or(fallback)
}

impl CloudError {
    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        CloudError::Network(msg.into())
    }

    /// Creates an application error from an optional server reason.
    pub fn application(message: Option<String>, fallback: &'static str) -> Self {
        CloudError::Application {
            message: message.filter(|m| !m.trim().is_empty()),
            fallback,
            status: None,
        }
    }

    /// Attaches the HTTP status to an application error.
    pub fn with_status(self, code: StatusCode) -> Self {
        match self {
            CloudError::Application {
                message, fallback, ..
            } => CloudError::Application {
                message,
                fallback,
                status: Some(code),
            },
            other => other,
        }
    }

    /// Creates a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        CloudError::Storage(msg.into())
    }

    /// Returns true if no request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, CloudError::Validation(_))
    }

    /// Returns true if the server rejected the session (expired login).
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            CloudError::Application {
                status: Some(StatusCode::UNAUTHORIZED),
                ..
            }
        )
    }

    /// Text shown to the user.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl From<reqwest::Error> for CloudError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CloudError::Network(format!("request timed out: {err}"))
        } else if err.is_decode() {
            CloudError::Network(format!("unexpected response: {err}"))
        } else {
            CloudError::Network(err.to_string())
        }
    }
}
