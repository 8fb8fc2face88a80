use thiserror::Error;
use trainer_types::{ErrorBody, MachinesDataError};

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TrainerClientError {
    /// The server answered with a non-success status.  `message` is already user-facing:
    /// the server's error text, or "<action> failed (<status>)" when it gave none.
    #[error("{message}")]
    Http { action: String, status: u16, message: String },

    /// The request never produced a response (connection refused, timeout, reset...).
    #[error("{action} failed: {message}")]
    Transport { action: String, message: String },

    #[error("Configuration Error: {0}")]
    ConfigurationError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    MachinesData(#[from] MachinesDataError),

    #[error("Parse Error: {0}")]
    ParseError(#[from] url::ParseError),

    #[error("ReqwestMiddleware Error: {0}")]
    ReqwestMiddlewareError(#[from] reqwest_middleware::Error),

    #[error("Reqwest Error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Json Error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrainerClientError>;

impl TrainerClientError {
    /// Builds the error for a non-success response from its status and raw body.
    pub fn from_status(action: &str, status: u16, body: &str) -> Self {
        let message = ErrorBody::extract(body).unwrap_or_else(|| format!("{action} failed ({status})"));
        Self::Http {
            action: action.to_string(),
            status,
            message,
        }
    }

    pub fn transport(action: &str, message: impl ToString) -> Self {
        Self::Transport {
            action: action.to_string(),
            message: message.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::ReqwestMiddlewareError(_) | Self::ReqwestError(_))
    }
}
