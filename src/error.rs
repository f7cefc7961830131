use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::api::transport::Method;

/// Per-field validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<String, String>;

/// A message ready to be shown in a dismissible alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub header: String,
    pub message: String,
}

impl ErrorMessage {
    pub fn new(header: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.header, self.message)
    }
}

/// Failure of a single REST call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("{method} {url} returned status {status}")]
    Status {
        method: Method,
        url: String,
        status: u16,
        body: Value,
    },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            ApiError::Status { url, .. }
            | ApiError::Transport { url, .. }
            | ApiError::Decode { url, .. } => url,
        }
    }

    /// Shared error-to-message mapping used by every controller.
    /// `action` reads like "delete credential" or "retrieve workflow nodes".
    pub fn to_message(&self, action: &str) -> ErrorMessage {
        let message = match self {
            ApiError::Status { method, status, .. } => {
                format!("Failed to {}. {} returned status: {}", action, method, status)
            }
            ApiError::Transport { url, message } => {
                format!("Failed to {}. Call to {} failed: {}", action, url, message)
            }
            ApiError::Decode { url, message } => {
                format!("Failed to {}. Unexpected response from {}: {}", action, url, message)
            }
        };
        ErrorMessage::new("Error!", message)
    }
}

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),

    #[error("content error: {0}")]
    Content(String),

    #[error("workflow graph integrity: {0}")]
    GraphIntegrity(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsoleError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), message.into());
        ConsoleError::Validation(errors)
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
