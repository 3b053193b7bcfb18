//! Error types and handling for the `SoilLab` application

use thiserror::Error;

/// Main error type for the `SoilLab` application
#[derive(Error, Debug)]
pub enum FinderError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Model API communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// The model API rejected our credentials
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    /// The model API quota or rate limit was hit
    #[error("Rate limit error: {message}")]
    RateLimit { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Malformed payloads from the model API
    #[error("Parse error: {message}")]
    Parse { message: String },
}

impl FinderError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new authentication error
    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a new rate limit error
    pub fn rate_limit<S: Into<String>>(message: S) -> Self {
        Self::RateLimit {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            FinderError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            FinderError::Api { .. } | FinderError::Parse { .. } => {
                "The lab search service is unavailable right now. Please try again later."
                    .to_string()
            }
            FinderError::Authentication { .. } => {
                "The lab search service rejected our credentials. Please check the API key."
                    .to_string()
            }
            FinderError::RateLimit { .. } => {
                "The lab search service is busy. Please wait a moment and try again.".to_string()
            }
            FinderError::Validation { message } => {
                format!("Invalid input: {message}")
            }
        }
    }
}

impl From<reqwest::Error> for FinderError {
    fn from(err: reqwest::Error) -> Self {
        FinderError::api(format!("Request failed: {err}"))
    }
}
