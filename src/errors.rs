//! Error types for seismodash.
//!
//! Uses `thiserror` for library-style error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Shown when no response reached us, or the status has no dedicated text.
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again later.";

/// Shown when the request never got a response.
pub const CONNECTIVITY_MESSAGE: &str =
    "Could not reach the server. Check your connection and try again.";

/// Errors that can occur in seismodash operations.
#[derive(Error, Debug)]
pub enum SeismodashError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Backend returned an error status
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid response structure
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Input rejected before any request was made
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Local key-value store could not be read or written
    #[error("Storage error at {path:?}: {message}")]
    Storage { path: PathBuf, message: String },

    /// Configuration file could not be loaded
    #[error("Config error at {path:?}: {message}")]
    Config { path: PathBuf, message: String },
}

impl SeismodashError {
    /// HTTP status carried by the error, if the backend answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Text suitable for showing to the user.
    ///
    /// Validation errors keep their own text; everything else goes through
    /// the fixed status table.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Http(e) if e.status().is_none() => CONNECTIVITY_MESSAGE.to_string(),
            _ => status_message(self.status()).to_string(),
        }
    }
}

/// Map an HTTP status to the fixed user-facing message.
#[must_use]
pub fn status_message(status: Option<u16>) -> &'static str {
    match status {
        Some(401) => "Invalid email or password.",
        Some(403) => "You do not have permission to do that. Please verify your account.",
        Some(404) => "The requested resource was not found.",
        Some(409) => "An account with this email already exists.",
        Some(429) => "Too many attempts. Please wait a moment and try again.",
        Some(500) => "The server encountered an error. Please try again later.",
        _ => GENERIC_MESSAGE,
    }
}
