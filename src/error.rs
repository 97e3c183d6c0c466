//! Error types for the pesepay library

use thiserror::Error;

/// Result type alias for pesepay operations
pub type Result<T> = std::result::Result<T, PesepayError>;

/// Main error type for pesepay operations
#[derive(Error, Debug)]
pub enum PesepayError {
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error (DNS, connection, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Base64 encoding/decoding error
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Encryption key is not usable as an AES key
    #[error("Invalid encryption key: {message}")]
    InvalidKey { message: String },

    /// Payload could not be encrypted
    #[error("Encryption failed: {message}")]
    Encryption { message: String },

    /// Ciphertext could not be decrypted into UTF-8 text
    #[error("Decryption failed: {message}")]
    Decryption { message: String },

    /// The service answered with a non-2xx status
    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered 2xx but the body is not a payload envelope
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PesepayError {
    /// Create an invalid key error
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Create an encryption error
    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption {
            message: message.into(),
        }
    }

    /// Create a decryption error
    pub fn decryption(message: impl Into<String>) -> Self {
        Self::Decryption {
            message: message.into(),
        }
    }

    /// Create a status error
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the failure happened on the way to or from the service,
    /// as opposed to while encoding or decoding the payload.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. })
    }

    /// Whether the failure came from the envelope codec (including an
    /// unusable key) or from a response that could not be interpreted.
    pub fn is_payload(&self) -> bool {
        matches!(
            self,
            Self::Json(_)
                | Self::Base64(_)
                | Self::InvalidKey { .. }
                | Self::Encryption { .. }
                | Self::Decryption { .. }
                | Self::MalformedResponse { .. }
        )
    }
}
