//! Error types for rabata-core
//!
//! Provides a unified error type that can be classified for retry and
//! absence decisions and converted to appropriate exit codes.

use std::fmt;

use thiserror::Error;

/// Result type alias for rabata-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// An error reported by the S3 API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Service error code, e.g. `NoSuchBucket`
    pub code: String,

    /// Service error message (may be empty)
    pub message: String,

    /// HTTP status code of the failed response, when one was received
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(status) = self.status {
            write!(f, " (status code: {status})")?;
        }
        Ok(())
    }
}

/// Error types for rabata-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid attribute value, rejected before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Mutually exclusive attributes were set together
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Provider configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error response from the S3 API
    #[error("{0}")]
    Api(ApiError),

    /// Transport failure (retryable by the SDK, surfaced once exhausted)
    #[error("Network error: {0}")]
    Network(String),

    /// A retry deadline elapsed
    #[error("timeout while waiting for state to become ready{}", last_error_suffix(.last_error))]
    Timeout { last_error: Option<Box<Error>> },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding error
    #[error("error decoding content_base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// An error wrapped with the operation and resource it happened on
    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<Error>,
    },

    /// General error
    #[error("{0}")]
    General(String),
}

fn last_error_suffix(last_error: &Option<Box<Error>>) -> String {
    match last_error {
        Some(err) => format!(" (last error: {err})"),
        None => String::new(),
    }
}

impl Error {
    /// Build an API error without an HTTP status
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Api(ApiError::new(code, message))
    }

    /// Build an API error that only carries an HTTP status
    pub fn status(status: u16) -> Self {
        Error::Api(ApiError {
            code: status.to_string(),
            message: String::new(),
            status: Some(status),
        })
    }

    /// Wrap this error with a message naming the operation and resource
    pub fn context(self, message: impl Into<String>) -> Self {
        Error::Context {
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// The API error carried by this error, looking through context
    /// wrappers and the last error of a timeout
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(api) => Some(api),
            Error::Context { source, .. } => source.api_error(),
            Error::Timeout {
                last_error: Some(last),
            } => last.api_error(),
            _ => None,
        }
    }

    /// True when a retry deadline elapsed before any attempt reported an
    /// error, i.e. the operation itself was still in flight
    pub fn is_resource_timeout(&self) -> bool {
        match self {
            Error::Timeout { last_error } => last_error.is_none(),
            Error::Context { source, .. } => source.is_resource_timeout(),
            _ => false,
        }
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_) | Error::Config(_) | Error::InvalidUrl(_) => 2, // UsageError
            Error::Network(_) | Error::Timeout { .. } => 3,                     // NetworkError
            Error::NotFound(_) => 5,                                             // NotFound
            Error::Conflict(_) => 6,                                             // Conflict
            Error::Api(api) => match (api.code.as_str(), api.status) {
                ("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch", _)
                | (_, Some(401 | 403)) => 4,
                ("NoSuchBucket" | "NoSuchKey" | "NotFound", _) | (_, Some(404)) => 5,
                ("BucketAlreadyExists" | "BucketAlreadyOwnedByYou" | "BucketNotEmpty", _)
                | (_, Some(409)) => 6,
                ("NotImplemented", _) | (_, Some(501)) => 7,
                _ => 1,
            },
            Error::Context { source, .. } => source.exit_code(),
            _ => 1, // GeneralError
        }
    }
}

/// Attach context to fallible results
pub trait ResultExt<T> {
    /// Wrap the error (if any) with a message naming the operation
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`] but builds the message lazily
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(message))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}
