//! Error classifiers
//!
//! Predicates over [`Error`] that gate retry-vs-fail and exists-vs-absent
//! decisions uniformly across the handlers.

use crate::error::Error;

/// Error codes the handlers react to
pub mod codes {
    pub const NO_SUCH_BUCKET: &str = "NoSuchBucket";
    pub const NO_SUCH_KEY: &str = "NoSuchKey";
    pub const NOT_FOUND: &str = "NotFound";
    pub const BUCKET_NOT_EMPTY: &str = "BucketNotEmpty";
    pub const OPERATION_ABORTED: &str = "OperationAborted";
    pub const NOT_IMPLEMENTED: &str = "NotImplemented";
}

/// HTTP status codes the handlers react to
pub mod status {
    pub const NOT_FOUND: u16 = 404;
    pub const NOT_IMPLEMENTED: u16 = 501;
}

/// Returns true if the error matches all these conditions:
/// - it carries an S3 API error
/// - the error code equals `code`
/// - the error message contains `message`
pub fn is_api_error(err: &Error, code: &str, message: &str) -> bool {
    err.api_error()
        .is_some_and(|api| api.code == code && api.message.contains(message))
}

/// Returns true if the error carries an HTTP status equal to `status`.
///
/// Prefer [`is_api_error`]; S3 answers HEAD requests with a bare status.
pub fn is_status(err: &Error, status: u16) -> bool {
    err.api_error().is_some_and(|api| api.status == Some(status))
}

/// The error code of an API error, if any
pub fn error_code(err: &Error) -> Option<&str> {
    err.api_error().map(|api| api.code.as_str())
}

/// Bucket absence: a bare 404 or `NoSuchBucket`
pub fn is_bucket_not_found(err: &Error) -> bool {
    is_status(err, status::NOT_FOUND) || is_api_error(err, codes::NO_SUCH_BUCKET, "")
}

/// Object absence during deletion: `NoSuchBucket` or `NoSuchKey`
pub fn is_object_gone(err: &Error) -> bool {
    is_api_error(err, codes::NO_SUCH_BUCKET, "") || is_api_error(err, codes::NO_SUCH_KEY, "")
}
