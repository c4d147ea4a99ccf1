//! Conversion of SDK errors into provider errors
//!
//! The service error code, message and HTTP status are kept so the core
//! classifiers can match on them. Transport failures become network errors.

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_smithy_types::error::display::DisplayErrorContext;

use rabata_core::{ApiError, Error};

pub(crate) fn from_sdk_error<E>(err: SdkError<E, HttpResponse>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    if matches!(
        err,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_)
    ) {
        return Error::Network(DisplayErrorContext(&err).to_string());
    }

    let status = err.raw_response().map(|response| response.status().as_u16());
    api_error(err.code(), err.message(), status)
        .unwrap_or_else(|| Error::General(DisplayErrorContext(&err).to_string()))
}

/// An API error from whatever the response carried. HEAD responses have no
/// body, so the status stands in for a missing code.
fn api_error(code: Option<&str>, message: Option<&str>, status: Option<u16>) -> Option<Error> {
    let code = match (code, status) {
        (Some(code), _) if !code.is_empty() => code.to_string(),
        (_, Some(status)) => status.to_string(),
        _ => return None,
    };

    let mut api = ApiError::new(code, message.unwrap_or_default());
    if let Some(status) = status {
        api = api.with_status(status);
    }
    Some(Error::Api(api))
}
