//! SDK error classification
//!
//! Every SDK failure is mapped onto [`StoreError`] so the retry loop can
//! decide whether another attempt is worthwhile:
//!
//! | SDK failure                         | StoreError  |
//! |-------------------------------------|-------------|
//! | timeout, dispatch, bad response     | `Transient` |
//! | service error 5xx, 408 or 429       | `Transient` |
//! | any other service error             | `Rejected`  |
//! | request construction failure        | `Rejected`  |

use aws_sdk_s3::error::{DisplayErrorContext, SdkError};

use vaultpush_core::ports::StoreError;

/// HTTP statuses that are worth retrying
fn is_retryable_status(status: u16) -> bool {
    status >= 500 || status == 408 || status == 429
}

/// Whether `err` is a service response with HTTP 404
pub fn is_not_found<E>(err: &SdkError<E>) -> bool {
    matches!(err, SdkError::ServiceError(service_err) if service_err.raw().status().as_u16() == 404)
}

/// Maps an SDK error onto the port's error classification
pub fn classify_sdk_error<E>(err: SdkError<E>) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::ServiceError(service_err) => {
            let status = service_err.raw().status().as_u16();
            if is_retryable_status(status) {
                StoreError::Transient(format!("HTTP {status}: {message}"))
            } else {
                StoreError::Rejected(format!("HTTP {status}: {message}"))
            }
        }
        SdkError::ConstructionFailure(_) => StoreError::Rejected(message),
        _ => StoreError::Transient(message),
    }
}
