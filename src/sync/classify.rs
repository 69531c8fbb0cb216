//! Error classification at the store boundary.

use crate::store::ErrorCode;

/// Closed classification of store errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Intentional teardown: no retry, no message.
    Cancelled,
    /// Retryable with backoff.
    Transient,
    /// Terminal and user-actionable.
    Permission,
    /// Terminal and developer-actionable.
    Configuration,
}

/// Maps a store error code to its class.
///
/// Codes the store did not classify are treated as transient, so they get a
/// bounded retry instead of an immediate fallback.
pub fn classify(code: &ErrorCode) -> ErrorClass {
    match code {
        ErrorCode::Cancelled => ErrorClass::Cancelled,
        ErrorCode::Unavailable
        | ErrorCode::DeadlineExceeded
        | ErrorCode::ResourceExhausted
        | ErrorCode::Unknown(_) => ErrorClass::Transient,
        ErrorCode::PermissionDenied => ErrorClass::Permission,
        ErrorCode::FailedPrecondition | ErrorCode::InvalidArgument => ErrorClass::Configuration,
    }
}
