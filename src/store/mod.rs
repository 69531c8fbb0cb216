//! Remote document store seam.
//!
//! The trip lives in a single cloud-hosted JSON document. This module
//! defines the client-side interface to that store: anonymous identity
//! acquisition, a subscription that pushes the full document on every
//! change, and partial-field writes. The store's native error identifiers
//! are mapped to the closed [`ErrorCode`] set here at the boundary, so the
//! sync controller never sees raw error strings.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;

/// A trip document: named top-level sections, no enforced schema.
pub type Document = Map<String, Value>;

/// Identity under which the store is accessed.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Stable user id assigned by the store.
    pub uid: String,
    /// True when the identity was created anonymously.
    pub anonymous: bool,
}

/// Opaque id naming one subscription.
///
/// Comparing an event's handle against the currently live handle is what
/// makes callbacks from a released subscription no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

impl HandleId {
    /// Wraps a raw handle number.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Error codes a store reports on a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    /// The subscription was torn down intentionally.
    Cancelled,
    /// The store is temporarily unreachable.
    Unavailable,
    /// The store gave up waiting on an internal deadline.
    DeadlineExceeded,
    /// Quota or rate limits were hit.
    ResourceExhausted,
    /// The identity is not allowed to read the document.
    PermissionDenied,
    /// The store rejected the request shape (rules, indexes).
    FailedPrecondition,
    /// The request itself was malformed.
    InvalidArgument,
    /// Anything the store did not classify.
    Unknown(String),
}

impl ErrorCode {
    /// Maps a store's native error identifier to the closed code set.
    ///
    /// Unrecognized identifiers land in [`ErrorCode::Unknown`].
    pub fn from_native(code: &str) -> Self {
        match code {
            "cancelled" => ErrorCode::Cancelled,
            "unavailable" => ErrorCode::Unavailable,
            "deadline-exceeded" => ErrorCode::DeadlineExceeded,
            "resource-exhausted" => ErrorCode::ResourceExhausted,
            "permission-denied" => ErrorCode::PermissionDenied,
            "failed-precondition" => ErrorCode::FailedPrecondition,
            "invalid-argument" => ErrorCode::InvalidArgument,
            other => ErrorCode::Unknown(other.to_string()),
        }
    }
}

/// One event delivered on a subscription.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// The current document, or `None` when it does not exist.
    Push(Option<Document>),
    /// A classified error code.
    Error(ErrorCode),
}

/// A live subscription: the handle plus its event stream.
#[derive(Debug)]
pub struct Subscription {
    /// Handle naming this subscription.
    pub id: HandleId,
    /// Ordered stream of pushes and errors.
    pub events: mpsc::UnboundedReceiver<StoreEvent>,
}

/// Errors from store operations themselves.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Identity acquisition failed: {0}")]
    Identity(String),

    #[error("Failed to open subscription: {0}")]
    Subscribe(String),

    #[error("Write failed: {0}")]
    Write(String),
}

/// Client interface to the cloud document store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Acquires an identity, creating an anonymous one if none exists.
    async fn acquire_identity(&self) -> Result<Identity, StoreError>;

    /// Opens a subscription to the document at `path`.
    ///
    /// The store pushes the current document state immediately, then the
    /// full document on every subsequent change.
    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError>;

    /// Releases a subscription.
    ///
    /// Synchronous and fire-and-forget: the underlying transport may cancel
    /// asynchronously, but no further events for `id` are acted on by
    /// callers after this returns. Releasing an unknown handle is a no-op.
    fn unsubscribe(&self, id: HandleId);

    /// Writes `fields` into the document at `path`, creating it if needed.
    ///
    /// Only the named top-level fields are replaced.
    async fn write_fields(&self, path: &str, fields: Document) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: RemoteStore + ?Sized> RemoteStore for std::sync::Arc<T> {
    async fn acquire_identity(&self) -> Result<Identity, StoreError> {
        (**self).acquire_identity().await
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError> {
        (**self).subscribe(path).await
    }

    fn unsubscribe(&self, id: HandleId) {
        (**self).unsubscribe(id)
    }

    async fn write_fields(&self, path: &str, fields: Document) -> Result<(), StoreError> {
        (**self).write_fields(path, fields).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_codes_map_to_closed_set() {
        assert_eq!(ErrorCode::from_native("cancelled"), ErrorCode::Cancelled);
        assert_eq!(ErrorCode::from_native("unavailable"), ErrorCode::Unavailable);
        assert_eq!(
            ErrorCode::from_native("deadline-exceeded"),
            ErrorCode::DeadlineExceeded
        );
        assert_eq!(
            ErrorCode::from_native("resource-exhausted"),
            ErrorCode::ResourceExhausted
        );
        assert_eq!(
            ErrorCode::from_native("permission-denied"),
            ErrorCode::PermissionDenied
        );
        assert_eq!(
            ErrorCode::from_native("failed-precondition"),
            ErrorCode::FailedPrecondition
        );
        assert_eq!(
            ErrorCode::from_native("invalid-argument"),
            ErrorCode::InvalidArgument
        );
    }

    #[test]
    fn test_unrecognized_code_is_unknown() {
        match ErrorCode::from_native("aborted") {
            ErrorCode::Unknown(raw) => assert_eq!(raw, "aborted"),
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_handle_ids_compare_by_value() {
        assert_eq!(HandleId::new(7), HandleId::new(7));
        assert_ne!(HandleId::new(7), HandleId::new(8));
    }
}
