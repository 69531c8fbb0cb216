//! Real-time synchronization between the local mirror and the remote store.
//!
//! The controller owns the subscription lifecycle: it acquires an identity,
//! keeps at most one subscription live, merges every push into the local
//! mirror, and drives a bounded exponential-backoff reconnection state
//! machine when the store misbehaves. When no live data can be had it serves
//! the built-in demo trip, so the render layer always has something to draw.
//!
//! ## Control flow
//!
//! 1. `start` acquires an identity (anonymous if none exists)
//! 2. `resubscribe` opens the subscription to the trip document
//! 3. Every push is shallow-merged into the mirror and rendered
//! 4. Errors are classified once at the boundary; transient ones schedule a
//!    backoff, terminal ones fall back to demo data

mod backoff;
mod classify;
mod controller;

pub use backoff::RetryPolicy;
pub use classify::{classify, ErrorClass};
pub use controller::{ConnectionState, SyncController, SyncStatus};

use crate::store::Document;

/// Receives the current document after every successful push or fallback
/// activation.
pub trait RenderSink {
    /// Redraws the UI from `doc`.
    fn render(&mut self, doc: &Document);
}

/// Receives user-facing notices about degraded connectivity.
pub trait Notifier {
    /// Surfaces `notice` to the user, non-blocking.
    fn notify(&mut self, notice: Notice);
}

/// User-facing connectivity notices.
///
/// `Reconnecting` is emitted for the first retry of a transient-error
/// sequence only; intentional teardown emits nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The connection dropped and a reconnection is scheduled.
    Reconnecting,
    /// The store rejected access to the trip document.
    PermissionDenied,
    /// The store reported a configuration problem.
    Misconfigured,
    /// Demo data is being shown instead of live data.
    DemoData,
}
