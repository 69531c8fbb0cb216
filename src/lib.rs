//! Trip Sync Core Library
//!
//! Real-time synchronization core for the family travel planner. Keeps an
//! in-memory mirror of the remote trip document current under flaky
//! connectivity, and serves built-in demo data when the store is
//! unreachable, so the UI is never empty.

pub mod config;
pub mod connectivity;
pub mod fallback;
pub mod mirror;
pub mod store;
pub mod sync;

pub use config::{Config, ConfigError, RetryConfig};
pub use connectivity::ConnectivitySignal;
pub use mirror::LocalMirror;
pub use store::{
    Document, ErrorCode, HandleId, Identity, MemoryStore, RemoteStore, StoreError, StoreEvent,
    Subscription,
};
pub use sync::{
    classify, ConnectionState, ErrorClass, Notice, Notifier, RenderSink, RetryPolicy,
    SyncController, SyncStatus,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
