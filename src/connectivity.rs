//! Platform connectivity signals consumed by the sync controller.

/// Transport and visibility events from the host platform.
///
/// `Online` and `PageVisible` trigger a reset-and-retry when the controller
/// is waiting out a backoff or serving demo data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivitySignal {
    /// The transport reports the network came back.
    Online,
    /// The transport reports the network dropped.
    Offline,
    /// The application returned to the foreground.
    PageVisible,
}
