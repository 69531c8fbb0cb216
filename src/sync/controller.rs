//! The sync controller: subscription lifecycle, reconnection, fallback.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::backoff::RetryPolicy;
use super::classify::{classify, ErrorClass};
use super::{Notice, Notifier, RenderSink};
use crate::connectivity::ConnectivitySignal;
use crate::fallback;
use crate::mirror::LocalMirror;
use crate::store::{
    Document, ErrorCode, HandleId, Identity, RemoteStore, StoreEvent, Subscription,
};

/// Connection state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No subscription and none wanted.
    Disconnected,
    /// A subscription is being opened; no push received yet.
    Connecting,
    /// The subscription is live and delivering pushes.
    Subscribed,
    /// A reconnection delay is running down.
    Retrying,
    /// No live connection; demo data (or the last mirror) is served.
    OfflineFallback,
}

/// Reconnection bookkeeping.
///
/// `attempt_count` grows by one per retryable error and resets to zero on
/// any successful push.
#[derive(Debug, Default)]
struct RetryBudget {
    attempt_count: u32,
    last_error: Option<ErrorClass>,
}

/// Point-in-time controller status.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncStatus {
    /// Current connection state.
    pub state: ConnectionState,
    /// Consecutive transient errors since the last successful push.
    pub attempt_count: u32,
    /// Class of the most recent store error, if any.
    pub last_error: Option<ErrorClass>,
    /// True while demo data is what the render layer last received.
    pub fallback_active: bool,
    /// Wall-clock time of the last successful push.
    pub last_push_at: Option<DateTime<Utc>>,
}

/// Supervises exactly one live subscription to the trip document.
///
/// All state transitions happen in the synchronous handler methods; the only
/// suspension points are identity acquisition, subscription establishment,
/// and the backoff sleep, which live in [`SyncController::run`]. Errors from
/// the store are fully absorbed: nothing propagates to the caller of
/// [`SyncController::start`].
pub struct SyncController<S, R, N> {
    store: S,
    render: R,
    notifier: N,
    policy: RetryPolicy,
    path: String,
    identity: Option<Identity>,
    mirror: LocalMirror,
    subscription: Option<Subscription>,
    state: ConnectionState,
    budget: RetryBudget,
    /// A reconnection delay is outstanding; new errors must not schedule
    /// another until it fires.
    retry_outstanding: bool,
    /// Delay scheduled by the state machine, consumed by the driver.
    pending_delay: Option<Duration>,
    /// Armed deadline in the driver loop.
    retry_at: Option<Instant>,
    fallback_active: bool,
    last_push_at: Option<DateTime<Utc>>,
}

impl<S, R, N> SyncController<S, R, N>
where
    S: RemoteStore,
    R: RenderSink,
    N: Notifier,
{
    /// Creates a controller for the document at `path`.
    pub fn new(
        store: S,
        path: impl Into<String>,
        policy: RetryPolicy,
        render: R,
        notifier: N,
    ) -> Self {
        Self {
            store,
            render,
            notifier,
            policy,
            path: path.into(),
            identity: None,
            mirror: LocalMirror::new(),
            subscription: None,
            state: ConnectionState::Disconnected,
            budget: RetryBudget::default(),
            retry_outstanding: false,
            pending_delay: None,
            retry_at: None,
            fallback_active: false,
            last_push_at: None,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The current mirror snapshot.
    pub fn mirror(&self) -> &Document {
        self.mirror.snapshot()
    }

    /// The identity acquired by [`SyncController::start`], if any.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Point-in-time status snapshot.
    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            state: self.state,
            attempt_count: self.budget.attempt_count,
            last_error: self.budget.last_error,
            fallback_active: self.fallback_active,
            last_push_at: self.last_push_at,
        }
    }

    /// Acquires an identity and opens the subscription.
    ///
    /// On identity failure the controller goes straight to demo data; no
    /// error reaches the caller.
    pub async fn start(&mut self) {
        match self.store.acquire_identity().await {
            Ok(identity) => {
                tracing::info!(uid = %identity.uid, anonymous = identity.anonymous, "identity acquired");
                self.identity = Some(identity);
                self.resubscribe().await;
            }
            Err(e) => {
                tracing::warn!("identity acquisition failed: {}", e);
                self.enter_fallback();
            }
        }
    }

    /// Opens a fresh subscription, releasing any prior one first.
    pub async fn resubscribe(&mut self) {
        self.release_handle();
        self.state = ConnectionState::Connecting;
        match self.store.subscribe(&self.path).await {
            Ok(sub) => {
                tracing::debug!(handle = ?sub.id, path = %self.path, "subscription opened");
                self.subscription = Some(sub);
            }
            Err(e) => {
                tracing::warn!("subscription failed: {}", e);
                self.schedule_retry();
            }
        }
    }

    /// Handles a push delivered on subscription `handle`.
    ///
    /// Pushes from a released subscription are discarded. An empty or
    /// missing document activates the fallback instead of rendering an
    /// empty mirror.
    pub fn on_push(&mut self, handle: HandleId, doc: Option<Document>) {
        if self.live_handle() != Some(handle) {
            tracing::debug!(?handle, "discarding push from a released subscription");
            return;
        }

        self.budget.attempt_count = 0;
        self.budget.last_error = None;
        self.state = ConnectionState::Subscribed;
        self.last_push_at = Some(Utc::now());

        match doc {
            Some(doc) if !doc.is_empty() => {
                self.fallback_active = false;
                self.mirror.merge(doc);
                self.render.render(self.mirror.snapshot());
                tracing::debug!(sections = self.mirror.snapshot().len(), "push merged");
            }
            _ => {
                // Missing and explicitly empty documents both serve demo data.
                tracing::debug!("push carried no data");
                self.serve_fallback();
            }
        }
    }

    /// Handles an error delivered on subscription `handle`.
    pub fn on_store_error(&mut self, handle: HandleId, code: ErrorCode) {
        if self.live_handle() != Some(handle) {
            tracing::debug!(?handle, "discarding error from a released subscription");
            return;
        }

        let class = classify(&code);
        match class {
            ErrorClass::Cancelled => {
                // Intentional teardown: no retry, no message.
            }
            ErrorClass::Transient => {
                self.budget.last_error = Some(class);
                tracing::debug!(?code, "transient store error");
                self.schedule_retry();
            }
            ErrorClass::Permission => {
                self.budget.last_error = Some(class);
                self.enter_terminal(Notice::PermissionDenied, &code);
            }
            ErrorClass::Configuration => {
                self.budget.last_error = Some(class);
                self.enter_terminal(Notice::Misconfigured, &code);
            }
        }
    }

    /// Called by the driver when the scheduled reconnection delay elapses.
    ///
    /// Returns true when the driver should open a fresh subscription. With
    /// the retry budget exhausted, the controller gives up and serves demo
    /// data instead.
    pub fn on_retry_elapsed(&mut self) -> bool {
        self.retry_outstanding = false;
        if self.state != ConnectionState::Retrying {
            // Stopped, recovered, or fell back while the timer ran.
            return false;
        }
        if self.budget.attempt_count >= self.policy.max_attempts {
            tracing::warn!(
                attempts = self.budget.attempt_count,
                "reconnection budget exhausted"
            );
            self.budget.attempt_count = 0;
            self.enter_fallback();
            return false;
        }
        self.state = ConnectionState::Connecting;
        true
    }

    /// Handles a platform connectivity signal.
    ///
    /// Returns true when the driver should open a fresh subscription.
    pub fn on_connectivity(&mut self, signal: ConnectivitySignal) -> bool {
        match signal {
            ConnectivitySignal::Offline => {
                tracing::debug!("transport reports offline");
                false
            }
            ConnectivitySignal::Online | ConnectivitySignal::PageVisible => self.retry_now(),
        }
    }

    /// Resets the retry budget and asks for a fresh subscription.
    ///
    /// Only acts while the controller is waiting out a backoff or serving
    /// demo data; returns true when the driver should resubscribe.
    pub fn retry_now(&mut self) -> bool {
        if !matches!(
            self.state,
            ConnectionState::Retrying | ConnectionState::OfflineFallback
        ) {
            return false;
        }
        tracing::info!("retrying connection");
        self.budget.attempt_count = 0;
        self.retry_outstanding = false;
        self.pending_delay = None;
        self.retry_at = None;
        self.state = ConnectionState::Connecting;
        true
    }

    /// Releases the live subscription and disconnects.
    ///
    /// The handle is invalidated before the store's own teardown runs, so a
    /// late push or error from the old subscription is a no-op.
    pub fn stop(&mut self) {
        self.release_handle();
        self.retry_outstanding = false;
        self.pending_delay = None;
        self.retry_at = None;
        self.state = ConnectionState::Disconnected;
        tracing::debug!("sync controller stopped");
    }

    /// Drives the controller until the signal channel closes.
    ///
    /// Dropping the signal sender is the shutdown path: the controller stops
    /// and the loop exits. Pushes are processed in delivery order.
    pub async fn run(&mut self, mut signals: mpsc::UnboundedReceiver<ConnectivitySignal>) {
        enum Wake {
            Store(HandleId, Option<StoreEvent>),
            RetryElapsed,
            Signal(Option<ConnectivitySignal>),
        }

        self.start().await;

        loop {
            if let Some(delay) = self.pending_delay.take() {
                self.retry_at = Some(Instant::now() + delay);
            }

            let wake = {
                let live = self.subscription.as_mut().map(|s| (s.id, &mut s.events));
                let deadline = self.retry_at;
                tokio::select! {
                    (handle, event) = wait_for_event(live) => Wake::Store(handle, event),
                    _ = wait_for_deadline(deadline) => Wake::RetryElapsed,
                    signal = signals.recv() => Wake::Signal(signal),
                }
            };

            match wake {
                Wake::Store(handle, Some(StoreEvent::Push(doc))) => self.on_push(handle, doc),
                Wake::Store(handle, Some(StoreEvent::Error(code))) => {
                    self.on_store_error(handle, code)
                }
                Wake::Store(_, None) => {
                    // The store dropped the event stream without a code.
                    tracing::warn!("subscription stream ended");
                    self.release_handle();
                    self.schedule_retry();
                }
                Wake::RetryElapsed => {
                    self.retry_at = None;
                    if self.on_retry_elapsed() {
                        self.resubscribe().await;
                    }
                }
                Wake::Signal(Some(signal)) => {
                    if self.on_connectivity(signal) {
                        self.resubscribe().await;
                    }
                }
                Wake::Signal(None) => self.stop(),
            }

            if self.state == ConnectionState::Disconnected {
                break;
            }
        }
    }

    fn live_handle(&self) -> Option<HandleId> {
        self.subscription.as_ref().map(|s| s.id)
    }

    fn release_handle(&mut self) {
        if let Some(sub) = self.subscription.take() {
            self.store.unsubscribe(sub.id);
            tracing::debug!(handle = ?sub.id, "released subscription");
        }
    }

    /// Schedules one reconnection delay, unless one is already outstanding.
    fn schedule_retry(&mut self) {
        if self.retry_outstanding {
            return;
        }
        self.budget.attempt_count += 1;
        let delay = self.policy.delay_for_attempt(self.budget.attempt_count);
        self.retry_outstanding = true;
        self.pending_delay = Some(delay);
        self.state = ConnectionState::Retrying;
        if self.budget.attempt_count == 1 {
            self.notifier.notify(Notice::Reconnecting);
        }
        tracing::debug!(
            attempt = self.budget.attempt_count,
            delay_ms = delay.as_millis() as u64,
            "reconnection scheduled"
        );
    }

    /// Gives up on a live connection and serves demo data.
    fn enter_fallback(&mut self) {
        self.release_handle();
        self.state = ConnectionState::OfflineFallback;
        tracing::warn!("no live connection, serving demo trip data");
        self.serve_fallback();
    }

    /// Terminal store error: release, notify once, keep the UI populated.
    fn enter_terminal(&mut self, notice: Notice, code: &ErrorCode) {
        tracing::warn!(?code, "terminal store error");
        self.release_handle();
        self.state = ConnectionState::OfflineFallback;
        self.notifier.notify(notice);
        self.render_current();
    }

    /// Renders whatever the UI should currently show: the mirror if it ever
    /// received data, demo data otherwise.
    fn render_current(&mut self) {
        if self.mirror.is_empty() {
            self.serve_fallback();
        } else {
            self.render.render(self.mirror.snapshot());
        }
    }

    fn serve_fallback(&mut self) {
        if !self.fallback_active {
            self.fallback_active = true;
            self.notifier.notify(Notice::DemoData);
        }
        let demo = fallback::demo_document();
        self.render.render(&demo);
    }
}

async fn wait_for_event(
    sub: Option<(HandleId, &mut mpsc::UnboundedReceiver<StoreEvent>)>,
) -> (HandleId, Option<StoreEvent>) {
    match sub {
        Some((id, events)) => (id, events.recv().await),
        None => std::future::pending().await,
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
