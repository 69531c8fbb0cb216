//! In-process document store used by the test suite and the demo binary.
//!
//! Behaves like a real document store from the client's point of view:
//! subscribing delivers the current document state immediately, writes merge
//! named fields and fan the full document out to every subscriber, and
//! errors can be injected to exercise the controller's reconnection paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{
    Document, ErrorCode, HandleId, Identity, RemoteStore, StoreError, StoreEvent, Subscription,
};

struct Subscriber {
    id: HandleId,
    sender: mpsc::UnboundedSender<StoreEvent>,
}

#[derive(Default)]
struct Inner {
    docs: HashMap<String, Document>,
    subscribers: HashMap<String, Vec<Subscriber>>,
}

/// In-process implementation of [`RemoteStore`].
pub struct MemoryStore {
    inner: Mutex<Inner>,
    next_handle: AtomicU64,
    fail_identity: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            next_handle: AtomicU64::new(1),
            fail_identity: AtomicBool::new(false),
        }
    }

    /// Makes subsequent `acquire_identity` calls fail.
    pub fn set_fail_identity(&self, fail: bool) {
        self.fail_identity.store(fail, Ordering::Relaxed);
    }

    /// Delivers an error code to every subscriber of `path`.
    pub fn emit_error(&self, path: &str, code: ErrorCode) {
        let mut inner = self.inner.lock();
        if let Some(subs) = inner.subscribers.get_mut(path) {
            subs.retain(|sub| sub.sender.send(StoreEvent::Error(code.clone())).is_ok());
        }
    }

    /// The current document at `path`, if it exists.
    pub fn document(&self, path: &str) -> Option<Document> {
        self.inner.lock().docs.get(path).cloned()
    }

    /// Number of registered subscribers for `path`.
    pub fn subscriber_count(&self, path: &str) -> usize {
        self.inner
            .lock()
            .subscribers
            .get(path)
            .map_or(0, Vec::len)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RemoteStore for MemoryStore {
    async fn acquire_identity(&self) -> Result<Identity, StoreError> {
        if self.fail_identity.load(Ordering::Relaxed) {
            return Err(StoreError::Identity(
                "anonymous sign-in rejected".to_string(),
            ));
        }
        Ok(Identity {
            uid: uuid::Uuid::new_v4().to_string(),
            anonymous: true,
        })
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError> {
        let id = HandleId::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let (sender, events) = mpsc::unbounded_channel();

        let snapshot = {
            let mut inner = self.inner.lock();
            let snapshot = inner.docs.get(path).cloned();
            inner
                .subscribers
                .entry(path.to_string())
                .or_default()
                .push(Subscriber {
                    id,
                    sender: sender.clone(),
                });
            snapshot
        };

        // Initial snapshot push, None when the document does not exist yet.
        let _ = sender.send(StoreEvent::Push(snapshot));

        Ok(Subscription { id, events })
    }

    fn unsubscribe(&self, id: HandleId) {
        let mut inner = self.inner.lock();
        for subs in inner.subscribers.values_mut() {
            subs.retain(|sub| sub.id != id);
        }
    }

    async fn write_fields(&self, path: &str, fields: Document) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let doc = inner.docs.entry(path.to_string()).or_default();
        for (key, value) in fields {
            doc.insert(key, value);
        }
        let snapshot = doc.clone();

        if let Some(subs) = inner.subscribers.get_mut(path) {
            subs.retain(|sub| {
                sub.sender
                    .send(StoreEvent::Push(Some(snapshot.clone())))
                    .is_ok()
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_acquire_identity_is_anonymous() {
        let store = MemoryStore::new();
        let identity = store.acquire_identity().await.unwrap();
        assert!(identity.anonymous);
        assert!(!identity.uid.is_empty());
    }

    #[tokio::test]
    async fn test_acquire_identity_can_fail() {
        let store = MemoryStore::new();
        store.set_fail_identity(true);
        assert!(store.acquire_identity().await.is_err());
    }

    #[tokio::test]
    async fn test_subscribe_missing_document_pushes_none() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("trips/t1").await.unwrap();

        match sub.events.recv().await {
            Some(StoreEvent::Push(None)) => {}
            other => panic!("expected empty initial push, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_subscribe_delivers_current_snapshot() {
        let store = MemoryStore::new();
        store
            .write_fields("trips/t1", fields(json!({"hotelData": {"name": "Casa"}})))
            .await
            .unwrap();

        let mut sub = store.subscribe("trips/t1").await.unwrap();
        match sub.events.recv().await {
            Some(StoreEvent::Push(Some(doc))) => {
                assert_eq!(doc["hotelData"]["name"], "Casa");
            }
            other => panic!("expected snapshot push, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_fans_out_full_document() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("trips/t1").await.unwrap();
        let _ = sub.events.recv().await;

        store
            .write_fields("trips/t1", fields(json!({"flightData": {"bookingRef": "X"}})))
            .await
            .unwrap();
        store
            .write_fields("trips/t1", fields(json!({"hotelData": {"name": "Y"}})))
            .await
            .unwrap();

        let _ = sub.events.recv().await;
        match sub.events.recv().await {
            Some(StoreEvent::Push(Some(doc))) => {
                // Partial writes merge; the push carries the whole document.
                assert_eq!(doc["flightData"]["bookingRef"], "X");
                assert_eq!(doc["hotelData"]["name"], "Y");
            }
            other => panic!("expected push, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("trips/t1").await.unwrap();
        let _ = sub.events.recv().await;

        store.unsubscribe(sub.id);
        assert_eq!(store.subscriber_count("trips/t1"), 0);

        store
            .write_fields("trips/t1", fields(json!({"tripInfo": {"title": "T"}})))
            .await
            .unwrap();
        assert!(sub.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_emit_error_reaches_subscribers() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("trips/t1").await.unwrap();
        let _ = sub.events.recv().await;

        store.emit_error("trips/t1", ErrorCode::Unavailable);
        match sub.events.recv().await {
            Some(StoreEvent::Error(code)) => assert_eq!(code, ErrorCode::Unavailable),
            other => panic!("expected error event, got {:?}", other),
        }
    }
}
