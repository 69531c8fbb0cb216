//! Local mirror of the remote trip document.

use crate::store::Document;

/// In-memory copy of the remote trip document.
///
/// Merges are shallow: top-level keys from a push overwrite the mirror's
/// corresponding keys, and keys absent from a push are preserved. The mirror
/// always reflects the most recent successfully received push and is never
/// rolled back on error.
#[derive(Debug, Clone, Default)]
pub struct LocalMirror {
    doc: Document,
}

impl LocalMirror {
    /// Creates an empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the mirror has never received data.
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> &Document {
        &self.doc
    }

    /// Shallow-merges a pushed document into the mirror.
    pub fn merge(&mut self, push: Document) {
        for (key, value) in push {
            self.doc.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_merge_into_empty_mirror() {
        let mut mirror = LocalMirror::new();
        assert!(mirror.is_empty());

        mirror.merge(doc(json!({"tripInfo": {"title": "Lisbon"}})));
        assert!(!mirror.is_empty());
        assert_eq!(mirror.snapshot()["tripInfo"]["title"], "Lisbon");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let push = doc(json!({"flightData": {"bookingRef": "X"}, "activities": [1, 2]}));

        let mut once = LocalMirror::new();
        once.merge(push.clone());

        let mut twice = LocalMirror::new();
        twice.merge(push.clone());
        twice.merge(push);

        assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn test_merge_preserves_keys_absent_from_push() {
        let mut mirror = LocalMirror::new();
        mirror.merge(doc(json!({
            "flightData": {"bookingRef": "X"},
            "packingList": {"items": ["passport"]}
        })));

        mirror.merge(doc(json!({"flightData": {"bookingRef": "Y"}})));

        // Overwrites keys present in the push, retains the rest.
        assert_eq!(mirror.snapshot()["flightData"]["bookingRef"], "Y");
        assert_eq!(mirror.snapshot()["packingList"]["items"][0], "passport");
    }

    #[test]
    fn test_partial_pushes_accumulate() {
        let mut mirror = LocalMirror::new();
        mirror.merge(doc(json!({"flightData": {"bookingRef": "X"}})));
        mirror.merge(doc(json!({"hotelData": {"name": "Y"}})));

        assert_eq!(mirror.snapshot()["flightData"]["bookingRef"], "X");
        assert_eq!(mirror.snapshot()["hotelData"]["name"], "Y");
    }

    #[test]
    fn test_merge_replaces_section_wholesale() {
        let mut mirror = LocalMirror::new();
        mirror.merge(doc(json!({"packingList": {"items": ["passport", "charger"]}})));
        mirror.merge(doc(json!({"packingList": {"items": ["sunscreen"]}})));

        // Top-level merge only: the new section value replaces the old one.
        assert_eq!(
            mirror.snapshot()["packingList"],
            json!({"items": ["sunscreen"]})
        );
    }
}
