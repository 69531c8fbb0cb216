//! Built-in demo trip data served when no live connection is available.

use serde_json::json;

use crate::store::Document;

/// Returns the demo trip document.
///
/// The demo carries every top-level section a real trip document can have,
/// so the render layer never has to special-case missing data. It is fully
/// self-contained and never merged with live data: the first real push after
/// a fallback period supersedes it entirely.
pub fn demo_document() -> Document {
    let value = json!({
        "tripInfo": {
            "title": "Lisbon Family Getaway",
            "destination": "Lisbon, Portugal",
            "startDate": "2025-04-12",
            "endDate": "2025-04-19",
            "travelers": ["Ana", "Marco", "Sofia", "Tomas"]
        },
        "flightData": {
            "bookingRef": "DEMO42",
            "airline": "TAP Air Portugal",
            "departure": {"airport": "BOS", "time": "2025-04-12T18:40:00Z"},
            "arrival": {"airport": "LIS", "time": "2025-04-13T06:10:00Z"}
        },
        "hotelData": {
            "name": "Casa do Rio",
            "address": "Rua da Bica 14, Lisboa",
            "checkIn": "2025-04-13",
            "checkOut": "2025-04-19"
        },
        "itinerary": [
            {"day": 1, "title": "Alfama walking tour", "notes": "Tram 28 to the castle"},
            {"day": 2, "title": "Belem and the river", "notes": "Pasteis de nata stop"},
            {"day": 3, "title": "Day trip to Sintra", "notes": "Train from Rossio"}
        ],
        "activities": [
            {"name": "Oceanarium", "votes": 3},
            {"name": "LX Factory market", "votes": 2}
        ],
        "packingList": {
            "items": [
                {"name": "Passports", "packed": false},
                {"name": "Chargers", "packed": false},
                {"name": "Sunscreen", "packed": true}
            ]
        },
        "photoGallery": [],
        "chatMessages": []
    });

    match value {
        serde_json::Value::Object(map) => map,
        _ => Document::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTIONS: [&str; 8] = [
        "tripInfo",
        "flightData",
        "hotelData",
        "itinerary",
        "activities",
        "packingList",
        "photoGallery",
        "chatMessages",
    ];

    #[test]
    fn test_demo_has_every_section() {
        let demo = demo_document();
        for section in SECTIONS {
            assert!(demo.contains_key(section), "missing section: {}", section);
        }
    }

    #[test]
    fn test_demo_is_deterministic() {
        assert_eq!(demo_document(), demo_document());
    }

    #[test]
    fn test_demo_is_renderable_without_live_data() {
        let demo = demo_document();
        assert!(!demo["tripInfo"]["title"].as_str().unwrap_or("").is_empty());
        assert!(demo["itinerary"].as_array().is_some_and(|days| !days.is_empty()));
    }
}
