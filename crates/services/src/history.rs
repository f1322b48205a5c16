//! # History payloads
//!
//! Builders for the JSON payload stored with each ledger entry.

use domains::{Photo, PhotoChanges};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Accumulates the effective changes of an update together with the
/// `{field: {from, to}}` diff recorded in the ledger.
#[derive(Debug, Default)]
pub struct Diff {
    pub changes: PhotoChanges,
    fields: Map<String, Value>,
}

impl Diff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `field` when `from != to`; returns whether it did.
    pub fn track<T: PartialEq + Serialize>(&mut self, field: &str, from: &T, to: &T) -> bool {
        if from == to {
            return false;
        }
        self.fields.insert(
            field.to_string(),
            json!({ "from": to_value(from), "to": to_value(to) }),
        );
        true
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn changed(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// `{changes: {...}}`
    pub fn payload(&self) -> Value {
        json!({ "changes": Value::Object(self.fields.clone()) })
    }
}

fn to_value<T: Serialize>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}

pub fn create_snapshot(photo: &Photo) -> Value {
    json!({
        "title": photo.title,
        "isVisible": photo.is_visible,
        "featured": photo.featured,
        "tags": photo.tags,
        "takenDate": photo.taken_date,
    })
}

pub fn visibility_payload(from: bool, to: bool) -> Value {
    json!({ "from": from, "to": to })
}

pub fn featured_payload(from: (bool, i32), to: (bool, i32)) -> Value {
    json!({
        "from": { "featured": from.0, "order": from.1 },
        "to": { "featured": to.0, "order": to.1 },
    })
}

pub fn archive_payload(archived: bool, was_visible: bool) -> Value {
    json!({ "archived": archived, "wasVisible": was_visible })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_skips_equal_values() {
        let mut diff = Diff::new();
        assert!(!diff.track("title", &"a", &"a"));
        assert!(diff.is_empty());
        assert!(diff.track("subtitle", &None::<String>, &Some("b".to_string())));
        assert!(diff.changed("subtitle"));
        assert_eq!(
            diff.payload(),
            json!({ "changes": { "subtitle": { "from": null, "to": "b" } } })
        );
    }

    #[test]
    fn featured_payload_shape() {
        assert_eq!(
            featured_payload((false, 0), (true, 3)),
            json!({
                "from": { "featured": false, "order": 0 },
                "to": { "featured": true, "order": 3 }
            })
        );
    }
}
