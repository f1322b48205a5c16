//! # Metadata normalization
//!
//! Photo metadata arrives as a JSON body, as loose multipart text fields, or
//! as a JSON object packed into a multipart `metadata` field. Everything is
//! funnelled through [`normalize`] into a typed [`PhotoDraft`] before any
//! validation runs, so the coercion rules live in exactly one place.

use chrono::{DateTime, NaiveDate};
use domains::{PhotoId, ValidationErrors};
use serde_json::{Map, Value};

/// String encodings accepted as boolean `true` (case-insensitive, trimmed).
pub const TRUE_ENCODINGS: &[&str] = &["true", "1", "on", "yes"];
/// String encodings accepted as boolean `false` (case-insensitive, trimmed).
pub const FALSE_ENCODINGS: &[&str] = &["false", "0", "off", "no", ""];

/// Keys clients may set. Anything else (imageUrl, visits, createdBy, ...)
/// is dropped silently.
pub const ACCEPTED_FIELDS: &[&str] = &[
    "title",
    "subtitle",
    "descriptionMd",
    "alt",
    "location",
    "takenDate",
    "tags",
    "featured",
    "isVisible",
    "order",
];

/// Multipart field holding a JSON object of metadata.
pub const METADATA_FIELD: &str = "metadata";

/// A field as supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    /// Not present; leave the stored value alone.
    #[default]
    Absent,
    /// Present but null or blank.
    Clear,
    Set(T),
}

impl<T> Field<T> {
    #[cfg(test)]
    pub(crate) fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(v) => Some(v),
            _ => None,
        }
    }
}

/// Strongly typed metadata, pre-validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhotoDraft {
    pub title: Field<String>,
    pub subtitle: Field<String>,
    pub description_md: Field<String>,
    pub alt: Field<String>,
    pub location: Field<String>,
    pub tags: Field<Vec<String>>,
    pub taken_date: Field<NaiveDate>,
    pub featured: Field<bool>,
    pub is_visible: Field<bool>,
    pub order: Field<i32>,
}

/// Booleans: JSON booleans, the integers 0/1 and the string table above.
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            if TRUE_ENCODINGS.contains(&s.as_str()) {
                Some(true)
            } else if FALSE_ENCODINGS.contains(&s.as_str()) {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Non-negative integer from a JSON number or a numeric string.
pub fn coerce_order(value: &Value) -> Option<i32> {
    let n = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    if n < 0 {
        return None;
    }
    i32::try_from(n).ok()
}

/// A boolean that must be present, e.g. `isVisible` on the visibility toggle.
pub fn require_bool(value: Option<&Value>, field: &str) -> Result<bool, ValidationErrors> {
    value
        .and_then(coerce_bool)
        .ok_or_else(|| ValidationErrors::single(field, format!("{field} must be a boolean")))
}

/// An optional order; `null` counts as absent.
pub fn optional_order(value: Option<&Value>, field: &str) -> Result<Option<i32>, ValidationErrors> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => coerce_order(v).map(Some).ok_or_else(|| {
            ValidationErrors::single(field, format!("{field} must be an integer >= 0"))
        }),
    }
}

/// Merges multipart text fields with the optional `metadata` JSON object.
/// Individually sent fields take precedence over keys inside `metadata`.
pub fn collect_fields(
    mut fields: Map<String, Value>,
    metadata: Option<&str>,
) -> Result<Map<String, Value>, ValidationErrors> {
    let Some(raw) = metadata.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(fields);
    };
    let parsed: Value = serde_json::from_str(raw).map_err(|_| {
        ValidationErrors::single(METADATA_FIELD, "metadata must be a JSON object")
    })?;
    let Value::Object(meta) = parsed else {
        return Err(ValidationErrors::single(
            METADATA_FIELD,
            "metadata must be a JSON object",
        ));
    };
    for (key, value) in meta {
        if ACCEPTED_FIELDS.contains(&key.as_str()) && !fields.contains_key(&key) {
            fields.insert(key, value);
        }
    }
    Ok(fields)
}

/// Coerces every accepted key into its typed form. Collects all failures.
pub fn normalize(fields: &Map<String, Value>) -> Result<PhotoDraft, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let draft = PhotoDraft {
        title: text(fields, "title", &mut errors),
        subtitle: text(fields, "subtitle", &mut errors),
        description_md: text(fields, "descriptionMd", &mut errors),
        alt: text(fields, "alt", &mut errors),
        location: text(fields, "location", &mut errors),
        tags: tags(fields, &mut errors),
        taken_date: taken_date(fields, &mut errors),
        featured: boolean(fields, "featured", &mut errors),
        is_visible: boolean(fields, "isVisible", &mut errors),
        order: match optional_order(fields.get("order"), "order") {
            Ok(Some(order)) => Field::Set(order),
            Ok(None) => Field::Absent,
            Err(e) => {
                errors.push("order", e.to_string());
                Field::Absent
            }
        },
    };
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(draft)
}

fn text(fields: &Map<String, Value>, key: &str, errors: &mut ValidationErrors) -> Field<String> {
    match fields.get(key) {
        None => Field::Absent,
        Some(Value::Null) => Field::Clear,
        Some(Value::String(s)) => match s.trim() {
            "" => Field::Clear,
            trimmed => Field::Set(trimmed.to_string()),
        },
        Some(_) => {
            errors.push(key, format!("{key} must be a string"));
            Field::Absent
        }
    }
}

fn tags(fields: &Map<String, Value>, errors: &mut ValidationErrors) -> Field<Vec<String>> {
    match fields.get("tags") {
        None => Field::Absent,
        Some(Value::Null) => Field::Set(Vec::new()),
        Some(Value::String(s)) => Field::Set(split_tags(s)),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
                    Value::String(_) => {}
                    _ => {
                        errors.push("tags", "tags must be strings");
                        return Field::Absent;
                    }
                }
            }
            Field::Set(out)
        }
        Some(_) => {
            errors.push("tags", "tags must be a list or a comma-separated string");
            Field::Absent
        }
    }
}

/// `"a, b,,c "` → `["a", "b", "c"]`.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn taken_date(fields: &Map<String, Value>, errors: &mut ValidationErrors) -> Field<NaiveDate> {
    match fields.get("takenDate") {
        None => Field::Absent,
        Some(Value::Null) => Field::Clear,
        Some(Value::String(s)) if s.trim().is_empty() => Field::Clear,
        Some(Value::String(s)) => match parse_calendar_date(s) {
            Some(date) => Field::Set(date),
            None => {
                errors.push("takenDate", "takenDate must be a calendar date (YYYY-MM-DD)");
                Field::Absent
            }
        },
        Some(_) => {
            errors.push("takenDate", "takenDate must be a calendar date (YYYY-MM-DD)");
            Field::Absent
        }
    }
}

/// `YYYY-MM-DD`, or an RFC 3339 timestamp whose date part is kept.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn boolean(fields: &Map<String, Value>, key: &str, errors: &mut ValidationErrors) -> Field<bool> {
    match fields.get(key) {
        None | Some(Value::Null) => Field::Absent,
        Some(v) => match coerce_bool(v) {
            Some(b) => Field::Set(b),
            None => {
                errors.push(key, format!("{key} must be a boolean"));
                Field::Absent
            }
        },
    }
}

/// One `{id, order}` pair of a reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderItem {
    pub id: PhotoId,
    pub order: i32,
}

/// Parses `items: [{id, order}]`; the list must be non-empty.
pub fn reorder_items(items: Option<&Value>) -> Result<Vec<ReorderItem>, ValidationErrors> {
    let Some(Value::Array(items)) = items else {
        return Err(ValidationErrors::single("items", "items must be a non-empty list"));
    };
    if items.is_empty() {
        return Err(ValidationErrors::single("items", "items must be a non-empty list"));
    }
    let mut errors = ValidationErrors::new();
    let mut parsed = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let id = item
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<PhotoId>().ok());
        let order = item.get("order").and_then(coerce_order);
        match (id, order) {
            (Some(id), Some(order)) => parsed.push(ReorderItem { id, order }),
            (None, _) => errors.push(&format!("items[{i}].id"), "invalid photo id"),
            (_, None) => errors.push(&format!("items[{i}].order"), "order must be an integer >= 0"),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(parsed)
}
