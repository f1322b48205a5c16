//! # Domain Models
//!
//! These structs represent the core entities of Folio.
//! We use UUID v7 for time-ordered, globally unique identification.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Opaque photo identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(Uuid);

impl PhotoId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PhotoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PhotoId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Denormalized `(id, username)` snapshot of whoever performed an action.
/// Renaming the account later does not rewrite these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub username: String,
}

/// A single uploaded image and its public-facing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: PhotoId,
    pub title: String,
    pub subtitle: Option<String>,
    pub description_md: String,
    /// Falls back to the title when not supplied.
    pub alt: String,
    pub location: Option<String>,
    pub tags: Vec<String>,
    pub taken_date: Option<NaiveDate>,
    /// Computed by the server from the stored file; never client-supplied.
    pub image_url: String,
    pub featured: bool,
    /// Manual carousel position. Always 0 while `featured` is false.
    pub order: i32,
    pub is_visible: bool,
    /// Soft-delete marker.
    pub is_archived: bool,
    pub visits: i64,
    pub created_by: Option<Actor>,
    pub uploaded_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Photo {
    /// Whether anonymous callers may see this photo.
    pub fn is_public(&self) -> bool {
        self.is_visible && !self.is_archived
    }
}

/// The closed set of administrative actions recorded in the history ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Create,
    Update,
    ToggleVisibility,
    ToggleFeatured,
    Reorder,
    /// Archive and unarchive; photos are never hard-deleted.
    Delete,
}

impl HistoryAction {
    pub const ALL: [HistoryAction; 6] = [
        Self::Create,
        Self::Update,
        Self::ToggleVisibility,
        Self::ToggleFeatured,
        Self::Reorder,
        Self::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::ToggleVisibility => "toggle_visibility",
            Self::ToggleFeatured => "toggle_featured",
            Self::Reorder => "reorder",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for HistoryAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown history action `{s}`"))
    }
}

/// Immutable audit record of one administrative mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoHistoryEntry {
    pub id: Uuid,
    /// `None` for bulk operations (reorder) that are not tied to one photo.
    pub photo_id: Option<PhotoId>,
    pub action: HistoryAction,
    pub by: Option<Actor>,
    /// Either a `{field: {from, to}}` diff or an action-specific snapshot.
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl PhotoHistoryEntry {
    pub fn record(
        photo_id: Option<PhotoId>,
        action: HistoryAction,
        by: Option<Actor>,
        payload: Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            photo_id,
            action,
            by,
            payload,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

/// Operator account. Created out-of-band by the `seed` binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: Uuid,
    pub username: String,
    /// Stored trimmed and lower-cased.
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl AdminUser {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// The subset of an account that is ever sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

/// The authenticated caller, as extracted from a verified session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            username: self.username.clone(),
        }
    }
}
