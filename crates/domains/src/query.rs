//! # Queries
//!
//! Filter, sort and pagination types shared by the listing endpoints and
//! every `PhotoRepository` implementation, plus the partial-update set
//! used by the administration service.

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::models::Photo;

/// Listing order. Unknown keys fall back to `Newest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// `uploadedDate` descending.
    #[default]
    Newest,
    /// `uploadedDate` ascending.
    Oldest,
    /// `takenDate` descending, undated photos last.
    TakenDesc,
    /// `takenDate` ascending, undated photos last.
    TakenAsc,
    /// `visits` descending.
    Relevant,
}

impl SortKey {
    /// Case-sensitive; anything unrecognised (or absent) is `Newest`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("oldest") => Self::Oldest,
            Some("taken-desc") => Self::TakenDesc,
            Some("taken-asc") => Self::TakenAsc,
            Some("relevant") => Self::Relevant,
            _ => Self::Newest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::TakenDesc => "taken-desc",
            Self::TakenAsc => "taken-asc",
            Self::Relevant => "relevant",
        }
    }
}

/// A clamped page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const PUBLIC_DEFAULT_LIMIT: u32 = 16;
    pub const PUBLIC_MAX_LIMIT: u32 = 50;
    pub const HISTORY_DEFAULT_LIMIT: u32 = 20;
    pub const HISTORY_MAX_LIMIT: u32 = 100;

    /// Lenient parse of raw query values: unparsable or zero values fall back
    /// to the defaults, everything else is clamped into range.
    pub fn from_query(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: u32,
        max_limit: u32,
    ) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p != 0)
            .unwrap_or(1)
            .clamp(1, i64::from(u32::MAX));
        let limit = limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l != 0)
            .unwrap_or(i64::from(default_limit))
            .clamp(1, i64::from(max_limit.max(1)));
        Self {
            page: u32::try_from(page).unwrap_or(1),
            limit: u32::try_from(limit).unwrap_or(default_limit),
        }
    }

    pub fn public(page: Option<&str>, limit: Option<&str>) -> Self {
        Self::from_query(page, limit, Self::PUBLIC_DEFAULT_LIMIT, Self::PUBLIC_MAX_LIMIT)
    }

    pub fn history(page: Option<&str>, limit: Option<&str>) -> Self {
        Self::from_query(page, limit, Self::HISTORY_DEFAULT_LIMIT, Self::HISTORY_MAX_LIMIT)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::PUBLIC_DEFAULT_LIMIT,
        }
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            items,
            page: request.page,
            limit: request.limit,
            total_items,
            total_pages: total_items.div_ceil(u64::from(request.limit)),
        }
    }
}

/// Photo listing predicates. `None` means "do not filter on this field".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoFilter {
    /// Free text over title, subtitle and location.
    pub text: Option<String>,
    pub tag: Option<String>,
    pub featured: Option<bool>,
    pub is_visible: Option<bool>,
    pub is_archived: Option<bool>,
}

impl PhotoFilter {
    /// Pins the public base predicate; caller-supplied visibility and
    /// archive filters are discarded.
    pub fn into_public(self) -> Self {
        Self {
            is_visible: Some(true),
            is_archived: Some(false),
            ..self
        }
    }

    /// Structured predicates only; text matching is left to the store.
    pub fn matches_fields(&self, photo: &Photo) -> bool {
        self.tag
            .as_ref()
            .is_none_or(|tag| photo.tags.iter().any(|t| t == tag))
            && self.featured.is_none_or(|f| photo.featured == f)
            && self.is_visible.is_none_or(|v| photo.is_visible == v)
            && self.is_archived.is_none_or(|a| photo.is_archived == a)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoQuery {
    pub filter: PhotoFilter,
    pub sort: SortKey,
    pub page: PageRequest,
}

/// Fields to overwrite on a single photo. Nested options distinguish
/// "leave untouched" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoChanges {
    pub title: Option<String>,
    pub subtitle: Option<Option<String>>,
    pub description_md: Option<String>,
    pub alt: Option<String>,
    pub location: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub taken_date: Option<Option<NaiveDate>>,
    pub image_url: Option<String>,
    pub featured: Option<bool>,
    pub order: Option<i32>,
    pub is_visible: Option<bool>,
    pub is_archived: Option<bool>,
}

impl PhotoChanges {
    /// In-place merge, used by stores without a native partial update.
    pub fn apply_to(&self, photo: &mut Photo) {
        if let Some(title) = &self.title {
            photo.title = title.clone();
        }
        if let Some(subtitle) = &self.subtitle {
            photo.subtitle = subtitle.clone();
        }
        if let Some(description) = &self.description_md {
            photo.description_md = description.clone();
        }
        if let Some(alt) = &self.alt {
            photo.alt = alt.clone();
        }
        if let Some(location) = &self.location {
            photo.location = location.clone();
        }
        if let Some(tags) = &self.tags {
            photo.tags = tags.clone();
        }
        if let Some(taken_date) = self.taken_date {
            photo.taken_date = taken_date;
        }
        if let Some(image_url) = &self.image_url {
            photo.image_url = image_url.clone();
        }
        if let Some(featured) = self.featured {
            photo.featured = featured;
        }
        if let Some(order) = self.order {
            photo.order = order;
        }
        if let Some(is_visible) = self.is_visible {
            photo.is_visible = is_visible;
        }
        if let Some(is_archived) = self.is_archived {
            photo.is_archived = is_archived;
        }
        photo.updated_at = Utc::now();
    }
}
