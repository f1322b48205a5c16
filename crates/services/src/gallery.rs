//! # Public gallery
//!
//! Read-side queries for anonymous visitors plus the rate-limited visit
//! counter. Hidden and archived photos are indistinguishable from missing
//! ones.

use std::sync::Arc;

use domains::{
    DomainError, PageRequest, Paginated, Photo, PhotoFilter, PhotoQuery, PhotoRepository,
    Result, SortKey, VisitLimiter,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::photos::parse_photo_id;

/// Listing query string. Every value is kept raw so a malformed parameter
/// degrades to its default instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub q: Option<String>,
    pub tag: Option<String>,
    pub featured: Option<String>,
    pub is_visible: Option<String>,
    pub is_archived: Option<String>,
}

impl ListParams {
    fn base_filter(&self) -> PhotoFilter {
        PhotoFilter {
            text: non_blank(self.q.as_deref()),
            tag: non_blank(self.tag.as_deref()),
            featured: strict_bool(self.featured.as_deref()),
            ..PhotoFilter::default()
        }
    }

    /// Visibility and archive parameters are ignored.
    pub fn to_public_query(&self) -> PhotoQuery {
        PhotoQuery {
            filter: self.base_filter().into_public(),
            sort: SortKey::parse(self.sort.as_deref()),
            page: PageRequest::public(self.page.as_deref(), self.limit.as_deref()),
        }
    }

    /// Archived photos are hidden unless `isArchived=true` (only archived)
    /// or `isArchived=all`.
    pub fn to_admin_query(&self) -> PhotoQuery {
        let is_archived = match self.is_archived.as_deref().map(str::trim) {
            Some("all") => None,
            Some("true") => Some(true),
            _ => Some(false),
        };
        PhotoQuery {
            filter: PhotoFilter {
                is_visible: strict_bool(self.is_visible.as_deref()),
                is_archived,
                ..self.base_filter()
            },
            sort: SortKey::parse(self.sort.as_deref()),
            page: PageRequest::public(self.page.as_deref(), self.limit.as_deref()),
        }
    }
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Only the literal strings `true` and `false`; anything else means "no filter".
fn strict_bool(s: Option<&str>) -> Option<bool> {
    match s.map(str::trim) {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

/// Result of `POST /public/photos/{id}/visit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitOutcome {
    pub ok: bool,
    pub visits_incremented: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visits: Option<i64>,
}

pub struct GalleryService {
    photos: Arc<dyn PhotoRepository>,
    limiter: Arc<dyn VisitLimiter>,
}

impl GalleryService {
    pub fn new(photos: Arc<dyn PhotoRepository>, limiter: Arc<dyn VisitLimiter>) -> Self {
        Self { photos, limiter }
    }

    pub async fn list(&self, params: &ListParams) -> Result<Paginated<Photo>> {
        let query = params.to_public_query();
        let (items, total) = self.photos.list(&query).await?;
        Ok(Paginated::new(items, query.page, total))
    }

    pub async fn detail(&self, raw_id: &str) -> Result<Photo> {
        let id = parse_photo_id(raw_id)?;
        self.photos
            .find_by_id(id)
            .await?
            .filter(Photo::is_public)
            .ok_or(DomainError::NotFound("photo"))
    }

    pub async fn visit(&self, raw_id: &str, client_ip: &str) -> Result<VisitOutcome> {
        let id = parse_photo_id(raw_id)?;
        if !self.limiter.should_count(client_ip, &id.to_string()) {
            debug!(photo_id = %id, "visit suppressed by limiter");
            return Ok(VisitOutcome {
                ok: true,
                visits_incremented: false,
                visits: None,
            });
        }
        let visits = self
            .photos
            .increment_visits(id)
            .await?
            .ok_or(DomainError::NotFound("photo"))?;
        Ok(VisitOutcome {
            ok: true,
            visits_incremented: true,
            visits: Some(visits),
        })
    }
}
