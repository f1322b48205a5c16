//! # In-memory adapters
//!
//! `DashMap`-backed implementations of the persistence ports. Used by the
//! test suites and by `FOLIO__DATABASE__BACKEND=memory` local runs; state is
//! lost on restart.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{
    AdminUser, HistoryRepository, PageRequest, Photo, PhotoChanges, PhotoHistoryEntry, PhotoId,
    PhotoQuery, PhotoRepository, RepoError, SortKey, UserRepository,
};
use uuid::Uuid;

/// Lower-cased alphanumeric words, the same split Postgres' `simple`
/// text search configuration produces for plain text.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Every query term must appear as a word of title, subtitle or location.
fn matches_text(photo: &Photo, query: &str) -> bool {
    let mut haystack = tokenize(&photo.title);
    if let Some(subtitle) = &photo.subtitle {
        haystack.extend(tokenize(subtitle));
    }
    if let Some(location) = &photo.location {
        haystack.extend(tokenize(location));
    }
    let terms = tokenize(query);
    !terms.is_empty() && terms.iter().all(|t| haystack.contains(t))
}

/// `None` sorts after every date regardless of direction.
fn cmp_taken(a: &Photo, b: &Photo, descending: bool) -> Ordering {
    match (a.taken_date, b.taken_date) {
        (Some(x), Some(y)) if descending => y.cmp(&x),
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare(sort: SortKey, a: &Photo, b: &Photo) -> Ordering {
    let primary = match sort {
        SortKey::Newest => b.uploaded_date.cmp(&a.uploaded_date),
        SortKey::Oldest => a.uploaded_date.cmp(&b.uploaded_date),
        SortKey::TakenDesc => cmp_taken(a, b, true),
        SortKey::TakenAsc => cmp_taken(a, b, false),
        SortKey::Relevant => b.visits.cmp(&a.visits),
    };
    primary.then_with(|| b.id.cmp(&a.id))
}

fn page_of<T>(mut items: Vec<T>, page: PageRequest) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let start = usize::try_from(page.offset()).unwrap_or(usize::MAX).min(items.len());
    let end = start.saturating_add(page.limit as usize).min(items.len());
    (items.drain(start..end).collect(), total)
}

#[derive(Default)]
pub struct MemoryPhotoRepository {
    photos: DashMap<PhotoId, Photo>,
}

impl MemoryPhotoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PhotoRepository for MemoryPhotoRepository {
    async fn insert(&self, photo: &Photo) -> Result<(), RepoError> {
        match self.photos.entry(photo.id) {
            Entry::Occupied(_) => Err(RepoError::Conflict(format!("photo {} exists", photo.id))),
            Entry::Vacant(slot) => {
                slot.insert(photo.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: PhotoId) -> Result<Option<Photo>, RepoError> {
        Ok(self.photos.get(&id).map(|p| p.clone()))
    }

    async fn update(
        &self,
        id: PhotoId,
        changes: &PhotoChanges,
    ) -> Result<Option<Photo>, RepoError> {
        Ok(self.photos.get_mut(&id).map(|mut p| {
            changes.apply_to(&mut p);
            p.clone()
        }))
    }

    async fn max_featured_order(&self) -> Result<Option<i32>, RepoError> {
        Ok(self
            .photos
            .iter()
            .filter(|p| p.featured)
            .map(|p| p.order)
            .max())
    }

    async fn reorder(&self, id: PhotoId, order: i32) -> Result<bool, RepoError> {
        let Some(mut photo) = self.photos.get_mut(&id) else {
            return Ok(false);
        };
        if photo.featured && photo.order == order {
            return Ok(false);
        }
        photo.featured = true;
        photo.order = order;
        photo.updated_at = Utc::now();
        Ok(true)
    }

    async fn increment_visits(&self, id: PhotoId) -> Result<Option<i64>, RepoError> {
        Ok(self
            .photos
            .get_mut(&id)
            .filter(|p| p.is_public())
            .map(|mut p| {
                p.visits += 1;
                p.visits
            }))
    }

    async fn list(&self, query: &PhotoQuery) -> Result<(Vec<Photo>, u64), RepoError> {
        let filter = &query.filter;
        let mut matched: Vec<Photo> = self
            .photos
            .iter()
            .filter(|p| filter.matches_fields(p))
            .filter(|p| filter.text.as_deref().is_none_or(|q| matches_text(p, q)))
            .map(|p| p.clone())
            .collect();
        matched.sort_by(|a, b| compare(query.sort, a, b));
        Ok(page_of(matched, query.page))
    }
}

#[derive(Default)]
pub struct MemoryHistoryRepository {
    entries: DashMap<Uuid, PhotoHistoryEntry>,
}

impl MemoryHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry, newest first, including those without a photo.
    pub fn all(&self) -> Vec<PhotoHistoryEntry> {
        let mut all: Vec<_> = self.entries.iter().map(|e| e.clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        all
    }
}

#[async_trait]
impl HistoryRepository for MemoryHistoryRepository {
    async fn append(&self, entry: &PhotoHistoryEntry) -> Result<(), RepoError> {
        match self.entries.entry(entry.id) {
            Entry::Occupied(_) => Err(RepoError::Conflict(format!("entry {} exists", entry.id))),
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
                Ok(())
            }
        }
    }

    async fn list_for_photo(
        &self,
        photo_id: PhotoId,
        page: PageRequest,
    ) -> Result<(Vec<PhotoHistoryEntry>, u64), RepoError> {
        let entries: Vec<_> = self
            .all()
            .into_iter()
            .filter(|e| e.photo_id == Some(photo_id))
            .collect();
        Ok(page_of(entries, page))
    }
}

#[derive(Default)]
pub struct MemoryUserRepository {
    users: DashMap<Uuid, AdminUser>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_login(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<AdminUser>, RepoError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username == username || u.email == email)
            .map(|u| u.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AdminUser>, RepoError> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn insert(&self, user: &AdminUser) -> Result<(), RepoError> {
        if self
            .users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(RepoError::Conflict(format!("user {} exists", user.username)));
        }
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) {
        if let Some(mut user) = self.users.get_mut(&id) {
            user.last_login = Some(at);
        }
    }
}
