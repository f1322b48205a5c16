//! # Ports
//!
//! Any adapter must implement these traits to be wired into the binary.
//! Services hold them as `Arc<dyn Trait>`, so every trait is object safe.

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{RepoError, Result};
use crate::models::{AdminUser, Photo, PhotoHistoryEntry, PhotoId, Principal};
use crate::query::{PageRequest, PhotoChanges, PhotoQuery};
use crate::upload::{ImageUpload, StoredImage};

/// Persistence contract for photo records.
///
/// Every mutating method is a single atomic update of one record, so no
/// caller needs a read-modify-write cycle.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PhotoRepository: Send + Sync {
    async fn insert(&self, photo: &Photo) -> std::result::Result<(), RepoError>;

    async fn find_by_id(&self, id: PhotoId) -> std::result::Result<Option<Photo>, RepoError>;

    /// Overwrites the fields present in `changes`, bumps `updatedAt` and
    /// returns the new record, or `None` when the photo does not exist.
    async fn update(
        &self,
        id: PhotoId,
        changes: &PhotoChanges,
    ) -> std::result::Result<Option<Photo>, RepoError>;

    /// Highest `order` among featured photos.
    async fn max_featured_order(&self) -> std::result::Result<Option<i32>, RepoError>;

    /// Sets `order` and `featured = true` unless the photo already has both.
    /// Returns whether a record was changed.
    async fn reorder(&self, id: PhotoId, order: i32) -> std::result::Result<bool, RepoError>;

    /// Increments `visits` only when the photo is visible and not archived;
    /// returns the post-increment count.
    async fn increment_visits(&self, id: PhotoId) -> std::result::Result<Option<i64>, RepoError>;

    /// Matching page plus the total number of matches.
    async fn list(&self, query: &PhotoQuery) -> std::result::Result<(Vec<Photo>, u64), RepoError>;
}

/// Append-only audit ledger.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn append(&self, entry: &PhotoHistoryEntry) -> std::result::Result<(), RepoError>;

    /// Entries for one photo, newest first.
    async fn list_for_photo(
        &self,
        photo_id: PhotoId,
        page: PageRequest,
    ) -> std::result::Result<(Vec<PhotoHistoryEntry>, u64), RepoError>;
}

/// Credential store.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Exact username match OR exact (already normalized) email match.
    async fn find_by_login(
        &self,
        username: &str,
        email: &str,
    ) -> std::result::Result<Option<AdminUser>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> std::result::Result<Option<AdminUser>, RepoError>;

    async fn insert(&self, user: &AdminUser) -> std::result::Result<(), RepoError>;

    /// Best effort: implementations log and swallow their own failures.
    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>);
}

/// Memory-hard password hashing.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;

    /// `false` for a mismatch and for an unparsable stored hash alike.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Signed, time-limited session tokens.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenService: Send + Sync {
    fn issue(&self, user: &AdminUser) -> Result<String>;

    /// Any failure (malformed, bad signature, expired) is `Unauthenticated`.
    fn verify(&self, token: &str) -> Result<Principal>;
}

/// What the captcha provider reported for a token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CaptchaVerdict {
    pub success: bool,
    pub hostname: Option<String>,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str, remote_ip: Option<IpAddr>) -> Result<CaptchaVerdict>;
}

/// Media storage contract for uploaded images.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Persists the bytes under a fresh, collision-resistant name.
    async fn store(&self, upload: ImageUpload) -> std::result::Result<StoredImage, RepoError>;

    /// Best effort removal of a previously stored file; never fails the caller.
    async fn delete_by_url(&self, url: &str) -> bool;
}

/// Bounds how often one client can bump one photo's visit counter.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait VisitLimiter: Send + Sync {
    /// `true` when this hit opens a new window and should be counted.
    fn should_count(&self, client_key: &str, photo_id: &str) -> bool;
}
