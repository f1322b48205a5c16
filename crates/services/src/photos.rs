//! # Photo administration
//!
//! Every mutation here is performed on behalf of an authenticated admin and,
//! when it changes persisted state, appends exactly one ledger entry before
//! returning. A failed ledger write fails the request.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    DomainError, HistoryAction, HistoryRepository, ImageUpload, MediaStorage, PageRequest,
    Paginated, Photo, PhotoChanges, PhotoHistoryEntry, PhotoId, PhotoRepository, Principal,
    Result,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::gallery::ListParams;
use crate::history::{self, Diff};
use crate::metadata::{self, Field};
use crate::validation::{self, PhotoEdit};

/// Raw create/update input as it came off the wire.
#[derive(Debug, Clone, Default)]
pub struct PhotoInput {
    /// JSON body or multipart text fields.
    pub fields: Map<String, Value>,
    /// Contents of the multipart `metadata` field.
    pub metadata: Option<String>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReorderOutcome {
    pub ok: bool,
    pub updated: u32,
}

pub(crate) fn parse_photo_id(raw: &str) -> Result<PhotoId> {
    raw.parse().map_err(|_| DomainError::NotFound("photo"))
}

pub struct PhotoAdminService {
    photos: Arc<dyn PhotoRepository>,
    history: Arc<dyn HistoryRepository>,
    media: Arc<dyn MediaStorage>,
}

impl PhotoAdminService {
    pub fn new(
        photos: Arc<dyn PhotoRepository>,
        history: Arc<dyn HistoryRepository>,
        media: Arc<dyn MediaStorage>,
    ) -> Self {
        Self {
            photos,
            history,
            media,
        }
    }

    pub async fn create(&self, actor: &Principal, input: PhotoInput) -> Result<Photo> {
        let fields = metadata::collect_fields(input.fields, input.metadata.as_deref())?;
        let validated = metadata::normalize(&fields).and_then(validation::validate_new);
        let (new_photo, mut errors) = match validated {
            Ok(p) => (Some(p), domains::ValidationErrors::new()),
            Err(e) => (None, e),
        };
        if input.image.is_none() {
            errors.push(domains::IMAGE_FIELD, "image is required");
        }
        let (Some(new_photo), Some(image)) = (new_photo, input.image) else {
            return Err(errors.into());
        };

        let order = match (new_photo.featured, new_photo.order) {
            (false, _) => 0,
            (true, Some(order)) => order,
            (true, None) => self.next_featured_order().await?,
        };

        let stored = self.media.store(image).await?;
        let now = Utc::now();
        let photo = Photo {
            id: PhotoId::new(),
            alt: new_photo.alt.unwrap_or_else(|| new_photo.title.clone()),
            title: new_photo.title,
            subtitle: new_photo.subtitle,
            description_md: new_photo.description_md,
            location: new_photo.location,
            tags: new_photo.tags,
            taken_date: new_photo.taken_date,
            image_url: stored.public_url,
            featured: new_photo.featured,
            order,
            is_visible: new_photo.is_visible,
            is_archived: false,
            visits: 0,
            created_by: Some(actor.actor()),
            uploaded_date: now,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.photos.insert(&photo).await {
            self.media.delete_by_url(&photo.image_url).await;
            return Err(e.into());
        }
        self.record(
            Some(photo.id),
            HistoryAction::Create,
            actor,
            history::create_snapshot(&photo),
        )
        .await?;

        info!(photo_id = %photo.id, file = %stored.filename, "photo created");
        Ok(photo)
    }

    pub async fn update(
        &self,
        actor: &Principal,
        raw_id: &str,
        input: PhotoInput,
    ) -> Result<Photo> {
        let id = parse_photo_id(raw_id)?;
        let current = self.find(id).await?;

        let fields = metadata::collect_fields(input.fields, input.metadata.as_deref())?;
        let edit = validation::validate_edit(metadata::normalize(&fields)?)?;
        let mut diff = self.diff_edit(&current, edit).await?;

        let mut stored_url = None;
        if let Some(image) = input.image {
            let stored = self.media.store(image).await?;
            if diff.track("imageUrl", &current.image_url, &stored.public_url) {
                diff.changes.image_url = Some(stored.public_url.clone());
            }
            stored_url = Some(stored.public_url);
        }

        if diff.is_empty() {
            if let Some(url) = stored_url {
                self.media.delete_by_url(&url).await;
            }
            return Ok(current);
        }

        let updated = match self.photos.update(id, &diff.changes).await {
            Ok(Some(photo)) => photo,
            outcome => {
                if let Some(url) = &stored_url {
                    self.media.delete_by_url(url).await;
                }
                return match outcome {
                    Err(e) => Err(e.into()),
                    _ => Err(DomainError::NotFound("photo")),
                };
            }
        };

        if stored_url.is_some() && !self.media.delete_by_url(&current.image_url).await {
            warn!(photo_id = %id, url = %current.image_url, "previous image was not removed");
        }

        self.record(Some(id), HistoryAction::Update, actor, diff.payload())
            .await?;
        info!(photo_id = %id, "photo updated");
        Ok(updated)
    }

    pub async fn set_visibility(
        &self,
        actor: &Principal,
        raw_id: &str,
        body: &Value,
    ) -> Result<Photo> {
        let id = parse_photo_id(raw_id)?;
        let visible = metadata::require_bool(body.get("isVisible"), "isVisible")?;
        let current = self.find(id).await?;
        if current.is_visible == visible {
            return Ok(current);
        }

        let changes = PhotoChanges {
            is_visible: Some(visible),
            ..PhotoChanges::default()
        };
        let updated = self.apply(id, &changes).await?;
        self.record(
            Some(id),
            HistoryAction::ToggleVisibility,
            actor,
            history::visibility_payload(current.is_visible, visible),
        )
        .await?;
        info!(photo_id = %id, visible, "visibility changed");
        Ok(updated)
    }

    pub async fn set_featured(
        &self,
        actor: &Principal,
        raw_id: &str,
        body: &Value,
    ) -> Result<Photo> {
        let id = parse_photo_id(raw_id)?;
        let featured = metadata::require_bool(body.get("featured"), "featured")?;
        let explicit_order = metadata::optional_order(body.get("order"), "order")?;
        let current = self.find(id).await?;

        let order = self.featured_order(&current, featured, explicit_order).await?;
        if current.featured == featured && current.order == order {
            return Ok(current);
        }

        let changes = PhotoChanges {
            featured: Some(featured),
            order: Some(order),
            ..PhotoChanges::default()
        };
        let updated = self.apply(id, &changes).await?;
        self.record(
            Some(id),
            HistoryAction::ToggleFeatured,
            actor,
            history::featured_payload((current.featured, current.order), (featured, order)),
        )
        .await?;
        info!(photo_id = %id, featured, order, "featured changed");
        Ok(updated)
    }

    /// Bulk carousel reorder. Unknown ids and entries already in place are
    /// skipped; one ledger entry covers the whole batch.
    pub async fn reorder(&self, actor: &Principal, body: &Value) -> Result<ReorderOutcome> {
        let items = metadata::reorder_items(body.get("items"))?;

        let mut updated = 0u32;
        for item in &items {
            if self.photos.reorder(item.id, item.order).await? {
                updated += 1;
            }
        }

        if updated > 0 {
            let listed: Vec<Value> = items
                .iter()
                .map(|i| json!({ "id": i.id, "order": i.order }))
                .collect();
            self.record(
                None,
                HistoryAction::Reorder,
                actor,
                json!({ "items": listed, "updated": updated }),
            )
            .await?;
        }
        info!(requested = items.len(), updated, "photos reordered");
        Ok(ReorderOutcome { ok: true, updated })
    }

    /// Soft delete. Archiving also hides the photo; unarchiving leaves
    /// visibility alone.
    pub async fn set_archived(
        &self,
        actor: &Principal,
        raw_id: &str,
        body: &Value,
    ) -> Result<Photo> {
        let id = parse_photo_id(raw_id)?;
        let archived = metadata::require_bool(body.get("isArchived"), "isArchived")?;
        let current = self.find(id).await?;
        if current.is_archived == archived {
            return Ok(current);
        }

        let changes = PhotoChanges {
            is_archived: Some(archived),
            is_visible: archived.then_some(false),
            ..PhotoChanges::default()
        };
        let updated = self.apply(id, &changes).await?;
        self.record(
            Some(id),
            HistoryAction::Delete,
            actor,
            history::archive_payload(archived, current.is_visible),
        )
        .await?;
        info!(photo_id = %id, archived, "archive flag changed");
        Ok(updated)
    }

    pub async fn history(
        &self,
        raw_id: &str,
        page: PageRequest,
    ) -> Result<Paginated<PhotoHistoryEntry>> {
        let id = parse_photo_id(raw_id)?;
        self.find(id).await?;
        let (items, total) = self.history.list_for_photo(id, page).await?;
        Ok(Paginated::new(items, page, total))
    }

    /// Admin listing: no implicit visibility filter.
    pub async fn list(&self, params: &ListParams) -> Result<Paginated<Photo>> {
        let query = params.to_admin_query();
        let (items, total) = self.photos.list(&query).await?;
        Ok(Paginated::new(items, query.page, total))
    }

    async fn find(&self, id: PhotoId) -> Result<Photo> {
        self.photos
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound("photo"))
    }

    async fn apply(&self, id: PhotoId, changes: &PhotoChanges) -> Result<Photo> {
        self.photos
            .update(id, changes)
            .await?
            .ok_or(DomainError::NotFound("photo"))
    }

    async fn record(
        &self,
        photo_id: Option<PhotoId>,
        action: HistoryAction,
        actor: &Principal,
        payload: Value,
    ) -> Result<()> {
        let entry = PhotoHistoryEntry::record(photo_id, action, Some(actor.actor()), payload);
        self.history.append(&entry).await?;
        Ok(())
    }

    async fn next_featured_order(&self) -> Result<i32> {
        Ok(self
            .photos
            .max_featured_order()
            .await?
            .map_or(0, |max| max.saturating_add(1)))
    }

    /// Explicit order wins; an already featured photo keeps its slot;
    /// newly featured photos go to the end; unfeatured photos sit at 0.
    async fn featured_order(
        &self,
        current: &Photo,
        featured: bool,
        explicit: Option<i32>,
    ) -> Result<i32> {
        match (featured, explicit) {
            (false, _) => Ok(0),
            (true, Some(order)) => Ok(order),
            (true, None) if current.featured => Ok(current.order),
            (true, None) => self.next_featured_order().await,
        }
    }

    async fn diff_edit(&self, current: &Photo, edit: PhotoEdit) -> Result<Diff> {
        let mut diff = Diff::new();

        if let Some(title) = edit.title {
            if diff.track("title", &current.title, &title) {
                diff.changes.title = Some(title);
            }
        }
        if let Some(subtitle) = edit.subtitle {
            if diff.track("subtitle", &current.subtitle, &subtitle) {
                diff.changes.subtitle = Some(subtitle);
            }
        }
        if let Some(description) = edit.description_md {
            if diff.track("descriptionMd", &current.description_md, &description) {
                diff.changes.description_md = Some(description);
            }
        }
        let alt = match edit.alt {
            Field::Absent => None,
            Field::Clear => Some(
                diff.changes
                    .title
                    .clone()
                    .unwrap_or_else(|| current.title.clone()),
            ),
            Field::Set(alt) => Some(alt),
        };
        if let Some(alt) = alt {
            if diff.track("alt", &current.alt, &alt) {
                diff.changes.alt = Some(alt);
            }
        }
        if let Some(location) = edit.location {
            if diff.track("location", &current.location, &location) {
                diff.changes.location = Some(location);
            }
        }
        if let Some(tags) = edit.tags {
            if diff.track("tags", &current.tags, &tags) {
                diff.changes.tags = Some(tags);
            }
        }
        if let Some(taken_date) = edit.taken_date {
            if diff.track("takenDate", &current.taken_date, &taken_date) {
                diff.changes.taken_date = Some(taken_date);
            }
        }
        if let Some(visible) = edit.is_visible {
            if diff.track("isVisible", &current.is_visible, &visible) {
                diff.changes.is_visible = Some(visible);
            }
        }
        if edit.featured.is_some() || edit.order.is_some() {
            let featured = edit.featured.unwrap_or(current.featured);
            let order = self.featured_order(current, featured, edit.order).await?;
            if diff.track("featured", &current.featured, &featured) {
                diff.changes.featured = Some(featured);
            }
            if diff.track("order", &current.order, &order) {
                diff.changes.order = Some(order);
            }
        }

        Ok(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use domains::{
        MockHistoryRepository, MockMediaStorage, MockPhotoRepository, RepoError, Role,
        StoredImage,
    };
    use mockall::predicate::*;
    use uuid::Uuid;

    fn admin() -> Principal {
        Principal {
            id: Uuid::now_v7(),
            username: "jona".into(),
            role: Role::Admin,
        }
    }

    fn photo() -> Photo {
        let now = Utc::now();
        Photo {
            id: PhotoId::new(),
            title: "Sunset".into(),
            subtitle: None,
            description_md: "desc".into(),
            alt: "Sunset".into(),
            location: None,
            tags: vec![],
            taken_date: None,
            image_url: "/uploads/photos/photo_1_aaaaaaaa.jpg".into(),
            featured: false,
            order: 0,
            is_visible: false,
            is_archived: false,
            visits: 0,
            created_by: None,
            uploaded_date: now,
            created_at: now,
            updated_at: now,
        }
    }

    fn image() -> ImageUpload {
        ImageUpload {
            bytes: Bytes::from_static(b"\xff\xd8\xff"),
            content_type: mime::IMAGE_JPEG,
            original_name: Some("x.jpg".into()),
        }
    }

    fn fields(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!("fixture must be an object"),
        }
    }

    fn storing(url: &'static str) -> MockMediaStorage {
        let mut media = MockMediaStorage::new();
        media.expect_store().times(1).returning(move |_| {
            Ok(StoredImage {
                filename: url.rsplit('/').next().unwrap_or_default().to_string(),
                public_url: url.to_string(),
            })
        });
        media
    }

    fn history_expecting(action: HistoryAction, times: usize) -> MockHistoryRepository {
        let mut history = MockHistoryRepository::new();
        history
            .expect_append()
            .withf(move |e| e.action == action)
            .times(times)
            .returning(|_| Ok(()));
        history
    }

    fn service(
        photos: MockPhotoRepository,
        history: MockHistoryRepository,
        media: MockMediaStorage,
    ) -> PhotoAdminService {
        PhotoAdminService::new(Arc::new(photos), Arc::new(history), Arc::new(media))
    }

    fn with_current(photos: &mut MockPhotoRepository, current: &Photo) {
        let found = current.clone();
        photos
            .expect_find_by_id()
            .with(eq(current.id))
            .returning(move |_| Ok(Some(found.clone())));
    }

    fn echo_update(photos: &mut MockPhotoRepository, current: &Photo) {
        let base = current.clone();
        photos.expect_update().times(1).returning(move |_, changes| {
            let mut p = base.clone();
            changes.apply_to(&mut p);
            Ok(Some(p))
        });
    }

    #[tokio::test]
    async fn create_defaults_to_hidden_and_records_history() {
        let mut photos = MockPhotoRepository::new();
        photos
            .expect_insert()
            .withf(|p| !p.is_visible && !p.featured && p.order == 0 && p.alt == "Sunset")
            .times(1)
            .returning(|_| Ok(()));
        let svc = service(
            photos,
            history_expecting(HistoryAction::Create, 1),
            storing("/uploads/photos/photo_1_deadbeef.jpg"),
        );

        let created = svc
            .create(
                &admin(),
                PhotoInput {
                    fields: fields(json!({ "title": "Sunset", "descriptionMd": "desc" })),
                    metadata: None,
                    image: Some(image()),
                },
            )
            .await
            .unwrap();
        assert_eq!(created.visits, 0);
        assert_eq!(created.image_url, "/uploads/photos/photo_1_deadbeef.jpg");
        assert_eq!(created.created_by.map(|a| a.username).as_deref(), Some("jona"));
    }

    #[tokio::test]
    async fn create_without_image_stores_nothing() {
        let svc = service(
            MockPhotoRepository::new(),
            MockHistoryRepository::new(),
            MockMediaStorage::new(),
        );
        let err = svc
            .create(
                &admin(),
                PhotoInput {
                    fields: fields(json!({ "title": "", "descriptionMd": "desc" })),
                    ..PhotoInput::default()
                },
            )
            .await
            .unwrap_err();
        let DomainError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(errors.contains("image"));
        assert!(errors.contains("title"));
    }

    #[tokio::test]
    async fn featured_create_goes_to_the_end() {
        let mut photos = MockPhotoRepository::new();
        photos.expect_max_featured_order().returning(|| Ok(Some(4)));
        photos
            .expect_insert()
            .withf(|p| p.featured && p.order == 5)
            .times(1)
            .returning(|_| Ok(()));
        let svc = service(
            photos,
            history_expecting(HistoryAction::Create, 1),
            storing("/uploads/photos/photo_2_deadbeef.png"),
        );
        svc.create(
            &admin(),
            PhotoInput {
                metadata: Some(r#"{"title":"T","descriptionMd":"D","featured":"on"}"#.into()),
                image: Some(image()),
                ..PhotoInput::default()
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn failed_insert_removes_the_stored_file() {
        let mut photos = MockPhotoRepository::new();
        photos
            .expect_insert()
            .returning(|_| Err(RepoError::Backend("down".into())));
        let mut media = storing("/uploads/photos/photo_3_deadbeef.jpg");
        media
            .expect_delete_by_url()
            .with(eq("/uploads/photos/photo_3_deadbeef.jpg"))
            .times(1)
            .return_const(true);
        let svc = service(photos, MockHistoryRepository::new(), media);
        let err = svc
            .create(
                &admin(),
                PhotoInput {
                    fields: fields(json!({ "title": "T", "descriptionMd": "D" })),
                    metadata: None,
                    image: Some(image()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Repository(_)));
    }

    #[tokio::test]
    async fn empty_update_is_a_no_op() {
        let current = photo();
        let mut photos = MockPhotoRepository::new();
        with_current(&mut photos, &current);
        photos.expect_update().never();
        let svc = service(photos, MockHistoryRepository::new(), MockMediaStorage::new());

        let same = svc
            .update(
                &admin(),
                &current.id.to_string(),
                PhotoInput {
                    fields: fields(json!({ "title": " Sunset ", "unknown": 1 })),
                    ..PhotoInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same, current);
    }

    #[tokio::test]
    async fn update_records_only_real_changes() {
        let current = photo();
        let mut photos = MockPhotoRepository::new();
        with_current(&mut photos, &current);
        echo_update(&mut photos, &current);
        let mut history = MockHistoryRepository::new();
        history
            .expect_append()
            .withf(|e| {
                e.action == HistoryAction::Update
                    && e.payload["changes"]["subtitle"]["to"] == json!("Golden")
                    && e.payload["changes"].get("title").is_none()
            })
            .times(1)
            .returning(|_| Ok(()));
        let svc = service(photos, history, MockMediaStorage::new());

        let updated = svc
            .update(
                &admin(),
                &current.id.to_string(),
                PhotoInput {
                    fields: fields(json!({ "title": "Sunset", "subtitle": "Golden" })),
                    ..PhotoInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.subtitle.as_deref(), Some("Golden"));
    }

    #[tokio::test]
    async fn new_image_replaces_and_removes_the_old_file() {
        let current = photo();
        let old_url = current.image_url.clone();
        let mut photos = MockPhotoRepository::new();
        with_current(&mut photos, &current);
        echo_update(&mut photos, &current);
        let mut media = storing("/uploads/photos/photo_9_cafebabe.webp");
        media
            .expect_delete_by_url()
            .withf(move |url| url == old_url)
            .times(1)
            .return_const(true);
        let svc = service(photos, history_expecting(HistoryAction::Update, 1), media);

        let updated = svc
            .update(
                &admin(),
                &current.id.to_string(),
                PhotoInput {
                    image: Some(image()),
                    ..PhotoInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.image_url, "/uploads/photos/photo_9_cafebabe.webp");
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let svc = service(
            MockPhotoRepository::new(),
            MockHistoryRepository::new(),
            MockMediaStorage::new(),
        );
        let err = svc
            .update(&admin(), "not-an-id", PhotoInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn explicit_order_overrides_existing_slot() {
        let mut current = photo();
        current.featured = true;
        current.order = 2;
        let mut photos = MockPhotoRepository::new();
        with_current(&mut photos, &current);
        echo_update(&mut photos, &current);
        let svc = service(
            photos,
            history_expecting(HistoryAction::ToggleFeatured, 1),
            MockMediaStorage::new(),
        );

        let updated = svc
            .set_featured(
                &admin(),
                &current.id.to_string(),
                &json!({ "featured": true, "order": 5 }),
            )
            .await
            .unwrap();
        assert_eq!(updated.order, 5);
    }

    #[tokio::test]
    async fn refeaturing_keeps_order_and_is_a_no_op() {
        let mut current = photo();
        current.featured = true;
        current.order = 2;
        let mut photos = MockPhotoRepository::new();
        with_current(&mut photos, &current);
        photos.expect_update().never();
        photos.expect_max_featured_order().never();
        let svc = service(photos, MockHistoryRepository::new(), MockMediaStorage::new());

        let same = svc
            .set_featured(&admin(), &current.id.to_string(), &json!({ "featured": "true" }))
            .await
            .unwrap();
        assert_eq!(same.order, 2);
    }

    #[tokio::test]
    async fn unfeaturing_resets_order() {
        let mut current = photo();
        current.featured = true;
        current.order = 7;
        let mut photos = MockPhotoRepository::new();
        with_current(&mut photos, &current);
        echo_update(&mut photos, &current);
        let mut history = MockHistoryRepository::new();
        history
            .expect_append()
            .withf(|e| e.payload == history::featured_payload((true, 7), (false, 0)))
            .times(1)
            .returning(|_| Ok(()));
        let svc = service(photos, history, MockMediaStorage::new());

        let updated = svc
            .set_featured(&admin(), &current.id.to_string(), &json!({ "featured": false }))
            .await
            .unwrap();
        assert!(!updated.featured);
        assert_eq!(updated.order, 0);
    }

    #[tokio::test]
    async fn featured_requires_a_boolean() {
        let svc = service(
            MockPhotoRepository::new(),
            MockHistoryRepository::new(),
            MockMediaStorage::new(),
        );
        let err = svc
            .set_featured(&admin(), &PhotoId::new().to_string(), &json!({ "featured": "sure" }))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn archiving_hides_the_photo() {
        let mut current = photo();
        current.is_visible = true;
        let mut photos = MockPhotoRepository::new();
        with_current(&mut photos, &current);
        echo_update(&mut photos, &current);
        let mut history = MockHistoryRepository::new();
        history
            .expect_append()
            .withf(|e| {
                e.action == HistoryAction::Delete
                    && e.payload == json!({ "archived": true, "wasVisible": true })
            })
            .times(1)
            .returning(|_| Ok(()));
        let svc = service(photos, history, MockMediaStorage::new());

        let archived = svc
            .set_archived(&admin(), &current.id.to_string(), &json!({ "isArchived": true }))
            .await
            .unwrap();
        assert!(archived.is_archived);
        assert!(!archived.is_visible);
    }

    #[tokio::test]
    async fn unchanged_visibility_writes_nothing() {
        let current = photo();
        let mut photos = MockPhotoRepository::new();
        with_current(&mut photos, &current);
        photos.expect_update().never();
        let svc = service(photos, MockHistoryRepository::new(), MockMediaStorage::new());
        svc.set_visibility(&admin(), &current.id.to_string(), &json!({ "isVisible": "0" }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ledger_failure_fails_the_request() {
        let current = photo();
        let mut photos = MockPhotoRepository::new();
        with_current(&mut photos, &current);
        echo_update(&mut photos, &current);
        let mut history = MockHistoryRepository::new();
        history
            .expect_append()
            .returning(|_| Err(RepoError::Backend("ledger down".into())));
        let svc = service(photos, history, MockMediaStorage::new());
        let err = svc
            .set_visibility(&admin(), &current.id.to_string(), &json!({ "isVisible": true }))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Repository(_)));
    }

    #[tokio::test]
    async fn reorder_counts_changed_photos_only() {
        let a = PhotoId::new();
        let b = PhotoId::new();
        let mut photos = MockPhotoRepository::new();
        photos.expect_reorder().with(eq(a), eq(1)).returning(|_, _| Ok(true));
        photos.expect_reorder().with(eq(b), eq(2)).returning(|_, _| Ok(false));
        let mut history = MockHistoryRepository::new();
        history
            .expect_append()
            .withf(|e| e.photo_id.is_none() && e.payload["updated"] == json!(1))
            .times(1)
            .returning(|_| Ok(()));
        let svc = service(photos, history, MockMediaStorage::new());

        let outcome = svc
            .reorder(
                &admin(),
                &json!({ "items": [
                    { "id": a.to_string(), "order": 1 },
                    { "id": b.to_string(), "order": "2" },
                ] }),
            )
            .await
            .unwrap();
        assert_eq!(outcome, ReorderOutcome { ok: true, updated: 1 });
    }

    #[tokio::test]
    async fn reorder_rejects_empty_items() {
        let svc = service(
            MockPhotoRepository::new(),
            MockHistoryRepository::new(),
            MockMediaStorage::new(),
        );
        let err = svc.reorder(&admin(), &json!({ "items": [] })).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
