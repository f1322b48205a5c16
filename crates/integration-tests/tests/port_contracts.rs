//! The in-memory adapters, driven only through the port traits the
//! services see.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use domains::*;
use storage_adapters::{
    InMemoryVisitLimiter, MemoryHistoryRepository, MemoryPhotoRepository, MemoryUserRepository,
};
use uuid::Uuid;

fn photo(title: &str, visible: bool) -> Photo {
    let now = Utc::now();
    Photo {
        id: PhotoId::new(),
        title: title.into(),
        subtitle: None,
        description_md: "body".into(),
        alt: title.into(),
        location: None,
        tags: vec![],
        taken_date: NaiveDate::from_ymd_opt(2024, 5, 1),
        image_url: format!("/uploads/photos/{title}.jpg"),
        featured: false,
        order: 0,
        is_visible: visible,
        is_archived: false,
        visits: 0,
        created_by: None,
        uploaded_date: now,
        created_at: now,
        updated_at: now,
    }
}

fn user(username: &str, email: &str) -> AdminUser {
    AdminUser {
        id: Uuid::now_v7(),
        username: username.into(),
        email: email.into(),
        password_hash: "$argon2id$placeholder".into(),
        role: Role::Admin,
        created_at: Utc::now(),
        last_login: None,
    }
}

#[tokio::test]
async fn visits_only_count_on_public_photos() {
    let repo: Arc<dyn PhotoRepository> = Arc::new(MemoryPhotoRepository::new());
    let public = photo("public", true);
    let hidden = photo("hidden", false);
    repo.insert(&public).await.unwrap();
    repo.insert(&hidden).await.unwrap();

    assert_eq!(repo.increment_visits(public.id).await.unwrap(), Some(1));
    assert_eq!(repo.increment_visits(public.id).await.unwrap(), Some(2));
    assert_eq!(repo.increment_visits(hidden.id).await.unwrap(), None);
    assert_eq!(repo.increment_visits(PhotoId::new()).await.unwrap(), None);
}

#[tokio::test]
async fn reorder_is_a_conditional_update() {
    let repo: Arc<dyn PhotoRepository> = Arc::new(MemoryPhotoRepository::new());
    let p = photo("carousel", true);
    repo.insert(&p).await.unwrap();

    assert!(repo.reorder(p.id, 4).await.unwrap());
    assert!(!repo.reorder(p.id, 4).await.unwrap());
    assert!(!repo.reorder(PhotoId::new(), 1).await.unwrap());

    let stored = repo.find_by_id(p.id).await.unwrap().unwrap();
    assert!(stored.featured);
    assert_eq!(stored.order, 4);
    assert_eq!(repo.max_featured_order().await.unwrap(), Some(4));
}

#[tokio::test]
async fn update_of_missing_photo_is_none() {
    let repo: Arc<dyn PhotoRepository> = Arc::new(MemoryPhotoRepository::new());
    let changes = PhotoChanges {
        title: Some("x".into()),
        ..PhotoChanges::default()
    };
    assert_eq!(repo.update(PhotoId::new(), &changes).await.unwrap(), None);
}

#[tokio::test]
async fn clearing_optional_fields() {
    let repo: Arc<dyn PhotoRepository> = Arc::new(MemoryPhotoRepository::new());
    let p = photo("dated", true);
    repo.insert(&p).await.unwrap();

    let cleared = repo
        .update(
            p.id,
            &PhotoChanges {
                taken_date: Some(None),
                ..PhotoChanges::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleared.taken_date, None);
    assert!(cleared.updated_at >= p.updated_at);
}

#[tokio::test]
async fn history_is_scoped_to_one_photo() {
    let repo: Arc<dyn HistoryRepository> = Arc::new(MemoryHistoryRepository::new());
    let id = PhotoId::new();
    for action in [HistoryAction::Create, HistoryAction::Update] {
        repo.append(&PhotoHistoryEntry::record(Some(id), action, None, serde_json::json!({})))
            .await
            .unwrap();
    }
    repo.append(&PhotoHistoryEntry::record(
        None,
        HistoryAction::Reorder,
        None,
        serde_json::json!({ "updated": 1 }),
    ))
    .await
    .unwrap();

    let (entries, total) = repo
        .list_for_photo(id, PageRequest::history(None, None))
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(entries[0].action, HistoryAction::Update);
}

#[tokio::test]
async fn users_are_unique_by_name_and_email() {
    let repo: Arc<dyn UserRepository> = Arc::new(MemoryUserRepository::new());
    repo.insert(&user("owner", "owner@example.com")).await.unwrap();

    let clash = repo.insert(&user("someone", "owner@example.com")).await;
    assert!(matches!(clash, Err(RepoError::Conflict(_))));

    assert!(repo.find_by_login("owner", "-").await.unwrap().is_some());
    assert!(repo.find_by_login("-", "owner@example.com").await.unwrap().is_some());
    assert!(repo.find_by_login("Owner", "-").await.unwrap().is_none());
}

#[test]
fn limiter_keys_on_client_and_photo() {
    let limiter: Arc<dyn VisitLimiter> =
        Arc::new(InMemoryVisitLimiter::new(Duration::from_secs(60)));
    assert!(limiter.should_count("203.0.113.1", "a"));
    assert!(!limiter.should_count("203.0.113.1", "a"));
    assert!(limiter.should_count("203.0.113.1", "b"));
    assert!(limiter.should_count("203.0.113.2", "a"));
}
