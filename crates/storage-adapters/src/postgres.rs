//! # PostgreSQL adapters
//!
//! Runtime-checked queries; dynamic filters and partial updates are built
//! with `QueryBuilder`. Counters and reorders are single conditional
//! statements so concurrent requests never lose writes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use domains::{
    Actor, AdminUser, HistoryAction, HistoryRepository, PageRequest, Photo, PhotoChanges,
    PhotoFilter, PhotoHistoryEntry, PhotoId, PhotoQuery, PhotoRepository, RepoError, Role,
    SortKey, UserRepository,
};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};
use tracing::{info, warn};
use uuid::Uuid;

const PHOTO_COLUMNS: &str = "id, title, subtitle, description_md, alt, location, tags, taken_date, \
     image_url, featured, sort_order, is_visible, is_archived, visits, created_by_id, \
     created_by_username, uploaded_date, created_at, updated_at";

const HISTORY_COLUMNS: &str = "id, photo_id, action, by_id, by_username, payload, created_at";

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, last_login";

/// Opens a pool and applies the embedded migrations.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, RepoError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(db_err)?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| RepoError::Backend(format!("migration failed: {e}")))?;
    info!("database migrations applied");
    Ok(pool)
}

fn db_err(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(db.message().to_string())
        }
        _ => RepoError::Backend(e.to_string()),
    }
}

fn actor(id: Option<Uuid>, username: Option<String>) -> Option<Actor> {
    Some(Actor {
        id: id?,
        username: username?,
    })
}

#[derive(Debug, FromRow)]
struct PhotoRow {
    id: Uuid,
    title: String,
    subtitle: Option<String>,
    description_md: String,
    alt: String,
    location: Option<String>,
    tags: Vec<String>,
    taken_date: Option<NaiveDate>,
    image_url: String,
    featured: bool,
    sort_order: i32,
    is_visible: bool,
    is_archived: bool,
    visits: i64,
    created_by_id: Option<Uuid>,
    created_by_username: Option<String>,
    uploaded_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PhotoRow> for Photo {
    fn from(row: PhotoRow) -> Self {
        Photo {
            id: PhotoId::from_uuid(row.id),
            title: row.title,
            subtitle: row.subtitle,
            description_md: row.description_md,
            alt: row.alt,
            location: row.location,
            tags: row.tags,
            taken_date: row.taken_date,
            image_url: row.image_url,
            featured: row.featured,
            order: row.sort_order,
            is_visible: row.is_visible,
            is_archived: row.is_archived,
            visits: row.visits,
            created_by: actor(row.created_by_id, row.created_by_username),
            uploaded_date: row.uploaded_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &PhotoFilter) {
    qb.push(" WHERE TRUE");
    if let Some(text) = &filter.text {
        qb.push(" AND search @@ plainto_tsquery('simple', ")
            .push_bind(text.clone())
            .push(")");
    }
    if let Some(tag) = &filter.tag {
        qb.push(" AND ").push_bind(tag.clone()).push(" = ANY(tags)");
    }
    if let Some(featured) = filter.featured {
        qb.push(" AND featured = ").push_bind(featured);
    }
    if let Some(visible) = filter.is_visible {
        qb.push(" AND is_visible = ").push_bind(visible);
    }
    if let Some(archived) = filter.is_archived {
        qb.push(" AND is_archived = ").push_bind(archived);
    }
}

fn order_by(sort: SortKey) -> &'static str {
    match sort {
        SortKey::Newest => " ORDER BY uploaded_date DESC, id DESC",
        SortKey::Oldest => " ORDER BY uploaded_date ASC, id DESC",
        SortKey::TakenDesc => " ORDER BY taken_date DESC NULLS LAST, id DESC",
        SortKey::TakenAsc => " ORDER BY taken_date ASC NULLS LAST, id DESC",
        SortKey::Relevant => " ORDER BY visits DESC, id DESC",
    }
}

fn page_bounds(page: PageRequest) -> (i64, i64) {
    (
        i64::from(page.limit),
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    )
}

pub struct PgPhotoRepository {
    pool: PgPool,
}

impl PgPhotoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PhotoRepository for PgPhotoRepository {
    async fn insert(&self, photo: &Photo) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO photos (id, title, subtitle, description_md, alt, location, tags, \
             taken_date, image_url, featured, sort_order, is_visible, is_archived, visits, \
             created_by_id, created_by_username, uploaded_date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19)",
        )
        .bind(photo.id.as_uuid())
        .bind(&photo.title)
        .bind(&photo.subtitle)
        .bind(&photo.description_md)
        .bind(&photo.alt)
        .bind(&photo.location)
        .bind(&photo.tags)
        .bind(photo.taken_date)
        .bind(&photo.image_url)
        .bind(photo.featured)
        .bind(photo.order)
        .bind(photo.is_visible)
        .bind(photo.is_archived)
        .bind(photo.visits)
        .bind(photo.created_by.as_ref().map(|a| a.id))
        .bind(photo.created_by.as_ref().map(|a| a.username.clone()))
        .bind(photo.uploaded_date)
        .bind(photo.created_at)
        .bind(photo.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: PhotoId) -> Result<Option<Photo>, RepoError> {
        let row: Option<PhotoRow> =
            sqlx::query_as(&format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.map(Photo::from))
    }

    async fn update(
        &self,
        id: PhotoId,
        changes: &PhotoChanges,
    ) -> Result<Option<Photo>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE photos SET updated_at = now()");
        if let Some(v) = &changes.title {
            qb.push(", title = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.subtitle {
            qb.push(", subtitle = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.description_md {
            qb.push(", description_md = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.alt {
            qb.push(", alt = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.location {
            qb.push(", location = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.tags {
            qb.push(", tags = ").push_bind(v.clone());
        }
        if let Some(v) = changes.taken_date {
            qb.push(", taken_date = ").push_bind(v);
        }
        if let Some(v) = &changes.image_url {
            qb.push(", image_url = ").push_bind(v.clone());
        }
        if let Some(v) = changes.featured {
            qb.push(", featured = ").push_bind(v);
        }
        if let Some(v) = changes.order {
            qb.push(", sort_order = ").push_bind(v);
        }
        if let Some(v) = changes.is_visible {
            qb.push(", is_visible = ").push_bind(v);
        }
        if let Some(v) = changes.is_archived {
            qb.push(", is_archived = ").push_bind(v);
        }
        qb.push(" WHERE id = ")
            .push_bind(id.as_uuid())
            .push(format!(" RETURNING {PHOTO_COLUMNS}"));

        let row: Option<PhotoRow> = qb
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Photo::from))
    }

    async fn max_featured_order(&self) -> Result<Option<i32>, RepoError> {
        sqlx::query_scalar("SELECT MAX(sort_order) FROM photos WHERE featured")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn reorder(&self, id: PhotoId, order: i32) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE photos SET sort_order = $2, featured = TRUE, updated_at = now() \
             WHERE id = $1 AND NOT (featured AND sort_order = $2)",
        )
        .bind(id.as_uuid())
        .bind(order)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_visits(&self, id: PhotoId) -> Result<Option<i64>, RepoError> {
        sqlx::query_scalar(
            "UPDATE photos SET visits = visits + 1 \
             WHERE id = $1 AND is_visible AND NOT is_archived RETURNING visits",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn list(&self, query: &PhotoQuery) -> Result<(Vec<Photo>, u64), RepoError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM photos");
        push_filter(&mut count, &query.filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let (limit, offset) = page_bounds(query.page);
        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {PHOTO_COLUMNS} FROM photos"));
        push_filter(&mut select, &query.filter);
        select
            .push(order_by(query.sort))
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows: Vec<PhotoRow> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok((
            rows.into_iter().map(Photo::from).collect(),
            u64::try_from(total).unwrap_or(0),
        ))
    }
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    id: Uuid,
    photo_id: Option<Uuid>,
    action: String,
    by_id: Option<Uuid>,
    by_username: Option<String>,
    payload: Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for PhotoHistoryEntry {
    type Error = RepoError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(PhotoHistoryEntry {
            id: row.id,
            photo_id: row.photo_id.map(PhotoId::from_uuid),
            action: row.action.parse::<HistoryAction>().map_err(RepoError::Backend)?,
            by: actor(row.by_id, row.by_username),
            payload: row.payload,
            created_at: row.created_at,
        })
    }
}

pub struct PgHistoryRepository {
    pool: PgPool,
}

impl PgHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryRepository for PgHistoryRepository {
    async fn append(&self, entry: &PhotoHistoryEntry) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO photo_history \
             (id, photo_id, action, by_id, by_username, payload, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id)
        .bind(entry.photo_id.map(|id| id.as_uuid()))
        .bind(entry.action.as_str())
        .bind(entry.by.as_ref().map(|a| a.id))
        .bind(entry.by.as_ref().map(|a| a.username.clone()))
        .bind(&entry.payload)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list_for_photo(
        &self,
        photo_id: PhotoId,
        page: PageRequest,
    ) -> Result<(Vec<PhotoHistoryEntry>, u64), RepoError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM photo_history WHERE photo_id = $1")
                .bind(photo_id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;

        let (limit, offset) = page_bounds(page);
        let rows: Vec<HistoryRow> = sqlx::query_as(&format!(
            "SELECT {HISTORY_COLUMNS} FROM photo_history WHERE photo_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(photo_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let entries = rows
            .into_iter()
            .map(PhotoHistoryEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((entries, u64::try_from(total).unwrap_or(0)))
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for AdminUser {
    type Error = RepoError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(AdminUser {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse::<Role>().map_err(RepoError::Backend)?,
            created_at: row.created_at,
            last_login: row.last_login,
        })
    }
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_login(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<AdminUser>, RepoError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM admin_users WHERE username = $1 OR email = $2 LIMIT 1"
        ))
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(AdminUser::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AdminUser>, RepoError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM admin_users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(AdminUser::try_from).transpose()
    }

    async fn insert(&self, user: &AdminUser) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO admin_users \
             (id, username, email, password_hash, role, created_at, last_login) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.last_login)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) {
        let result = sqlx::query("UPDATE admin_users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await;
        if let Err(e) = result {
            warn!(user_id = %id, error = %e, "failed to record last login");
        }
    }
}
