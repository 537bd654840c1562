use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::prayer_request::{PrayerComment, PrayerRequestRow, PrayerStatus};
use crate::pagination::{fetch_page, Paginated, Pagination};
use crate::prayer::commands::{AddComment, CreatePrayerRequest, UpdatePrayerRequest};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerFilter {
    pub status: Option<PrayerStatus>,
    /// Only requests created by the caller.
    #[serde(default)]
    pub mine: bool,
}

impl PrayerFilter {
    /// Private requests are only ever visible to their creator.
    pub fn push_filters(&self, viewer: Option<Uuid>, qb: &mut QueryBuilder<'static, Postgres>) {
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status);
        }
        match viewer {
            Some(viewer) if self.mine => {
                qb.push(" AND created_by = ").push_bind(viewer);
            }
            Some(viewer) => {
                qb.push(" AND (is_public OR created_by = ").push_bind(viewer).push(")");
            }
            None if self.mine => {
                qb.push(" AND FALSE");
            }
            None => {
                qb.push(" AND is_public");
            }
        }
    }
}

/// What a caller sees of a prayer request.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrayerRequestView {
    pub id: Uuid,
    pub title: String,
    pub request: String,
    pub requester_name: Option<String>,
    pub is_anonymous: bool,
    pub is_public: bool,
    pub status: PrayerStatus,
    pub prayer_count: usize,
    pub prayed_by_me: bool,
    pub comments: Vec<PrayerComment>,
    /// Hidden from everyone but the creator on anonymous requests.
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrayerRequestView {
    pub fn for_viewer(row: PrayerRequestRow, viewer: Option<Uuid>) -> Self {
        let is_owner = viewer == Some(row.created_by);
        let hide_identity = row.is_anonymous && !is_owner;
        Self {
            id: row.id,
            title: row.title,
            request: row.request,
            requester_name: if hide_identity { None } else { row.requester_name },
            is_anonymous: row.is_anonymous,
            is_public: row.is_public,
            status: row.status,
            prayer_count: row.prayed_by.len(),
            prayed_by_me: viewer.is_some_and(|v| row.prayed_by.contains(&v)),
            comments: row.comments.0,
            created_by: if hide_identity { None } else { Some(row.created_by) },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn create_prayer_request(
    pool: &PgPool,
    cmd: CreatePrayerRequest,
    actor: Uuid,
) -> Result<PrayerRequestRow, AppError> {
    let row = sqlx::query_as::<_, PrayerRequestRow>(
        r#"
        INSERT INTO prayer_requests
            (id, title, request, requester_name, is_anonymous, is_public, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&cmd.title)
    .bind(&cmd.request)
    .bind(&cmd.requester_name)
    .bind(cmd.is_anonymous)
    .bind(cmd.is_public)
    .bind(actor)
    .fetch_one(pool)
    .await?;
    info!("Created prayer request {}", row.id);
    Ok(row)
}

pub async fn list_prayer_requests(
    pool: &PgPool,
    filter: &PrayerFilter,
    viewer: Option<Uuid>,
    pagination: Pagination,
) -> Result<Paginated<PrayerRequestRow>, AppError> {
    Ok(fetch_page(
        pool,
        "prayer_requests",
        "created_at DESC",
        pagination,
        |qb| filter.push_filters(viewer, qb),
    )
    .await?)
}

/// Fetches a request the viewer is allowed to see.
pub async fn get_prayer_request(
    pool: &PgPool,
    id: Uuid,
    viewer: Option<Uuid>,
) -> Result<PrayerRequestRow, AppError> {
    sqlx::query_as::<_, PrayerRequestRow>(
        "SELECT * FROM prayer_requests WHERE id = $1 AND (is_public OR created_by = $2)",
    )
    .bind(id)
    .bind(viewer)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

pub async fn update_prayer_request(
    pool: &PgPool,
    id: Uuid,
    owner: Uuid,
    cmd: UpdatePrayerRequest,
) -> Result<PrayerRequestRow, AppError> {
    sqlx::query_as::<_, PrayerRequestRow>(
        r#"
        UPDATE prayer_requests SET
            title = COALESCE($3, title),
            request = COALESCE($4, request),
            requester_name = COALESCE($5, requester_name),
            is_anonymous = COALESCE($6, is_anonymous),
            is_public = COALESCE($7, is_public),
            status = COALESCE($8, status),
            updated_at = now()
        WHERE id = $1 AND created_by = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(owner)
    .bind(&cmd.title)
    .bind(&cmd.request)
    .bind(&cmd.requester_name)
    .bind(cmd.is_anonymous)
    .bind(cmd.is_public)
    .bind(cmd.status)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

pub async fn delete_prayer_request(pool: &PgPool, id: Uuid, owner: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM prayer_requests WHERE id = $1 AND created_by = $2")
        .bind(id)
        .bind(owner)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    info!("Deleted prayer request {id}");
    Ok(())
}

/// Records that `actor` prayed for the request. Praying twice is a no-op.
pub async fn pray(pool: &PgPool, id: Uuid, actor: Uuid) -> Result<PrayerRequestRow, AppError> {
    let updated = sqlx::query_as::<_, PrayerRequestRow>(
        r#"
        UPDATE prayer_requests SET
            prayed_by = array_append(prayed_by, $2),
            updated_at = now()
        WHERE id = $1
          AND (is_public OR created_by = $2)
          AND NOT ($2 = ANY(prayed_by))
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(actor)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(row) => Ok(row),
        None => get_prayer_request(pool, id, Some(actor)).await,
    }
}

pub async fn add_comment(
    pool: &PgPool,
    id: Uuid,
    actor: Uuid,
    cmd: AddComment,
) -> Result<PrayerRequestRow, AppError> {
    let comment = PrayerComment {
        id: Uuid::new_v4(),
        author: actor,
        body: cmd.body,
        created_at: Utc::now(),
    };
    sqlx::query_as::<_, PrayerRequestRow>(
        r#"
        UPDATE prayer_requests SET
            comments = comments || jsonb_build_array($3::jsonb),
            updated_at = now()
        WHERE id = $1 AND (is_public OR created_by = $2)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(actor)
    .bind(Json(&comment))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Prayer request {id} not found"))
}
