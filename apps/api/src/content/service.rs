use chrono::Utc;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::content::commands::{CreatePost, UpdatePost};
use crate::content::publishing::published_at_after;
use crate::errors::AppError;
use crate::models::content::{ContentRow, PublicationStatus};
use crate::pagination::{fetch_page, like_pattern, Paginated, Pagination};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFilter {
    pub status: Option<PublicationStatus>,
    pub tag: Option<String>,
    /// Case-insensitive match on the title.
    pub search: Option<String>,
}

impl ContentFilter {
    pub fn push_filters(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(tag) = self.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            qb.push(" AND ")
                .push_bind(tag.to_lowercase())
                .push(" = ANY(tags)");
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            qb.push(" AND title ILIKE ").push_bind(like_pattern(term));
        }
    }
}

const DUPLICATE_SLUG: &str = "a post with this slug already exists";

pub async fn create_post(pool: &PgPool, cmd: CreatePost, author: Uuid) -> Result<ContentRow, AppError> {
    let now = Utc::now();
    let slug = cmd.slug.unwrap_or_default();
    let row = sqlx::query_as::<_, ContentRow>(
        r#"
        INSERT INTO contents
            (id, title, slug, body, excerpt, tags, status, published_at, author_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&cmd.title)
    .bind(&slug)
    .bind(&cmd.body)
    .bind(&cmd.excerpt)
    .bind(&cmd.tags)
    .bind(cmd.status)
    .bind(published_at_after(cmd.status, None, now))
    .bind(author)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_SLUG))?;

    info!("Created post {} ({})", row.id, row.slug);
    Ok(row)
}

pub async fn list_posts(
    pool: &PgPool,
    filter: &ContentFilter,
    pagination: Pagination,
) -> Result<Paginated<ContentRow>, AppError> {
    Ok(fetch_page(
        pool,
        "contents",
        "COALESCE(published_at, created_at) DESC",
        pagination,
        |qb| filter.push_filters(qb),
    )
    .await?)
}

pub async fn get_post(pool: &PgPool, id: Uuid) -> Result<ContentRow, AppError> {
    sqlx::query_as::<_, ContentRow>("SELECT * FROM contents WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found(id))
}

pub async fn update_post(pool: &PgPool, id: Uuid, cmd: UpdatePost) -> Result<ContentRow, AppError> {
    let mut tx = pool.begin().await?;
    let mut row = sqlx::query_as::<_, ContentRow>("SELECT * FROM contents WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found(id))?;

    let now = Utc::now();
    if let Some(title) = cmd.title {
        row.title = title;
    }
    if let Some(slug) = cmd.slug {
        row.slug = slug;
    }
    if let Some(body) = cmd.body {
        row.body = body;
    }
    if cmd.excerpt.is_some() {
        row.excerpt = cmd.excerpt;
    }
    if let Some(tags) = cmd.tags {
        row.tags = tags;
    }
    if let Some(status) = cmd.status {
        row.published_at = published_at_after(status, row.published_at, now);
        row.status = status;
    }

    let row = sqlx::query_as::<_, ContentRow>(
        r#"
        UPDATE contents SET
            title = $2, slug = $3, body = $4, excerpt = $5, tags = $6,
            status = $7, published_at = $8, updated_at = $9
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(row.id)
    .bind(&row.title)
    .bind(&row.slug)
    .bind(&row.body)
    .bind(&row.excerpt)
    .bind(&row.tags)
    .bind(row.status)
    .bind(row.published_at)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_SLUG))?;

    tx.commit().await?;
    Ok(row)
}

pub async fn publish_post(pool: &PgPool, id: Uuid) -> Result<ContentRow, AppError> {
    let row = update_post(
        pool,
        id,
        UpdatePost {
            status: Some(PublicationStatus::Published),
            ..Default::default()
        },
    )
    .await?;
    info!("Published post {} ({})", row.id, row.slug);
    Ok(row)
}

pub async fn delete_post(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM contents WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    info!("Deleted post {id}");
    Ok(())
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Post {id} not found"))
}
