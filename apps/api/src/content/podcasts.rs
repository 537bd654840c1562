use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::content::commands::{CreatePodcast, UpdatePodcast};
use crate::content::publishing::published_at_after;
use crate::errors::AppError;
use crate::models::content::PublicationStatus;
use crate::models::podcast::PodcastRow;
use crate::pagination::{fetch_page, Paginated, Pagination};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastFilter {
    pub status: Option<PublicationStatus>,
    pub series: Option<String>,
    pub speaker: Option<String>,
}

impl PodcastFilter {
    pub fn push_filters(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(series) = &self.series {
            qb.push(" AND series = ").push_bind(series.clone());
        }
        if let Some(speaker) = &self.speaker {
            qb.push(" AND speaker = ").push_bind(speaker.clone());
        }
    }
}

/// An audio file received from a multipart upload.
#[derive(Debug)]
pub struct AudioUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Object key for an episode's audio: `podcasts/<id>/<file name>`.
pub fn audio_key(podcast_id: Uuid, file_name: &str) -> String {
    format!("podcasts/{podcast_id}/{}", sanitize_file_name(file_name))
}

/// Keeps the last path component and replaces anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "audio".to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn ensure_audio(content_type: &str) -> Result<(), AppError> {
    if content_type.starts_with("audio/") {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "expected an audio file, got '{content_type}'"
        )))
    }
}

pub async fn create_podcast(pool: &PgPool, cmd: CreatePodcast, actor: Uuid) -> Result<PodcastRow, AppError> {
    let now = Utc::now();
    let row = sqlx::query_as::<_, PodcastRow>(
        r#"
        INSERT INTO podcasts
            (id, title, description, speaker, series, duration_seconds, status,
             published_at, created_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&cmd.title)
    .bind(&cmd.description)
    .bind(&cmd.speaker)
    .bind(&cmd.series)
    .bind(cmd.duration_seconds)
    .bind(cmd.status)
    .bind(published_at_after(cmd.status, None, now))
    .bind(actor)
    .bind(now)
    .fetch_one(pool)
    .await?;
    info!("Created podcast {}", row.id);
    Ok(row)
}

pub async fn list_podcasts(
    pool: &PgPool,
    filter: &PodcastFilter,
    pagination: Pagination,
) -> Result<Paginated<PodcastRow>, AppError> {
    Ok(fetch_page(
        pool,
        "podcasts",
        "COALESCE(published_at, created_at) DESC",
        pagination,
        |qb| filter.push_filters(qb),
    )
    .await?)
}

pub async fn get_podcast(pool: &PgPool, id: Uuid) -> Result<PodcastRow, AppError> {
    sqlx::query_as::<_, PodcastRow>("SELECT * FROM podcasts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found(id))
}

pub async fn update_podcast(pool: &PgPool, id: Uuid, cmd: UpdatePodcast) -> Result<PodcastRow, AppError> {
    let mut tx = pool.begin().await?;
    let mut row = sqlx::query_as::<_, PodcastRow>("SELECT * FROM podcasts WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found(id))?;

    let now = Utc::now();
    if let Some(title) = cmd.title {
        row.title = title;
    }
    if cmd.description.is_some() {
        row.description = cmd.description;
    }
    if cmd.speaker.is_some() {
        row.speaker = cmd.speaker;
    }
    if cmd.series.is_some() {
        row.series = cmd.series;
    }
    if cmd.duration_seconds.is_some() {
        row.duration_seconds = cmd.duration_seconds;
    }
    if let Some(status) = cmd.status {
        row.published_at = published_at_after(status, row.published_at, now);
        row.status = status;
    }

    let row = sqlx::query_as::<_, PodcastRow>(
        r#"
        UPDATE podcasts SET
            title = $2, description = $3, speaker = $4, series = $5,
            duration_seconds = $6, status = $7, published_at = $8, updated_at = $9
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(row.id)
    .bind(&row.title)
    .bind(&row.description)
    .bind(&row.speaker)
    .bind(&row.series)
    .bind(row.duration_seconds)
    .bind(row.status)
    .bind(row.published_at)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

pub async fn delete_podcast(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM podcasts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    info!("Deleted podcast {id}");
    Ok(())
}

/// Stores the episode audio in the media bucket and records its key.
pub async fn upload_audio(
    pool: &PgPool,
    s3: &S3Client,
    bucket: &str,
    id: Uuid,
    upload: AudioUpload,
) -> Result<PodcastRow, AppError> {
    ensure_audio(&upload.content_type)?;
    get_podcast(pool, id).await?;

    let key = audio_key(id, &upload.file_name);
    let size = upload.data.len();
    s3.put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(upload.data))
        .content_type(&upload.content_type)
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

    info!("Uploaded {size} bytes of audio to s3://{bucket}/{key}");

    sqlx::query_as::<_, PodcastRow>(
        "UPDATE podcasts SET audio_key = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&key)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Podcast {id} not found"))
}
