use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::Actor;
use crate::content::commands::{CreatePodcast, CreatePost, UpdatePodcast, UpdatePost};
use crate::content::podcasts::{self, AudioUpload, PodcastFilter};
use crate::content::service::{self, ContentFilter};
use crate::errors::AppError;
use crate::models::content::ContentRow;
use crate::models::podcast::PodcastRow;
use crate::pagination::{PageParams, Paginated};
use crate::state::AppState;

/// POST /api/content
pub async fn handle_create_post(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(cmd): Json<CreatePost>,
) -> Result<(StatusCode, Json<ContentRow>), AppError> {
    let row = service::create_post(&state.db, cmd.validate()?, actor).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/content
pub async fn handle_list_posts(
    State(state): State<AppState>,
    Query(filter): Query<ContentFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<ContentRow>>, AppError> {
    Ok(Json(service::list_posts(&state.db, &filter, state.pagination(page)).await?))
}

/// GET /api/content/:id
pub async fn handle_get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContentRow>, AppError> {
    Ok(Json(service::get_post(&state.db, id).await?))
}

/// PUT /api/content/:id
pub async fn handle_update_post(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(cmd): Json<UpdatePost>,
) -> Result<Json<ContentRow>, AppError> {
    Ok(Json(service::update_post(&state.db, id, cmd.validate()?).await?))
}

/// POST /api/content/:id/publish
pub async fn handle_publish_post(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ContentRow>, AppError> {
    Ok(Json(service::publish_post(&state.db, id).await?))
}

/// DELETE /api/content/:id
pub async fn handle_delete_post(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_post(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/podcasts
pub async fn handle_create_podcast(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(cmd): Json<CreatePodcast>,
) -> Result<(StatusCode, Json<PodcastRow>), AppError> {
    let row = podcasts::create_podcast(&state.db, cmd.validate()?, actor).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/podcasts
pub async fn handle_list_podcasts(
    State(state): State<AppState>,
    Query(filter): Query<PodcastFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<PodcastRow>>, AppError> {
    Ok(Json(podcasts::list_podcasts(&state.db, &filter, state.pagination(page)).await?))
}

/// GET /api/podcasts/:id
pub async fn handle_get_podcast(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PodcastRow>, AppError> {
    Ok(Json(podcasts::get_podcast(&state.db, id).await?))
}

/// PUT /api/podcasts/:id
pub async fn handle_update_podcast(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(cmd): Json<UpdatePodcast>,
) -> Result<Json<PodcastRow>, AppError> {
    Ok(Json(podcasts::update_podcast(&state.db, id, cmd.validate()?).await?))
}

/// DELETE /api/podcasts/:id
pub async fn handle_delete_podcast(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    podcasts::delete_podcast(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/podcasts/:id/audio
///
/// Expects a multipart form with the audio in a `file` field.
pub async fn handle_upload_audio(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<PodcastRow>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("audio").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        upload = Some(AudioUpload {
            file_name,
            content_type,
            data,
        });
        break;
    }

    let upload = upload.ok_or_else(|| AppError::Validation("missing 'file' field".to_string()))?;
    let row = podcasts::upload_audio(&state.db, &state.s3, &state.config.s3_bucket, id, upload).await?;
    Ok(Json(row))
}
