use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::Actor;
use crate::errors::AppError;
use crate::pagination::{PageParams, Paginated};
use crate::prayer::commands::{AddComment, CreatePrayerRequest, UpdatePrayerRequest};
use crate::prayer::service::{self, PrayerFilter, PrayerRequestView};
use crate::state::AppState;

/// POST /api/prayer-requests
pub async fn handle_create(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(cmd): Json<CreatePrayerRequest>,
) -> Result<(StatusCode, Json<PrayerRequestView>), AppError> {
    let row = service::create_prayer_request(&state.db, cmd.validate()?, actor).await?;
    Ok((StatusCode::CREATED, Json(PrayerRequestView::for_viewer(row, Some(actor)))))
}

/// GET /api/prayer-requests
pub async fn handle_list(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(filter): Query<PrayerFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<PrayerRequestView>>, AppError> {
    let viewer = Some(actor);
    let rows =
        service::list_prayer_requests(&state.db, &filter, viewer, state.pagination(page)).await?;
    Ok(Json(rows.map(|row| PrayerRequestView::for_viewer(row, viewer))))
}

/// GET /api/prayer-requests/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<PrayerRequestView>, AppError> {
    let row = service::get_prayer_request(&state.db, id, Some(actor)).await?;
    Ok(Json(PrayerRequestView::for_viewer(row, Some(actor))))
}

/// PUT /api/prayer-requests/:id
pub async fn handle_update(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(cmd): Json<UpdatePrayerRequest>,
) -> Result<Json<PrayerRequestView>, AppError> {
    let row = service::update_prayer_request(&state.db, id, actor, cmd.validate()?).await?;
    Ok(Json(PrayerRequestView::for_viewer(row, Some(actor))))
}

/// DELETE /api/prayer-requests/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_prayer_request(&state.db, id, actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/prayer-requests/:id/pray
pub async fn handle_pray(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<PrayerRequestView>, AppError> {
    let row = service::pray(&state.db, id, actor).await?;
    Ok(Json(PrayerRequestView::for_viewer(row, Some(actor))))
}

/// POST /api/prayer-requests/:id/comments
pub async fn handle_comment(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(cmd): Json<AddComment>,
) -> Result<(StatusCode, Json<PrayerRequestView>), AppError> {
    let row = service::add_comment(&state.db, id, actor, cmd.validate()?).await?;
    Ok((StatusCode::CREATED, Json(PrayerRequestView::for_viewer(row, Some(actor)))))
}
