use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::Actor;
use crate::errors::AppError;
use crate::models::reminder::ReminderRow;
use crate::pagination::{PageParams, Paginated};
use crate::reminders::commands::{CreateReminder, SnoozeReminder, UpdateReminder};
use crate::reminders::service::{self, CompletedReminder, ReminderFilter};
use crate::state::AppState;

/// POST /api/reminders
pub async fn handle_create(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(cmd): Json<CreateReminder>,
) -> Result<(StatusCode, Json<ReminderRow>), AppError> {
    let row = service::create_reminder(&state.db, cmd.validate()?, actor).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/reminders
pub async fn handle_list(
    State(state): State<AppState>,
    Query(filter): Query<ReminderFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<ReminderRow>>, AppError> {
    let rows = service::list_reminders(&state.db, &filter, state.pagination(page)).await?;
    Ok(Json(rows))
}

/// GET /api/reminders/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReminderRow>, AppError> {
    Ok(Json(service::get_reminder(&state.db, id).await?))
}

/// PUT /api/reminders/:id
pub async fn handle_update(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(cmd): Json<UpdateReminder>,
) -> Result<Json<ReminderRow>, AppError> {
    Ok(Json(service::update_reminder(&state.db, id, cmd.validate()?).await?))
}

/// POST /api/reminders/:id/complete
pub async fn handle_complete(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<CompletedReminder>, AppError> {
    Ok(Json(service::complete_reminder(&state.db, id).await?))
}

/// POST /api/reminders/:id/snooze
pub async fn handle_snooze(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(cmd): Json<SnoozeReminder>,
) -> Result<Json<ReminderRow>, AppError> {
    Ok(Json(service::snooze_reminder(&state.db, id, cmd.snoozed_until).await?))
}

/// POST /api/reminders/:id/reactivate
pub async fn handle_reactivate(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ReminderRow>, AppError> {
    Ok(Json(service::reactivate_reminder(&state.db, id).await?))
}

/// POST /api/reminders/:id/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ReminderRow>, AppError> {
    Ok(Json(service::cancel_reminder(&state.db, id).await?))
}

/// DELETE /api/reminders/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_reminder(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
