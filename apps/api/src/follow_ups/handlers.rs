use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::Actor;
use crate::errors::AppError;
use crate::follow_ups::commands::{CompleteFollowUp, CreateFollowUp, UpdateFollowUp};
use crate::follow_ups::service::{self, FollowUpFilter};
use crate::models::follow_up::FollowUpRow;
use crate::pagination::{PageParams, Paginated};
use crate::state::AppState;

/// POST /api/visitors/:id/follow-up
pub async fn handle_create_for_visitor(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(visitor_id): Path<Uuid>,
    Json(cmd): Json<CreateFollowUp>,
) -> Result<(StatusCode, Json<FollowUpRow>), AppError> {
    let row = service::create_for_visitor(&state.db, visitor_id, cmd.validate()?, actor).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/visitors/:id/follow-ups
pub async fn handle_list_for_visitor(
    State(state): State<AppState>,
    Path(visitor_id): Path<Uuid>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<FollowUpRow>>, AppError> {
    let filter = FollowUpFilter {
        visitor_id: Some(visitor_id),
        ..Default::default()
    };
    let rows = service::list_follow_ups(&state.db, &filter, state.pagination(page)).await?;
    Ok(Json(rows))
}

/// GET /api/follow-ups
pub async fn handle_list(
    State(state): State<AppState>,
    Query(filter): Query<FollowUpFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<FollowUpRow>>, AppError> {
    let rows = service::list_follow_ups(&state.db, &filter, state.pagination(page)).await?;
    Ok(Json(rows))
}

/// GET /api/follow-ups/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FollowUpRow>, AppError> {
    Ok(Json(service::get_follow_up(&state.db, id).await?))
}

/// PUT /api/follow-ups/:id
pub async fn handle_update(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(cmd): Json<UpdateFollowUp>,
) -> Result<Json<FollowUpRow>, AppError> {
    Ok(Json(service::update_follow_up(&state.db, id, cmd.validate()?).await?))
}

/// POST /api/follow-ups/:id/complete
pub async fn handle_complete(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(cmd): Json<CompleteFollowUp>,
) -> Result<Json<FollowUpRow>, AppError> {
    Ok(Json(service::complete_follow_up(&state.db, id, cmd).await?))
}

/// POST /api/follow-ups/:id/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<FollowUpRow>, AppError> {
    Ok(Json(service::cancel_follow_up(&state.db, id).await?))
}

/// DELETE /api/follow-ups/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_follow_up(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
