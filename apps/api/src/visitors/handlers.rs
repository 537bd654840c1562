use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::Actor;
use crate::errors::AppError;
use crate::models::visitor::VisitorRow;
use crate::pagination::{PageParams, Paginated};
use crate::state::AppState;
use crate::templates::{render_welcome_email, EmailMessage};
use crate::visitors::commands::{CreateVisitor, UpdateVisitor};
use crate::visitors::service::{self, CreatedVisitor, VisitorFilter};

/// POST /api/visitors
pub async fn handle_create(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(cmd): Json<CreateVisitor>,
) -> Result<(StatusCode, Json<CreatedVisitor>), AppError> {
    let created = service::create_visitor(&state.db, cmd.validate()?, actor).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/visitors
pub async fn handle_list(
    State(state): State<AppState>,
    Query(filter): Query<VisitorFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<VisitorRow>>, AppError> {
    let visitors = service::list_visitors(&state.db, &filter, state.pagination(page)).await?;
    Ok(Json(visitors))
}

/// GET /api/visitors/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<VisitorRow>, AppError> {
    Ok(Json(service::get_visitor(&state.db, id).await?))
}

/// PUT /api/visitors/:id
pub async fn handle_update(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(cmd): Json<UpdateVisitor>,
) -> Result<Json<VisitorRow>, AppError> {
    Ok(Json(service::update_visitor(&state.db, id, cmd.validate()?).await?))
}

/// DELETE /api/visitors/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_visitor(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/visitors/:id/welcome-email
///
/// Renders the message for preview; nothing is sent.
pub async fn handle_welcome_email(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EmailMessage>, AppError> {
    let visitor = service::get_visitor(&state.db, id).await?;
    Ok(Json(render_welcome_email(&state.config.church, &visitor)))
}
