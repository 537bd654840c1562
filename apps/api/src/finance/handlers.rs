use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::Actor;
use crate::errors::AppError;
use crate::finance::commands::{CreateFinance, UpdateFinance};
use crate::finance::service::{self, CurrencySummary, FinanceFilter};
use crate::models::finance::FinanceRow;
use crate::pagination::{PageParams, Paginated};
use crate::state::AppState;

/// POST /api/finances
pub async fn handle_create(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(cmd): Json<CreateFinance>,
) -> Result<(StatusCode, Json<FinanceRow>), AppError> {
    let currency = &state.config.default_currency;
    let row = service::create_finance(&state.db, cmd.validate(currency)?, actor, currency).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/finances
pub async fn handle_list(
    State(state): State<AppState>,
    Query(filter): Query<FinanceFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<FinanceRow>>, AppError> {
    let rows = service::list_finances(&state.db, &filter, state.pagination(page)).await?;
    Ok(Json(rows))
}

/// GET /api/finances/summary
pub async fn handle_summary(
    State(state): State<AppState>,
    Query(filter): Query<FinanceFilter>,
) -> Result<Json<Vec<CurrencySummary>>, AppError> {
    Ok(Json(service::summary(&state.db, &filter).await?))
}

/// GET /api/finances/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FinanceRow>, AppError> {
    Ok(Json(service::get_finance(&state.db, id).await?))
}

/// PUT /api/finances/:id
pub async fn handle_update(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
    Json(cmd): Json<UpdateFinance>,
) -> Result<Json<FinanceRow>, AppError> {
    Ok(Json(service::update_finance(&state.db, id, cmd.validate()?).await?))
}

/// DELETE /api/finances/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_finance(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
