use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dates::DateRange;
use crate::errors::AppError;
use crate::models::audit_log::{AuditAction, AuditLogRow};
use crate::pagination::{fetch_page, PageParams, Paginated};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFilter {
    pub user_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl AuditFilter {
    fn push_filters(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if let Some(user_id) = self.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(action) = self.action {
            qb.push(" AND action = ").push_bind(action);
        }
        let range = DateRange::new(self.start_date, self.end_date);
        if let Some(from) = range.from() {
            qb.push(" AND timestamp >= ").push_bind(from);
        }
        if let Some(until) = range.until() {
            qb.push(" AND timestamp < ").push_bind(until);
        }
    }
}

/// GET /api/audit-logs
pub async fn handle_list_audit_logs(
    State(state): State<AppState>,
    Query(filter): Query<AuditFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<AuditLogRow>>, AppError> {
    let pagination = state.pagination(page);
    let logs = fetch_page(&state.db, "audit_logs", "timestamp DESC", pagination, |qb| {
        filter.push_filters(qb)
    })
    .await?;
    Ok(Json(logs))
}
