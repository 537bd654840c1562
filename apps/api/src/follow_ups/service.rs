use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::dates::DateRange;
use crate::errors::AppError;
use crate::follow_ups::commands::{CompleteFollowUp, CreateFollowUp, UpdateFollowUp};
use crate::follow_ups::lifecycle::{visitor_status_after, NewFollowUp};
use crate::models::follow_up::{FollowUpRow, FollowUpStatus};
use crate::models::visitor::VisitorStatus;
use crate::pagination::{fetch_page, Paginated, Pagination};
use crate::scheduling::TransitionError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpFilter {
    pub assigned_to: Option<Uuid>,
    pub status: Option<FollowUpStatus>,
    pub visitor_id: Option<Uuid>,
    pub is_urgent: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl FollowUpFilter {
    pub fn push_filters(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if let Some(assigned_to) = self.assigned_to {
            qb.push(" AND assigned_to = ").push_bind(assigned_to);
        }
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(visitor_id) = self.visitor_id {
            qb.push(" AND visitor_id = ").push_bind(visitor_id);
        }
        if let Some(is_urgent) = self.is_urgent {
            qb.push(" AND is_urgent = ").push_bind(is_urgent);
        }
        let range = DateRange::new(self.start_date, self.end_date);
        if let Some(from) = range.from() {
            qb.push(" AND scheduled_date >= ").push_bind(from);
        }
        if let Some(until) = range.until() {
            qb.push(" AND scheduled_date < ").push_bind(until);
        }
    }
}

/// Inserts a follow-up using any executor, so the visitor workflow can run it inside its transaction.
pub async fn insert_follow_up<'e, E>(
    executor: E,
    follow_up: &NewFollowUp,
    now: DateTime<Utc>,
) -> Result<FollowUpRow, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, FollowUpRow>(
        r#"
        INSERT INTO follow_ups
            (id, visitor_id, follow_up_type, status, scheduled_date, notes,
             assigned_to, is_urgent, next_follow_up, created_at, updated_at)
        VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7, $8, $9, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(follow_up.visitor_id)
    .bind(follow_up.follow_up_type)
    .bind(follow_up.scheduled_date)
    .bind(&follow_up.notes)
    .bind(follow_up.assigned_to)
    .bind(follow_up.is_urgent)
    .bind(follow_up.next_follow_up)
    .bind(now)
    .fetch_one(executor)
    .await
}

/// Schedules an additional follow-up for an existing visitor.
pub async fn create_for_visitor(
    pool: &PgPool,
    visitor_id: Uuid,
    cmd: CreateFollowUp,
    actor: Uuid,
) -> Result<FollowUpRow, AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM visitors WHERE id = $1)")
        .bind(visitor_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(AppError::NotFound(format!("Visitor {visitor_id} not found")));
    }

    let new = NewFollowUp {
        visitor_id,
        follow_up_type: cmd.follow_up_type,
        scheduled_date: cmd.scheduled_date,
        assigned_to: cmd.assigned_to.unwrap_or(actor),
        notes: cmd.notes,
        is_urgent: cmd.is_urgent,
        next_follow_up: cmd.next_follow_up,
    };
    let row = insert_follow_up(pool, &new, Utc::now()).await?;
    info!("Scheduled {} follow-up {} for visitor {visitor_id}", row.follow_up_type, row.id);
    Ok(row)
}

pub async fn list_follow_ups(
    pool: &PgPool,
    filter: &FollowUpFilter,
    pagination: Pagination,
) -> Result<Paginated<FollowUpRow>, AppError> {
    Ok(fetch_page(
        pool,
        "follow_ups",
        "scheduled_date ASC, created_at ASC",
        pagination,
        |qb| filter.push_filters(qb),
    )
    .await?)
}

/// Open follow-ups due before `horizon`, for the merged work queue.
pub async fn open_due_before(
    pool: &PgPool,
    assigned_to: Option<Uuid>,
    horizon: DateTime<Utc>,
) -> Result<Vec<FollowUpRow>, AppError> {
    Ok(sqlx::query_as::<_, FollowUpRow>(
        r#"
        SELECT * FROM follow_ups
        WHERE status = 'pending'
          AND scheduled_date <= $1
          AND ($2::uuid IS NULL OR assigned_to = $2)
        ORDER BY scheduled_date ASC
        "#,
    )
    .bind(horizon)
    .bind(assigned_to)
    .fetch_all(pool)
    .await?)
}

pub async fn get_follow_up(pool: &PgPool, id: Uuid) -> Result<FollowUpRow, AppError> {
    sqlx::query_as::<_, FollowUpRow>("SELECT * FROM follow_ups WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found(id))
}

pub async fn update_follow_up(
    pool: &PgPool,
    id: Uuid,
    cmd: UpdateFollowUp,
) -> Result<FollowUpRow, AppError> {
    transition(pool, id, |row, now| row.apply_update(cmd, now)).await
}

pub async fn complete_follow_up(
    pool: &PgPool,
    id: Uuid,
    cmd: CompleteFollowUp,
) -> Result<FollowUpRow, AppError> {
    transition(pool, id, |row, now| {
        row.complete(cmd.response, now)?;
        if let Some(notes) = crate::visitors::commands::non_blank(cmd.notes) {
            row.notes = Some(notes);
        }
        Ok(())
    })
    .await
}

pub async fn cancel_follow_up(pool: &PgPool, id: Uuid) -> Result<FollowUpRow, AppError> {
    transition(pool, id, |row, now| row.cancel(now)).await
}

pub async fn delete_follow_up(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM follow_ups WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    info!("Deleted follow-up {id}");
    Ok(())
}

/// Locks the row, applies a lifecycle change in memory and writes it back.
/// A completion that carries a real answer also advances a new visitor to `contacted`.
async fn transition<F>(pool: &PgPool, id: Uuid, apply: F) -> Result<FollowUpRow, AppError>
where
    F: FnOnce(&mut FollowUpRow, DateTime<Utc>) -> Result<(), TransitionError>,
{
    let mut tx = pool.begin().await?;

    let mut row = sqlx::query_as::<_, FollowUpRow>("SELECT * FROM follow_ups WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found(id))?;

    let was_completed = row.status == FollowUpStatus::Completed;
    apply(&mut row, Utc::now())?;
    let row = persist(&mut tx, &row).await?;

    if !was_completed && row.status == FollowUpStatus::Completed {
        if let Some(response) = row.response {
            advance_visitor(&mut tx, row.visitor_id, response).await?;
        }
        info!("Follow-up {} completed with {:?}", row.id, row.response);
    }

    tx.commit().await?;
    Ok(row)
}

async fn persist(tx: &mut Transaction<'_, Postgres>, row: &FollowUpRow) -> Result<FollowUpRow, sqlx::Error> {
    sqlx::query_as::<_, FollowUpRow>(
        r#"
        UPDATE follow_ups SET
            follow_up_type = $2, status = $3, scheduled_date = $4, completed_date = $5,
            response = $6, notes = $7, assigned_to = $8, is_urgent = $9,
            next_follow_up = $10, updated_at = $11
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(row.id)
    .bind(row.follow_up_type)
    .bind(row.status)
    .bind(row.scheduled_date)
    .bind(row.completed_date)
    .bind(row.response)
    .bind(&row.notes)
    .bind(row.assigned_to)
    .bind(row.is_urgent)
    .bind(row.next_follow_up)
    .bind(row.updated_at)
    .fetch_one(&mut **tx)
    .await
}

async fn advance_visitor(
    tx: &mut Transaction<'_, Postgres>,
    visitor_id: Uuid,
    response: crate::models::follow_up::FollowUpResponse,
) -> Result<(), sqlx::Error> {
    let current: Option<VisitorStatus> =
        sqlx::query_scalar("SELECT status FROM visitors WHERE id = $1 FOR UPDATE")
            .bind(visitor_id)
            .fetch_optional(&mut **tx)
            .await?;

    if let Some(next) = current.and_then(|c| visitor_status_after(c, response)) {
        sqlx::query("UPDATE visitors SET status = $2, updated_at = now() WHERE id = $1")
            .bind(visitor_id)
            .bind(next)
            .execute(&mut **tx)
            .await?;
        info!("Visitor {visitor_id} moved to {next:?} after follow-up");
    }
    Ok(())
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Follow-up {id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_adds_nothing() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM follow_ups WHERE TRUE");
        FollowUpFilter::default().push_filters(&mut qb);
        assert_eq!(qb.sql(), "SELECT * FROM follow_ups WHERE TRUE");
    }

    #[test]
    fn test_queue_filter_sql() {
        let filter = FollowUpFilter {
            assigned_to: Some(Uuid::new_v4()),
            status: Some(FollowUpStatus::Pending),
            is_urgent: Some(true),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM follow_ups WHERE TRUE");
        filter.push_filters(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM follow_ups WHERE TRUE AND assigned_to = $1 AND status = $2 \
             AND is_urgent = $3 AND scheduled_date < $4"
        );
    }

    #[test]
    fn test_filter_from_query_string_values() {
        let filter: FollowUpFilter =
            serde_json::from_str(r#"{"status":"completed","isUrgent":false}"#).unwrap();
        assert_eq!(filter.status, Some(FollowUpStatus::Completed));
        assert_eq!(filter.is_urgent, Some(false));
    }
}
