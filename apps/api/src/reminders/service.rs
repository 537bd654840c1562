use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::dates::DateRange;
use crate::errors::AppError;
use crate::models::reminder::{ReminderRow, ReminderStatus, ReminderType};
use crate::pagination::{fetch_page, Paginated, Pagination};
use crate::reminders::commands::{CreateReminder, UpdateReminder};
use crate::reminders::lifecycle::NewReminder;
use crate::scheduling::TransitionError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderFilter {
    pub status: Option<ReminderStatus>,
    pub reminder_type: Option<ReminderType>,
    pub assigned_to: Option<Uuid>,
    pub visitor_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ReminderFilter {
    pub fn push_filters(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(kind) = self.reminder_type {
            qb.push(" AND reminder_type = ").push_bind(kind);
        }
        if let Some(assigned_to) = self.assigned_to {
            qb.push(" AND assigned_to = ").push_bind(assigned_to);
        }
        if let Some(visitor_id) = self.visitor_id {
            qb.push(" AND visitor_id = ").push_bind(visitor_id);
        }
        let range = DateRange::new(self.start_date, self.end_date);
        if let Some(from) = range.from() {
            qb.push(" AND due_date >= ").push_bind(from);
        }
        if let Some(until) = range.until() {
            qb.push(" AND due_date < ").push_bind(until);
        }
    }
}

/// Result of completing a reminder: the closed row and, for recurring ones, its successor.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedReminder {
    #[serde(flatten)]
    pub reminder: ReminderRow,
    pub next_occurrence: Option<ReminderRow>,
}

async fn insert_reminder<'e, E>(
    executor: E,
    reminder: &NewReminder,
    now: DateTime<Utc>,
) -> Result<ReminderRow, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ReminderRow>(
        r#"
        INSERT INTO reminders
            (id, title, description, reminder_type, due_date, status, recurrence,
             visitor_id, assigned_to, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $8, $9, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&reminder.title)
    .bind(&reminder.description)
    .bind(reminder.reminder_type)
    .bind(reminder.due_date)
    .bind(reminder.recurrence)
    .bind(reminder.visitor_id)
    .bind(reminder.assigned_to)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub async fn create_reminder(
    pool: &PgPool,
    cmd: CreateReminder,
    actor: Uuid,
) -> Result<ReminderRow, AppError> {
    if let Some(visitor_id) = cmd.visitor_id {
        ensure_visitor_exists(pool, visitor_id).await?;
    }
    let new = NewReminder {
        title: cmd.title,
        description: cmd.description,
        reminder_type: cmd.reminder_type,
        due_date: cmd.due_date,
        recurrence: cmd.recurrence,
        visitor_id: cmd.visitor_id,
        assigned_to: cmd.assigned_to.unwrap_or(actor),
    };
    let row = insert_reminder(pool, &new, Utc::now()).await?;
    info!("Created reminder {} due {}", row.id, row.due_date);
    Ok(row)
}

pub async fn list_reminders(
    pool: &PgPool,
    filter: &ReminderFilter,
    pagination: Pagination,
) -> Result<Paginated<ReminderRow>, AppError> {
    Ok(fetch_page(
        pool,
        "reminders",
        "due_date ASC, created_at ASC",
        pagination,
        |qb| filter.push_filters(qb),
    )
    .await?)
}

/// Open reminders whose effective due time (snooze end for snoozed ones) falls before `horizon`.
pub async fn open_due_before(
    pool: &PgPool,
    assigned_to: Option<Uuid>,
    horizon: DateTime<Utc>,
) -> Result<Vec<ReminderRow>, AppError> {
    Ok(sqlx::query_as::<_, ReminderRow>(
        r#"
        SELECT * FROM reminders
        WHERE status IN ('pending', 'snoozed')
          AND CASE WHEN status = 'snoozed' THEN COALESCE(snoozed_until, due_date)
                   ELSE due_date END <= $1
          AND ($2::uuid IS NULL OR assigned_to = $2)
        ORDER BY due_date ASC
        "#,
    )
    .bind(horizon)
    .bind(assigned_to)
    .fetch_all(pool)
    .await?)
}

pub async fn get_reminder(pool: &PgPool, id: Uuid) -> Result<ReminderRow, AppError> {
    sqlx::query_as::<_, ReminderRow>("SELECT * FROM reminders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found(id))
}

pub async fn update_reminder(
    pool: &PgPool,
    id: Uuid,
    cmd: UpdateReminder,
) -> Result<ReminderRow, AppError> {
    if let Some(visitor_id) = cmd.visitor_id {
        ensure_visitor_exists(pool, visitor_id).await?;
    }
    let (row, _) = transition(pool, id, |row, now| {
        row.apply_update(cmd, now)?;
        Ok(None)
    })
    .await?;
    Ok(row)
}

pub async fn complete_reminder(pool: &PgPool, id: Uuid) -> Result<CompletedReminder, AppError> {
    let (reminder, next_occurrence) = transition(pool, id, |row, now| row.complete(now)).await?;
    Ok(CompletedReminder {
        reminder,
        next_occurrence,
    })
}

pub async fn snooze_reminder(
    pool: &PgPool,
    id: Uuid,
    until: DateTime<Utc>,
) -> Result<ReminderRow, AppError> {
    let (row, _) = transition(pool, id, |row, now| {
        row.snooze(until, now)?;
        Ok(None)
    })
    .await?;
    Ok(row)
}

pub async fn reactivate_reminder(pool: &PgPool, id: Uuid) -> Result<ReminderRow, AppError> {
    let (row, _) = transition(pool, id, |row, now| {
        row.reactivate(now)?;
        Ok(None)
    })
    .await?;
    Ok(row)
}

pub async fn cancel_reminder(pool: &PgPool, id: Uuid) -> Result<ReminderRow, AppError> {
    let (row, _) = transition(pool, id, |row, now| {
        row.cancel(now)?;
        Ok(None)
    })
    .await?;
    Ok(row)
}

pub async fn delete_reminder(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM reminders WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    info!("Deleted reminder {id}");
    Ok(())
}

/// Locks the row, applies the change and writes it back together with any successor occurrence.
async fn transition<F>(
    pool: &PgPool,
    id: Uuid,
    apply: F,
) -> Result<(ReminderRow, Option<ReminderRow>), AppError>
where
    F: FnOnce(&mut ReminderRow, DateTime<Utc>) -> Result<Option<NewReminder>, TransitionError>,
{
    let mut tx = pool.begin().await?;

    let mut row = sqlx::query_as::<_, ReminderRow>("SELECT * FROM reminders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found(id))?;

    let now = Utc::now();
    let successor = apply(&mut row, now)?;
    let row = persist(&mut tx, &row).await?;

    let next = match successor {
        Some(new) => {
            let next = insert_reminder(&mut *tx, &new, now).await?;
            info!("Reminder {} recurs; next occurrence {} due {}", row.id, next.id, next.due_date);
            Some(next)
        }
        None => None,
    };

    tx.commit().await?;
    Ok((row, next))
}

async fn persist(tx: &mut Transaction<'_, Postgres>, row: &ReminderRow) -> Result<ReminderRow, sqlx::Error> {
    sqlx::query_as::<_, ReminderRow>(
        r#"
        UPDATE reminders SET
            title = $2, description = $3, reminder_type = $4, due_date = $5,
            status = $6, recurrence = $7, snoozed_until = $8, visitor_id = $9,
            assigned_to = $10, completed_at = $11, updated_at = $12
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(row.id)
    .bind(&row.title)
    .bind(&row.description)
    .bind(row.reminder_type)
    .bind(row.due_date)
    .bind(row.status)
    .bind(row.recurrence)
    .bind(row.snoozed_until)
    .bind(row.visitor_id)
    .bind(row.assigned_to)
    .bind(row.completed_at)
    .bind(row.updated_at)
    .fetch_one(&mut **tx)
    .await
}

async fn ensure_visitor_exists(pool: &PgPool, visitor_id: Uuid) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM visitors WHERE id = $1)")
        .bind(visitor_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(AppError::Validation(format!("visitor {visitor_id} does not exist")));
    }
    Ok(())
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Reminder {id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_sql() {
        let filter = ReminderFilter {
            status: Some(ReminderStatus::Snoozed),
            reminder_type: Some(ReminderType::Birthday),
            visitor_id: Some(Uuid::new_v4()),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM reminders WHERE TRUE");
        filter.push_filters(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM reminders WHERE TRUE AND status = $1 AND reminder_type = $2 \
             AND visitor_id = $3 AND due_date >= $4"
        );
    }

    #[test]
    fn test_filter_from_query_values() {
        let filter: ReminderFilter =
            serde_json::from_str(r#"{"reminderType":"follow_up","endDate":"2024-05-31"}"#).unwrap();
        assert_eq!(filter.reminder_type, Some(ReminderType::FollowUp));
        assert_eq!(filter.end_date, NaiveDate::from_ymd_opt(2024, 5, 31));
    }
}
