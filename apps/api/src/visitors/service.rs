use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::dates::DateRange;
use crate::errors::AppError;
use crate::follow_ups::lifecycle::NewFollowUp;
use crate::follow_ups::service::insert_follow_up;
use crate::models::follow_up::FollowUpRow;
use crate::models::visitor::{VisitorRow, VisitorStatus};
use crate::pagination::{fetch_page, like_pattern, Paginated, Pagination};
use crate::visitors::commands::{CreateVisitor, UpdateVisitor};

/// Query parameters for GET /api/visitors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorFilter {
    pub status: Option<VisitorStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Case-insensitive substring matched against first name, last name, email or phone.
    pub search: Option<String>,
}

impl VisitorFilter {
    pub fn push_filters(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status);
        }
        let range = DateRange::new(self.start_date, self.end_date);
        if let Some(from) = range.from() {
            qb.push(" AND visit_date >= ").push_bind(from);
        }
        if let Some(until) = range.until() {
            qb.push(" AND visit_date < ").push_bind(until);
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = like_pattern(term);
            qb.push(" AND (");
            for (i, column) in ["first_name", "last_name", "email", "phone"].iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(format!("{column} ILIKE ")).push_bind(pattern.clone());
            }
            qb.push(")");
        }
    }
}

/// A freshly registered visitor together with the follow-up scheduled for them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedVisitor {
    #[serde(flatten)]
    pub visitor: VisitorRow,
    pub first_follow_up: FollowUpRow,
}

/// Registers a visitor and schedules their first follow-up.
///
/// Both inserts share one transaction: either the visitor exists with its
/// pending phone call, or neither was written.
pub async fn create_visitor(
    pool: &PgPool,
    cmd: CreateVisitor,
    actor: Uuid,
) -> Result<CreatedVisitor, AppError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let visitor = sqlx::query_as::<_, VisitorRow>(
        r#"
        INSERT INTO visitors
            (id, first_name, last_name, email, phone, address, visit_date,
             status, how_did_you_hear, notes, created_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&cmd.first_name)
    .bind(&cmd.last_name)
    .bind(&cmd.email)
    .bind(&cmd.phone)
    .bind(&cmd.address)
    .bind(cmd.visit_date.unwrap_or(now))
    .bind(cmd.status.unwrap_or_default())
    .bind(&cmd.how_did_you_hear)
    .bind(&cmd.notes)
    .bind(actor)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let first_follow_up = insert_follow_up(
        &mut *tx,
        &NewFollowUp::initial_for(visitor.id, actor, visitor.created_at),
        now,
    )
    .await?;

    tx.commit().await?;

    info!(
        "Registered visitor {} by {actor}; first follow-up {} due {}",
        visitor.id, first_follow_up.id, first_follow_up.scheduled_date
    );

    Ok(CreatedVisitor {
        visitor,
        first_follow_up,
    })
}

pub async fn list_visitors(
    pool: &PgPool,
    filter: &VisitorFilter,
    pagination: Pagination,
) -> Result<Paginated<VisitorRow>, AppError> {
    Ok(fetch_page(
        pool,
        "visitors",
        "visit_date DESC, created_at DESC",
        pagination,
        |qb| filter.push_filters(qb),
    )
    .await?)
}

pub async fn get_visitor(pool: &PgPool, id: Uuid) -> Result<VisitorRow, AppError> {
    sqlx::query_as::<_, VisitorRow>("SELECT * FROM visitors WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found(id))
}

pub async fn update_visitor(
    pool: &PgPool,
    id: Uuid,
    cmd: UpdateVisitor,
) -> Result<VisitorRow, AppError> {
    sqlx::query_as::<_, VisitorRow>(
        r#"
        UPDATE visitors SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            email = COALESCE($4, email),
            phone = COALESCE($5, phone),
            address = COALESCE($6, address),
            visit_date = COALESCE($7, visit_date),
            status = COALESCE($8, status),
            how_did_you_hear = COALESCE($9, how_did_you_hear),
            notes = COALESCE($10, notes),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&cmd.first_name)
    .bind(&cmd.last_name)
    .bind(&cmd.email)
    .bind(&cmd.phone)
    .bind(&cmd.address)
    .bind(cmd.visit_date)
    .bind(cmd.status)
    .bind(&cmd.how_did_you_hear)
    .bind(&cmd.notes)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

/// Removes a visitor. Their follow-ups go with them; linked reminders are kept and unlinked.
pub async fn delete_visitor(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM visitors WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    info!("Deleted visitor {id}");
    Ok(())
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Visitor {id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;
    use chrono::TimeZone;

    fn render(filter: &VisitorFilter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM visitors WHERE TRUE");
        filter.push_filters(&mut qb);
        qb.sql().to_string()
    }

    #[test]
    fn test_status_and_search_filter() {
        let filter = VisitorFilter {
            status: Some(VisitorStatus::New),
            search: Some("ana".to_string()),
            ..Default::default()
        };
        assert_eq!(
            render(&filter),
            "SELECT * FROM visitors WHERE TRUE AND status = $1 AND (first_name ILIKE $2 \
             OR last_name ILIKE $3 OR email ILIKE $4 OR phone ILIKE $5)"
        );
    }

    #[test]
    fn test_date_range_is_inclusive_of_end_day() {
        let filter = VisitorFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 7),
            ..Default::default()
        };
        assert_eq!(
            render(&filter),
            "SELECT * FROM visitors WHERE TRUE AND visit_date >= $1 AND visit_date < $2"
        );
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = VisitorFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(render(&filter), "SELECT * FROM visitors WHERE TRUE");
    }

    #[test]
    fn test_created_visitor_serializes_flat() {
        let now = Utc::now();
        let visitor = VisitorRow {
            id: Uuid::new_v4(),
            first_name: "Ana".to_string(),
            last_name: "Lopez".to_string(),
            email: None,
            phone: None,
            address: None,
            visit_date: now,
            status: VisitorStatus::New,
            how_did_you_hear: None,
            notes: None,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        let new = NewFollowUp::initial_for(visitor.id, visitor.created_by, now);
        let follow_up = FollowUpRow {
            id: Uuid::new_v4(),
            visitor_id: visitor.id,
            follow_up_type: new.follow_up_type,
            status: Default::default(),
            scheduled_date: new.scheduled_date,
            completed_date: None,
            response: None,
            notes: None,
            assigned_to: new.assigned_to,
            is_urgent: false,
            next_follow_up: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(CreatedVisitor {
            visitor,
            first_follow_up: follow_up,
        })
        .unwrap();
        assert_eq!(json["firstName"], "Ana");
        assert_eq!(json["status"], "new");
        assert_eq!(json["firstFollowUp"]["followUpType"], "phone");
        assert_eq!(json["firstFollowUp"]["status"], "pending");
    }

    #[test]
    fn test_camel_case_body_schedules_call_for_next_day() {
        let body = r#"{"firstName":"Ana","lastName":"Lopez","visitDate":"2024-01-07"}"#;
        let cmd = serde_json::from_str::<CreateVisitor>(body)
            .unwrap()
            .validate()
            .unwrap();
        assert_eq!(cmd.first_name, "Ana");

        let staff = Uuid::new_v4();
        let created = Utc.with_ymd_and_hms(2024, 1, 7, 10, 15, 0).unwrap();
        let new = NewFollowUp::initial_for(Uuid::new_v4(), staff, created);
        let follow_up = FollowUpRow {
            id: Uuid::new_v4(),
            visitor_id: new.visitor_id,
            follow_up_type: new.follow_up_type,
            status: Default::default(),
            scheduled_date: new.scheduled_date,
            completed_date: None,
            response: None,
            notes: None,
            assigned_to: new.assigned_to,
            is_urgent: new.is_urgent,
            next_follow_up: None,
            created_at: created,
            updated_at: created,
        };

        let json = serde_json::to_value(&follow_up).unwrap();
        assert_eq!(json["scheduledDate"], "2024-01-08T10:15:00Z");
        assert_eq!(json["assignedTo"], staff.to_string());
        assert_eq!(json["followUpType"], "phone");
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn test_status_and_search_from_query_string() {
        let uri: Uri = "/api/visitors?status=new&search=ana&startDate=2024-01-01"
            .parse()
            .unwrap();
        let Query(filter) = Query::<VisitorFilter>::try_from_uri(&uri).unwrap();
        assert_eq!(filter.status, Some(VisitorStatus::New));
        assert_eq!(filter.search.as_deref(), Some("ana"));
        assert_eq!(filter.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(
            render(&filter),
            "SELECT * FROM visitors WHERE TRUE AND status = $1 AND visit_date >= $2 \
             AND (first_name ILIKE $3 OR last_name ILIKE $4 OR email ILIKE $5 OR phone ILIKE $6)"
        );
    }
}
