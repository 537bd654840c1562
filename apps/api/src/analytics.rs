//! Aggregate counts for the dashboard.
//!
//! Grouping happens in SQL; turning grouped rows into the response shape and
//! computing rates are pure functions so they can be tested without a database.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dates::DateRange;
use crate::errors::AppError;
use crate::models::follow_up::{FollowUpResponse, FollowUpStatus};
use crate::models::visitor::VisitorStatus;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Follow-up statistics only.
    pub assigned_to: Option<Uuid>,
}

impl AnalyticsQuery {
    fn push_range(&self, column: &str, qb: &mut QueryBuilder<'static, Postgres>) {
        let range = DateRange::new(self.start_date, self.end_date);
        if let Some(from) = range.from() {
            qb.push(format!(" AND {column} >= ")).push_bind(from);
        }
        if let Some(until) = range.until() {
            qb.push(format!(" AND {column} < ")).push_bind(until);
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorStatusCounts {
    pub new: i64,
    pub contacted: i64,
    pub converted: i64,
    pub inactive: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorStats {
    pub total: i64,
    pub by_status: VisitorStatusCounts,
    pub monthly: Vec<MonthlyCount>,
    /// Percentage of visitors that reached `converted`.
    pub conversion_rate: f64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpStatusCounts {
    pub pending: i64,
    pub completed: i64,
    pub cancelled: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseCounts {
    pub positive: i64,
    pub neutral: i64,
    pub negative: i64,
    pub no_response: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpStats {
    pub total: i64,
    pub by_status: FollowUpStatusCounts,
    pub by_response: ResponseCounts,
    /// Pending and past their scheduled date.
    pub overdue: i64,
    pub urgent_pending: i64,
    /// Completed as a percentage of follow-ups that were not cancelled.
    pub completion_rate: f64,
}

/// `part / whole` as a percentage rounded to two decimals; zero for an empty whole.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    (part as f64 * 10_000.0 / whole as f64).round() / 100.0
}

pub fn visitor_stats(grouped: &[(VisitorStatus, i64)], monthly: Vec<MonthlyCount>) -> VisitorStats {
    let mut by_status = VisitorStatusCounts::default();
    for &(status, count) in grouped {
        let slot = match status {
            VisitorStatus::New => &mut by_status.new,
            VisitorStatus::Contacted => &mut by_status.contacted,
            VisitorStatus::Converted => &mut by_status.converted,
            VisitorStatus::Inactive => &mut by_status.inactive,
        };
        *slot += count;
    }
    let total = by_status.new + by_status.contacted + by_status.converted + by_status.inactive;
    VisitorStats {
        total,
        conversion_rate: percentage(by_status.converted, total),
        by_status,
        monthly,
    }
}

pub fn follow_up_stats(
    grouped: &[(FollowUpStatus, Option<FollowUpResponse>, i64)],
    overdue: i64,
    urgent_pending: i64,
) -> FollowUpStats {
    let mut by_status = FollowUpStatusCounts::default();
    let mut by_response = ResponseCounts::default();
    for &(status, response, count) in grouped {
        match status {
            FollowUpStatus::Pending => by_status.pending += count,
            FollowUpStatus::Completed => by_status.completed += count,
            FollowUpStatus::Cancelled => by_status.cancelled += count,
        }
        match response {
            Some(FollowUpResponse::Positive) => by_response.positive += count,
            Some(FollowUpResponse::Neutral) => by_response.neutral += count,
            Some(FollowUpResponse::Negative) => by_response.negative += count,
            Some(FollowUpResponse::NoResponse) => by_response.no_response += count,
            None => {}
        }
    }
    let total = by_status.pending + by_status.completed + by_status.cancelled;
    FollowUpStats {
        total,
        completion_rate: percentage(by_status.completed, total - by_status.cancelled),
        by_status,
        by_response,
        overdue,
        urgent_pending,
    }
}

async fn load_visitor_stats(pool: &PgPool, query: &AnalyticsQuery) -> Result<VisitorStats, sqlx::Error> {
    let mut grouped = QueryBuilder::<Postgres>::new("SELECT status, COUNT(*) FROM visitors WHERE TRUE");
    query.push_range("visit_date", &mut grouped);
    grouped.push(" GROUP BY status");
    let grouped: Vec<(VisitorStatus, i64)> = grouped.build_query_as().fetch_all(pool).await?;

    let mut monthly = QueryBuilder::<Postgres>::new(
        "SELECT to_char(date_trunc('month', visit_date), 'YYYY-MM') AS month, COUNT(*) \
         FROM visitors WHERE TRUE",
    );
    query.push_range("visit_date", &mut monthly);
    monthly.push(" GROUP BY 1 ORDER BY 1");
    let monthly: Vec<(String, i64)> = monthly.build_query_as().fetch_all(pool).await?;

    Ok(visitor_stats(
        &grouped,
        monthly
            .into_iter()
            .map(|(month, count)| MonthlyCount { month, count })
            .collect(),
    ))
}

async fn load_follow_up_stats(pool: &PgPool, query: &AnalyticsQuery) -> Result<FollowUpStats, sqlx::Error> {
    let push_scope = |qb: &mut QueryBuilder<'static, Postgres>| {
        if let Some(assigned_to) = query.assigned_to {
            qb.push(" AND assigned_to = ").push_bind(assigned_to);
        }
        query.push_range("scheduled_date", qb);
    };

    let mut grouped =
        QueryBuilder::<Postgres>::new("SELECT status, response, COUNT(*) FROM follow_ups WHERE TRUE");
    push_scope(&mut grouped);
    grouped.push(" GROUP BY status, response");
    let grouped: Vec<(FollowUpStatus, Option<FollowUpResponse>, i64)> =
        grouped.build_query_as().fetch_all(pool).await?;

    let mut open = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FILTER (WHERE scheduled_date < ");
    open.push_bind(Utc::now());
    open.push("), COUNT(*) FILTER (WHERE is_urgent) FROM follow_ups WHERE status = 'pending'");
    push_scope(&mut open);
    let (overdue, urgent_pending): (i64, i64) = open.build_query_as().fetch_one(pool).await?;

    Ok(follow_up_stats(&grouped, overdue, urgent_pending))
}

/// GET /api/analytics/visitors
pub async fn handle_visitor_stats(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<VisitorStats>, AppError> {
    Ok(Json(load_visitor_stats(&state.db, &query).await?))
}

/// GET /api/analytics/follow-ups
pub async fn handle_follow_up_stats(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<FollowUpStats>, AppError> {
    Ok(Json(load_follow_up_stats(&state.db, &query).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(5, 5), 100.0);
    }

    #[test]
    fn test_visitor_stats() {
        let stats = visitor_stats(
            &[
                (VisitorStatus::New, 5),
                (VisitorStatus::Contacted, 3),
                (VisitorStatus::Converted, 2),
            ],
            vec![MonthlyCount {
                month: "2024-01".to_string(),
                count: 10,
            }],
        );
        assert_eq!(stats.total, 10);
        assert_eq!(stats.by_status.inactive, 0);
        assert_eq!(stats.conversion_rate, 20.0);
        assert_eq!(stats.monthly.len(), 1);
    }

    #[test]
    fn test_follow_up_stats_ignore_cancelled_in_rate() {
        let stats = follow_up_stats(
            &[
                (FollowUpStatus::Pending, None, 2),
                (FollowUpStatus::Completed, Some(FollowUpResponse::Positive), 4),
                (FollowUpStatus::Completed, Some(FollowUpResponse::NoResponse), 2),
                (FollowUpStatus::Cancelled, None, 3),
            ],
            1,
            2,
        );
        assert_eq!(stats.total, 11);
        assert_eq!(stats.by_status.completed, 6);
        assert_eq!(stats.by_response.positive, 4);
        assert_eq!(stats.by_response.no_response, 2);
        assert_eq!(stats.completion_rate, 75.0);
        assert_eq!(stats.overdue, 1);
    }

    #[test]
    fn test_empty_stats_are_zero() {
        let stats = follow_up_stats(&[], 0, 0);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completion_rate, 0.0);
        assert_eq!(visitor_stats(&[], vec![]).conversion_rate, 0.0);
    }

    #[test]
    fn test_range_sql() {
        let query = AnalyticsQuery {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30),
            assigned_to: None,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT status, COUNT(*) FROM visitors WHERE TRUE");
        query.push_range("visit_date", &mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT status, COUNT(*) FROM visitors WHERE TRUE AND visit_date >= $1 AND visit_date < $2"
        );
    }
}
