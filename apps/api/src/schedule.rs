use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::follow_ups;
use crate::reminders;
use crate::scheduling::{build_due_queue, DueItem, Schedulable};
use crate::state::AppState;

const DEFAULT_WINDOW_HOURS: i64 = 24;
const MAX_WINDOW_HOURS: i64 = 24 * 90;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueQuery {
    pub assigned_to: Option<Uuid>,
    /// How far ahead to look; overdue items are always included.
    pub within_hours: Option<i64>,
}

impl DueQuery {
    fn window(&self) -> Result<Duration, AppError> {
        let hours = self.within_hours.unwrap_or(DEFAULT_WINDOW_HOURS);
        if !(0..=MAX_WINDOW_HOURS).contains(&hours) {
            return Err(AppError::Validation(format!(
                "withinHours must be between 0 and {MAX_WINDOW_HOURS}"
            )));
        }
        Ok(Duration::hours(hours))
    }
}

/// GET /api/schedule/due
///
/// One queue of open follow-ups and reminders, urgent first, then by due time.
pub async fn handle_due(
    State(state): State<AppState>,
    Query(query): Query<DueQuery>,
) -> Result<Json<Vec<DueItem>>, AppError> {
    let now = Utc::now();
    let horizon = now + query.window()?;

    let (follow_ups, reminders) = tokio::try_join!(
        follow_ups::service::open_due_before(&state.db, query.assigned_to, horizon),
        reminders::service::open_due_before(&state.db, query.assigned_to, horizon),
    )?;

    let tasks = follow_ups
        .iter()
        .map(|f| f as &dyn Schedulable)
        .chain(reminders.iter().map(|r| r as &dyn Schedulable));

    Ok(Json(build_due_queue(tasks, now, horizon)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_defaults_to_a_day() {
        assert_eq!(DueQuery::default().window().unwrap(), Duration::hours(24));
    }

    #[test]
    fn test_window_bounds() {
        let q = DueQuery {
            within_hours: Some(-1),
            ..Default::default()
        };
        assert!(matches!(q.window(), Err(AppError::Validation(_))));

        let q = DueQuery {
            within_hours: Some(0),
            ..Default::default()
        };
        assert_eq!(q.window().unwrap(), Duration::zero());
    }
}
