use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reminder_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReminderType {
    FollowUp,
    Birthday,
    Anniversary,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reminder_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    #[default]
    Pending,
    Completed,
    Snoozed,
    Cancelled,
}

impl ReminderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ReminderStatus::Completed | ReminderStatus::Cancelled)
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Completed => "completed",
            ReminderStatus::Snoozed => "snoozed",
            ReminderStatus::Cancelled => "cancelled",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recurrence", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub reminder_type: ReminderType,
    pub due_date: DateTime<Utc>,
    pub status: ReminderStatus,
    pub recurrence: Recurrence,
    pub snoozed_until: Option<DateTime<Utc>>,
    pub visitor_id: Option<Uuid>,
    pub assigned_to: Uuid,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
