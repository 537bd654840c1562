use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "follow_up_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FollowUpType {
    Phone,
    Whatsapp,
    Email,
    Visit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "follow_up_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FollowUpStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl FollowUpStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, FollowUpStatus::Completed | FollowUpStatus::Cancelled)
    }
}

impl fmt::Display for FollowUpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FollowUpStatus::Pending => "pending",
            FollowUpStatus::Completed => "completed",
            FollowUpStatus::Cancelled => "cancelled",
        })
    }
}

impl fmt::Display for FollowUpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FollowUpType::Phone => "phone",
            FollowUpType::Whatsapp => "whatsapp",
            FollowUpType::Email => "email",
            FollowUpType::Visit => "visit",
        })
    }
}

/// Outcome recorded when a follow-up is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "follow_up_response", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FollowUpResponse {
    Positive,
    Neutral,
    Negative,
    NoResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpRow {
    pub id: Uuid,
    pub visitor_id: Uuid,
    pub follow_up_type: FollowUpType,
    pub status: FollowUpStatus,
    pub scheduled_date: DateTime<Utc>,
    pub completed_date: Option<DateTime<Utc>>,
    pub response: Option<FollowUpResponse>,
    pub notes: Option<String>,
    pub assigned_to: Uuid,
    pub is_urgent: bool,
    pub next_follow_up: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
