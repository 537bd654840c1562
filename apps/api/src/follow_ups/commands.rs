use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::dates;
use crate::errors::AppError;
use crate::models::follow_up::{FollowUpResponse, FollowUpStatus, FollowUpType};
use crate::visitors::commands::non_blank;

/// Request body for POST /api/visitors/:id/follow-up.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateFollowUp {
    pub follow_up_type: FollowUpType,
    #[serde(deserialize_with = "dates::flexible")]
    pub scheduled_date: DateTime<Utc>,
    /// Defaults to the acting staff member.
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default, deserialize_with = "dates::flexible_opt")]
    pub next_follow_up: Option<DateTime<Utc>>,
}

impl CreateFollowUp {
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.notes = non_blank(self.notes);
        if matches!(self.next_follow_up, Some(next) if next <= self.scheduled_date) {
            return Err(AppError::Validation(
                "nextFollowUp must be after scheduledDate".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Request body for PUT /api/follow-ups/:id.
///
/// `status` drives the same transitions as the dedicated endpoints;
/// `response` is only accepted together with `status: "completed"`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateFollowUp {
    #[serde(default)]
    pub follow_up_type: Option<FollowUpType>,
    #[serde(default, deserialize_with = "dates::flexible_opt")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_urgent: Option<bool>,
    #[serde(default, deserialize_with = "dates::flexible_opt")]
    pub next_follow_up: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<FollowUpStatus>,
    #[serde(default)]
    pub response: Option<FollowUpResponse>,
}

impl UpdateFollowUp {
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.notes = non_blank(self.notes);
        if self.response.is_some() && self.status != Some(FollowUpStatus::Completed) {
            return Err(AppError::Validation(
                "response can only be set when status is 'completed'".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Request body for POST /api/follow-ups/:id/complete.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompleteFollowUp {
    pub response: FollowUpResponse,
    #[serde(default)]
    pub notes: Option<String>,
}
