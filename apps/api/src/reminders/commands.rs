use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::dates;
use crate::errors::AppError;
use crate::models::reminder::{Recurrence, ReminderType};
use crate::visitors::commands::non_blank;

const MAX_TITLE_LEN: usize = 200;

/// Request body for POST /api/reminders.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateReminder {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub reminder_type: ReminderType,
    #[serde(deserialize_with = "dates::flexible")]
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub visitor_id: Option<Uuid>,
    /// Defaults to the acting staff member.
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
}

impl CreateReminder {
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.title = required_title(&self.title)?;
        self.description = non_blank(self.description);
        Ok(self)
    }
}

/// Request body for PUT /api/reminders/:id. Status changes go through the transition endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateReminder {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reminder_type: Option<ReminderType>,
    #[serde(default, deserialize_with = "dates::flexible_opt")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub visitor_id: Option<Uuid>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
}

impl UpdateReminder {
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.title = self.title.map(|t| required_title(&t)).transpose()?;
        self.description = non_blank(self.description);
        Ok(self)
    }
}

/// Request body for POST /api/reminders/:id/snooze.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SnoozeReminder {
    #[serde(deserialize_with = "dates::flexible")]
    pub snoozed_until: DateTime<Utc>,
}

fn required_title(raw: &str) -> Result<String, AppError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_defaults_to_no_recurrence() {
        let cmd: CreateReminder = serde_json::from_str(
            r#"{"title":" Call Maria ","reminderType":"birthday","dueDate":"2024-03-02"}"#,
        )
        .unwrap();
        let cmd = cmd.validate().unwrap();
        assert_eq!(cmd.title, "Call Maria");
        assert_eq!(cmd.recurrence, Recurrence::None);
        assert_eq!(cmd.assigned_to, None);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let parsed = serde_json::from_str::<CreateReminder>(
            r#"{"title":"x","reminderType":"holiday","dueDate":"2024-03-02"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_blank_title_rejected() {
        let cmd: CreateReminder =
            serde_json::from_str(r#"{"title":"  ","reminderType":"custom","dueDate":"2024-03-02"}"#)
                .unwrap();
        assert!(matches!(cmd.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_update_rejects_status_field() {
        assert!(serde_json::from_str::<UpdateReminder>(r#"{"status":"completed"}"#).is_err());
    }

    #[test]
    fn test_snooze_accepts_timestamp() {
        let cmd: SnoozeReminder =
            serde_json::from_str(r#"{"snoozedUntil":"2030-01-01T09:00:00Z"}"#).unwrap();
        assert_eq!(cmd.snoozed_until.to_rfc3339(), "2030-01-01T09:00:00+00:00");
    }
}
