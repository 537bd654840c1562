use serde::Deserialize;

use crate::errors::AppError;
use crate::models::prayer_request::PrayerStatus;
use crate::visitors::commands::non_blank;

const MAX_TITLE_LEN: usize = 200;
const MAX_TEXT_LEN: usize = 5_000;

/// Request body for POST /api/prayer-requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePrayerRequest {
    pub title: String,
    pub request: String,
    #[serde(default)]
    pub requester_name: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

fn default_public() -> bool {
    true
}

impl CreatePrayerRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.title = bounded_text("title", &self.title, MAX_TITLE_LEN)?;
        self.request = bounded_text("request", &self.request, MAX_TEXT_LEN)?;
        self.requester_name = non_blank(self.requester_name);
        Ok(self)
    }
}

/// Request body for PUT /api/prayer-requests/:id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePrayerRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub request: Option<String>,
    #[serde(default)]
    pub requester_name: Option<String>,
    #[serde(default)]
    pub is_anonymous: Option<bool>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub status: Option<PrayerStatus>,
}

impl UpdatePrayerRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.title = self
            .title
            .map(|t| bounded_text("title", &t, MAX_TITLE_LEN))
            .transpose()?;
        self.request = self
            .request
            .map(|r| bounded_text("request", &r, MAX_TEXT_LEN))
            .transpose()?;
        self.requester_name = non_blank(self.requester_name);
        Ok(self)
    }
}

/// Request body for POST /api/prayer-requests/:id/comments.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddComment {
    pub body: String,
}

impl AddComment {
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.body = bounded_text("body", &self.body, MAX_TEXT_LEN)?;
        Ok(self)
    }
}

fn bounded_text(field: &str, raw: &str, max: usize) -> Result<String, AppError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if text.chars().count() > max {
        return Err(AppError::Validation(format!("{field} must be at most {max} characters")));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_defaults_to_public_named_request() {
        let cmd: CreatePrayerRequest =
            serde_json::from_str(r#"{"title":"Healing","request":"For my mother's recovery"}"#).unwrap();
        let cmd = cmd.validate().unwrap();
        assert!(cmd.is_public);
        assert!(!cmd.is_anonymous);
    }

    #[test]
    fn test_empty_request_rejected() {
        let cmd: CreatePrayerRequest =
            serde_json::from_str(r#"{"title":"Healing","request":"   "}"#).unwrap();
        assert!(matches!(cmd.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_comment_is_trimmed_and_bounded() {
        let c = AddComment {
            body: "  Praying with you  ".to_string(),
        };
        assert_eq!(c.validate().unwrap().body, "Praying with you");

        let long = AddComment {
            body: "x".repeat(MAX_TEXT_LEN + 1),
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_update_status_parses() {
        let u: UpdatePrayerRequest = serde_json::from_str(r#"{"status":"answered"}"#).unwrap();
        assert_eq!(u.validate().unwrap().status, Some(PrayerStatus::Answered));
    }
}
