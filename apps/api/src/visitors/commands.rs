use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::dates;
use crate::errors::AppError;
use crate::models::visitor::VisitorStatus;

const MAX_NAME_LEN: usize = 100;

/// Request body for POST /api/visitors.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateVisitor {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Defaults to the time of the request when omitted.
    #[serde(default, deserialize_with = "dates::flexible_opt")]
    pub visit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<VisitorStatus>,
    #[serde(default)]
    pub how_did_you_hear: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateVisitor {
    /// Trims and normalizes every field, rejecting anything that cannot be stored.
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.first_name = required_name("firstName", &self.first_name)?;
        self.last_name = required_name("lastName", &self.last_name)?;
        self.email = normalize_email(self.email)?;
        self.phone = normalize_phone(self.phone)?;
        self.address = non_blank(self.address);
        self.how_did_you_hear = non_blank(self.how_did_you_hear);
        self.notes = non_blank(self.notes);
        Ok(self)
    }
}

/// Request body for PUT /api/visitors/:id. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateVisitor {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "dates::flexible_opt")]
    pub visit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<VisitorStatus>,
    #[serde(default)]
    pub how_did_you_hear: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateVisitor {
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.first_name = self
            .first_name
            .map(|n| required_name("firstName", &n))
            .transpose()?;
        self.last_name = self
            .last_name
            .map(|n| required_name("lastName", &n))
            .transpose()?;
        self.email = normalize_email(self.email)?;
        self.phone = normalize_phone(self.phone)?;
        self.address = non_blank(self.address);
        self.how_did_you_hear = non_blank(self.how_did_you_hear);
        self.notes = non_blank(self.notes);
        Ok(self)
    }
}

fn required_name(field: &str, raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

pub(crate) fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn normalize_email(raw: Option<String>) -> Result<Option<String>, AppError> {
    let Some(email) = non_blank(raw) else {
        return Ok(None);
    };
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.ends_with('.'))
        .unwrap_or(false);
    if !valid || email.contains(char::is_whitespace) {
        return Err(AppError::Validation(format!("'{email}' is not a valid email")));
    }
    Ok(Some(email.to_lowercase()))
}

fn normalize_phone(raw: Option<String>) -> Result<Option<String>, AppError> {
    let Some(phone) = non_blank(raw) else {
        return Ok(None);
    };
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')' | '.'));
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !allowed || !(7..=15).contains(&digits) {
        return Err(AppError::Validation(format!("'{phone}' is not a valid phone number")));
    }
    Ok(Some(phone))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(json: &str) -> Result<CreateVisitor, AppError> {
        serde_json::from_str::<CreateVisitor>(json)
            .map_err(|e| AppError::Validation(e.to_string()))?
            .validate()
    }

    #[test]
    fn test_minimal_visitor() {
        let v = parse(r#"{"firstName":"Ana","lastName":"Lopez","visitDate":"2024-01-07"}"#).unwrap();
        assert_eq!(v.first_name, "Ana");
        assert_eq!(
            v.visit_date,
            Some(Utc.with_ymd_and_hms(2024, 1, 7, 0, 0, 0).unwrap())
        );
        assert_eq!(v.status, None);
    }

    #[test]
    fn test_fields_are_trimmed_and_email_lowercased() {
        let v = parse(
            r#"{"firstName":"  Maria ","lastName":"Silva","email":" Maria@Example.ORG ","notes":"   "}"#,
        )
        .unwrap();
        assert_eq!(v.first_name, "Maria");
        assert_eq!(v.email.as_deref(), Some("maria@example.org"));
        assert_eq!(v.notes, None);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(parse(r#"{"firstName":"Ana","lastName":"Lopez","role":"admin"}"#).is_err());
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(matches!(
            parse(r#"{"firstName":"  ","lastName":"Lopez"}"#),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_bad_email_rejected() {
        assert!(parse(r#"{"firstName":"Ana","lastName":"Lopez","email":"ana@localhost"}"#).is_err());
        assert!(parse(r#"{"firstName":"Ana","lastName":"Lopez","email":"@x.org"}"#).is_err());
    }

    #[test]
    fn test_phone_validation() {
        assert!(parse(r#"{"firstName":"Ana","lastName":"Lopez","phone":"+1 (555) 010-2030"}"#).is_ok());
        assert!(parse(r#"{"firstName":"Ana","lastName":"Lopez","phone":"call me"}"#).is_err());
        assert!(parse(r#"{"firstName":"Ana","lastName":"Lopez","phone":"123"}"#).is_err());
    }

    #[test]
    fn test_bad_date_rejected() {
        assert!(parse(r#"{"firstName":"Ana","lastName":"Lopez","visitDate":"sunday"}"#).is_err());
    }

    #[test]
    fn test_update_keeps_absent_fields_none() {
        let u: UpdateVisitor = serde_json::from_str(r#"{"status":"contacted"}"#).unwrap();
        let u = u.validate().unwrap();
        assert_eq!(u.status, Some(VisitorStatus::Contacted));
        assert!(u.first_name.is_none());
    }

    #[test]
    fn test_update_rejects_blank_name() {
        let u: UpdateVisitor = serde_json::from_str(r#"{"lastName":""}"#).unwrap();
        assert!(u.validate().is_err());
    }
}
