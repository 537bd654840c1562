//! Outgoing message rendering.
//!
//! Church branding comes in as a `ChurchProfile` argument so rendering stays
//! a pure function of its inputs.

use serde::Serialize;

use crate::config::ChurchProfile;
use crate::models::visitor::VisitorRow;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmailMessage {
    /// `None` when the visitor left no email address; the preview is still rendered.
    pub to: Option<String>,
    pub subject: String,
    pub body: String,
}

pub fn render_welcome_email(church: &ChurchProfile, visitor: &VisitorRow) -> EmailMessage {
    let greeting_name = if visitor.first_name.is_empty() {
        visitor.full_name()
    } else {
        visitor.first_name.clone()
    };

    let mut body = format!(
        "Dear {greeting_name},\n\n\
         Thank you for worshipping with us at {church} on {date}. \
         It was a joy to have you, and we hope you felt at home.\n\n\
         Someone from our team will be in touch over the next few days. \
         If you have any questions or prayer needs in the meantime, simply reply to this email",
        church = church.name,
        date = visitor.visit_date.format("%B %-d, %Y"),
    );
    if !church.phone.is_empty() {
        body.push_str(&format!(" or call us on {}", church.phone));
    }
    body.push_str(".\n\n");
    if !church.website.is_empty() {
        body.push_str(&format!(
            "You can find service times and upcoming events at {}.\n\n",
            church.website
        ));
    }
    body.push_str(&format!("Blessings,\n{}\n{}", church.name, church.email));

    EmailMessage {
        to: visitor.email.clone(),
        subject: format!("Welcome to {}, {greeting_name}!", church.name),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::visitor::VisitorStatus;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn visitor(email: Option<&str>) -> VisitorRow {
        let visit = Utc.with_ymd_and_hms(2024, 1, 7, 10, 0, 0).unwrap();
        VisitorRow {
            id: Uuid::new_v4(),
            first_name: "Maria".to_string(),
            last_name: "Silva".to_string(),
            email: email.map(str::to_string),
            phone: None,
            address: None,
            visit_date: visit,
            status: VisitorStatus::New,
            how_did_you_hear: None,
            notes: None,
            created_by: Uuid::new_v4(),
            created_at: visit,
            updated_at: visit,
        }
    }

    fn church() -> ChurchProfile {
        ChurchProfile {
            name: "Grace Fellowship".to_string(),
            email: "office@grace.example".to_string(),
            phone: "+1 555 0100".to_string(),
            website: "https://grace.example".to_string(),
        }
    }

    #[test]
    fn test_welcome_email_uses_profile_and_visit() {
        let msg = render_welcome_email(&church(), &visitor(Some("maria@example.org")));
        assert_eq!(msg.to.as_deref(), Some("maria@example.org"));
        assert_eq!(msg.subject, "Welcome to Grace Fellowship, Maria!");
        assert!(msg.body.starts_with("Dear Maria,"));
        assert!(msg.body.contains("January 7, 2024"));
        assert!(msg.body.contains("or call us on +1 555 0100."));
        assert!(msg.body.contains("https://grace.example"));
        assert!(msg.body.ends_with("Grace Fellowship\noffice@grace.example"));
    }

    #[test]
    fn test_optional_contact_lines_are_omitted() {
        let profile = ChurchProfile {
            phone: String::new(),
            website: String::new(),
            ..church()
        };
        let msg = render_welcome_email(&profile, &visitor(None));
        assert_eq!(msg.to, None);
        assert!(!msg.body.contains("call us"));
        assert!(!msg.body.contains("service times"));
        assert!(msg.body.contains("simply reply to this email.\n\n"));
    }
}
