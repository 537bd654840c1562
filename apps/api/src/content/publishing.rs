use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::content::PublicationStatus;

/// `published_at` after moving to `next`.
///
/// The first publication is stamped and kept through archiving and
/// republishing; going back to draft clears it.
pub fn published_at_after(
    next: PublicationStatus,
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match next {
        PublicationStatus::Draft => None,
        PublicationStatus::Published => Some(current.unwrap_or(now)),
        PublicationStatus::Archived => current,
    }
}

/// URL slug: lowercase ASCII letters and digits separated by single hyphens.
pub fn slugify(raw: &str) -> Result<String, AppError> {
    let mut slug = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        return Err(AppError::Validation(format!(
            "cannot derive a slug from '{raw}'"
        )));
    }
    Ok(slug)
}

/// Trims and lowercases tags, dropping blanks and duplicates while keeping order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Sunday Service: Hope & Grace!").unwrap(), "sunday-service-hope-grace");
        assert_eq!(slugify("  --Easter 2024--  ").unwrap(), "easter-2024");
        assert_eq!(slugify("already-a-slug").unwrap(), "already-a-slug");
        assert!(slugify("!!!").is_err());
    }

    #[test]
    fn test_non_ascii_letters_become_separators() {
        assert_eq!(slugify("Café Night").unwrap(), "caf-night");
    }

    #[test]
    fn test_published_at_transitions() {
        let first = Utc::now() - Duration::days(3);
        let now = Utc::now();
        assert_eq!(published_at_after(PublicationStatus::Published, None, now), Some(now));
        assert_eq!(
            published_at_after(PublicationStatus::Published, Some(first), now),
            Some(first)
        );
        assert_eq!(
            published_at_after(PublicationStatus::Archived, Some(first), now),
            Some(first)
        );
        assert_eq!(published_at_after(PublicationStatus::Draft, Some(first), now), None);
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec![" Faith ".to_string(), "faith".to_string(), "".to_string(), "Youth".to_string()];
        assert_eq!(normalize_tags(tags), vec!["faith", "youth"]);
    }
}
