use serde::Deserialize;

use crate::content::publishing::{normalize_tags, slugify};
use crate::errors::AppError;
use crate::models::content::PublicationStatus;
use crate::visitors::commands::non_blank;

const MAX_TITLE_LEN: usize = 200;

/// Request body for POST /api/content.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePost {
    pub title: String,
    /// Derived from the title when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    pub body: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: PublicationStatus,
}

impl CreatePost {
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.title = required_title(&self.title)?;
        self.slug = Some(slugify(self.slug.as_deref().unwrap_or(&self.title))?);
        if self.body.trim().is_empty() {
            return Err(AppError::Validation("body is required".to_string()));
        }
        self.excerpt = non_blank(self.excerpt);
        self.tags = normalize_tags(self.tags);
        Ok(self)
    }
}

/// Request body for PUT /api/content/:id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePost {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<PublicationStatus>,
}

impl UpdatePost {
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.title = self.title.map(|t| required_title(&t)).transpose()?;
        self.slug = self.slug.map(|s| slugify(&s)).transpose()?;
        if matches!(&self.body, Some(body) if body.trim().is_empty()) {
            return Err(AppError::Validation("body cannot be empty".to_string()));
        }
        self.excerpt = non_blank(self.excerpt);
        self.tags = self.tags.map(normalize_tags);
        Ok(self)
    }
}

/// Request body for POST /api/podcasts. Audio is uploaded separately.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePodcast {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<i32>,
    #[serde(default)]
    pub status: PublicationStatus,
}

impl CreatePodcast {
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.title = required_title(&self.title)?;
        self.description = non_blank(self.description);
        self.speaker = non_blank(self.speaker);
        self.series = non_blank(self.series);
        validate_duration(self.duration_seconds)?;
        Ok(self)
    }
}

/// Request body for PUT /api/podcasts/:id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePodcast {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<i32>,
    #[serde(default)]
    pub status: Option<PublicationStatus>,
}

impl UpdatePodcast {
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.title = self.title.map(|t| required_title(&t)).transpose()?;
        self.description = non_blank(self.description);
        self.speaker = non_blank(self.speaker);
        self.series = non_blank(self.series);
        validate_duration(self.duration_seconds)?;
        Ok(self)
    }
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

fn validate_duration(duration: Option<i32>) -> Result<(), AppError> {
    if matches!(duration, Some(d) if d < 0) {
        return Err(AppError::Validation("durationSeconds cannot be negative".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_derived_from_title() {
        let cmd: CreatePost = serde_json::from_str(
            r#"{"title":"Walking in Faith","body":"...","tags":["Faith"," faith "]}"#,
        )
        .unwrap();
        let cmd = cmd.validate().unwrap();
        assert_eq!(cmd.slug.as_deref(), Some("walking-in-faith"));
        assert_eq!(cmd.tags, vec!["faith"]);
        assert_eq!(cmd.status, PublicationStatus::Draft);
    }

    #[test]
    fn test_explicit_slug_is_normalized() {
        let cmd: CreatePost =
            serde_json::from_str(r#"{"title":"x","slug":"My Custom Slug","body":"b"}"#).unwrap();
        assert_eq!(cmd.validate().unwrap().slug.as_deref(), Some("my-custom-slug"));
    }

    #[test]
    fn test_empty_body_rejected() {
        let cmd: CreatePost = serde_json::from_str(r#"{"title":"x","body":"  "}"#).unwrap();
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn test_podcast_negative_duration_rejected() {
        let cmd: CreatePodcast =
            serde_json::from_str(r#"{"title":"Sermon","durationSeconds":-3}"#).unwrap();
        assert!(matches!(cmd.validate(), Err(AppError::Validation(_))));
    }
}
