use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::content::PublicationStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PodcastRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub speaker: Option<String>,
    pub series: Option<String>,
    pub duration_seconds: Option<i32>,
    pub audio_key: Option<String>,
    pub status: PublicationStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
