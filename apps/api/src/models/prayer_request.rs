use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "prayer_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PrayerStatus {
    #[default]
    Active,
    Answered,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrayerComment {
    pub id: Uuid,
    pub author: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PrayerRequestRow {
    pub id: Uuid,
    pub title: String,
    pub request: String,
    pub requester_name: Option<String>,
    pub is_anonymous: bool,
    pub is_public: bool,
    pub status: PrayerStatus,
    pub prayed_by: Vec<Uuid>,
    pub comments: Json<Vec<PrayerComment>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
