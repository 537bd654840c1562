use anyhow::{Context, Result};
use serde::Serialize;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub port: u16,
    pub rust_log: String,
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub audit_channel_capacity: usize,
    pub max_upload_bytes: usize,
    pub default_currency: String,
    pub church: ChurchProfile,
}

/// Branding and contact details rendered into outgoing messages.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChurchProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub website: String,
}

impl Default for ChurchProfile {
    fn default() -> Self {
        Self {
            name: "Our Church".to_string(),
            email: "hello@example.org".to_string(),
            phone: String::new(),
            website: String::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = ChurchProfile::default();
        let max_page_size: i64 = parse_env("MAX_PAGE_SIZE", 100)?;
        let default_page_size: i64 = parse_env("DEFAULT_PAGE_SIZE", 20)?;
        if max_page_size < 1 || default_page_size < 1 {
            anyhow::bail!("MAX_PAGE_SIZE and DEFAULT_PAGE_SIZE must be at least 1");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            default_page_size: default_page_size.min(max_page_size),
            max_page_size,
            audit_channel_capacity: parse_env("AUDIT_CHANNEL_CAPACITY", 1024)?,
            max_upload_bytes: parse_env::<usize>("MAX_UPLOAD_MB", 200)? * 1024 * 1024,
            default_currency: std::env::var("DEFAULT_CURRENCY")
                .unwrap_or_else(|_| "USD".to_string())
                .to_uppercase(),
            church: ChurchProfile {
                name: std::env::var("CHURCH_NAME").unwrap_or(defaults.name),
                email: std::env::var("CHURCH_EMAIL").unwrap_or(defaults.email),
                phone: std::env::var("CHURCH_PHONE").unwrap_or(defaults.phone),
                website: std::env::var("CHURCH_WEBSITE").unwrap_or(defaults.website),
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
