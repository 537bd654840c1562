use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::audit::AuditSink;
use crate::config::Config;
use crate::pagination::{PageParams, Pagination};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Media bucket client (podcast audio).
    pub s3: S3Client,
    pub config: Config,
    /// Producer side of the audit channel; the writer task owns the receiver.
    pub audit: AuditSink,
}

impl AppState {
    /// Resolves raw `page`/`limit` query values against the configured page sizes.
    pub fn pagination(&self, params: PageParams) -> Pagination {
        Pagination::resolve(
            params,
            self.config.default_page_size,
            self.config.max_page_size,
        )
    }
}
