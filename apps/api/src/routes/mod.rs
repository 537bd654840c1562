pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::audit::{handlers as audit, middleware::audit_requests};
use crate::auth::require_actor;
use crate::content::handlers as content;
use crate::finance::handlers as finance;
use crate::follow_ups::handlers as follow_ups;
use crate::prayer::handlers as prayer;
use crate::reminders::handlers as reminders;
use crate::state::AppState;
use crate::visitors::handlers as visitors;
use crate::{analytics, schedule};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .merge(api_routes(&state))
        .with_state(state)
}

/// Every route under `/api`: staff-only, and wrapped in the audit middleware
/// so rejected calls are recorded too.
fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Visitors
        .route(
            "/api/visitors",
            get(visitors::handle_list).post(visitors::handle_create),
        )
        .route(
            "/api/visitors/:id",
            get(visitors::handle_get)
                .put(visitors::handle_update)
                .delete(visitors::handle_delete),
        )
        .route(
            "/api/visitors/:id/welcome-email",
            get(visitors::handle_welcome_email),
        )
        .route(
            "/api/visitors/:id/follow-up",
            post(follow_ups::handle_create_for_visitor),
        )
        .route(
            "/api/visitors/:id/follow-ups",
            get(follow_ups::handle_list_for_visitor),
        )
        // Follow-ups
        .route("/api/follow-ups", get(follow_ups::handle_list))
        .route(
            "/api/follow-ups/:id",
            get(follow_ups::handle_get)
                .put(follow_ups::handle_update)
                .delete(follow_ups::handle_delete),
        )
        .route(
            "/api/follow-ups/:id/complete",
            post(follow_ups::handle_complete),
        )
        .route("/api/follow-ups/:id/cancel", post(follow_ups::handle_cancel))
        // Reminders
        .route(
            "/api/reminders",
            get(reminders::handle_list).post(reminders::handle_create),
        )
        .route(
            "/api/reminders/:id",
            get(reminders::handle_get)
                .put(reminders::handle_update)
                .delete(reminders::handle_delete),
        )
        .route(
            "/api/reminders/:id/complete",
            post(reminders::handle_complete),
        )
        .route("/api/reminders/:id/snooze", post(reminders::handle_snooze))
        .route(
            "/api/reminders/:id/reactivate",
            post(reminders::handle_reactivate),
        )
        .route("/api/reminders/:id/cancel", post(reminders::handle_cancel))
        .route("/api/schedule/due", get(schedule::handle_due))
        // Analytics and audit trail
        .route(
            "/api/analytics/visitors",
            get(analytics::handle_visitor_stats),
        )
        .route(
            "/api/analytics/follow-ups",
            get(analytics::handle_follow_up_stats),
        )
        .route("/api/audit-logs", get(audit::handle_list_audit_logs))
        // Finance
        .route(
            "/api/finances",
            get(finance::handle_list).post(finance::handle_create),
        )
        .route("/api/finances/summary", get(finance::handle_summary))
        .route(
            "/api/finances/:id",
            get(finance::handle_get)
                .put(finance::handle_update)
                .delete(finance::handle_delete),
        )
        // Prayer requests
        .route(
            "/api/prayer-requests",
            get(prayer::handle_list).post(prayer::handle_create),
        )
        .route(
            "/api/prayer-requests/:id",
            get(prayer::handle_get)
                .put(prayer::handle_update)
                .delete(prayer::handle_delete),
        )
        .route("/api/prayer-requests/:id/pray", post(prayer::handle_pray))
        .route(
            "/api/prayer-requests/:id/comments",
            post(prayer::handle_comment),
        )
        // Content
        .route(
            "/api/content",
            get(content::handle_list_posts).post(content::handle_create_post),
        )
        .route(
            "/api/content/:id",
            get(content::handle_get_post)
                .put(content::handle_update_post)
                .delete(content::handle_delete_post),
        )
        .route(
            "/api/content/:id/publish",
            post(content::handle_publish_post),
        )
        .route(
            "/api/podcasts",
            get(content::handle_list_podcasts).post(content::handle_create_podcast),
        )
        .route(
            "/api/podcasts/:id",
            get(content::handle_get_podcast)
                .put(content::handle_update_podcast)
                .delete(content::handle_delete_podcast),
        )
        .route(
            "/api/podcasts/:id/audio",
            post(content::handle_upload_audio)
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        )
        .route_layer(middleware::from_fn(require_actor))
        .layer(middleware::from_fn_with_state(
            state.audit.clone(),
            audit_requests,
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::audit::{AuditEvent, AuditSink};
    use crate::config::{ChurchProfile, Config};

    fn test_state() -> (AppState, tokio::sync::mpsc::Receiver<AuditEvent>) {
        let config = Config {
            database_url: "postgres://fellowship@localhost/fellowship".to_string(),
            s3_bucket: "media".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            aws_access_key_id: "minio".to_string(),
            aws_secret_access_key: "minio123".to_string(),
            port: 8080,
            rust_log: "info".to_string(),
            default_page_size: 20,
            max_page_size: 100,
            audit_channel_capacity: 16,
            max_upload_bytes: 1024,
            default_currency: "USD".to_string(),
            church: ChurchProfile::default(),
        };
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .build();
        let (audit, rx) = AuditSink::channel(config.audit_channel_capacity);
        let state = AppState {
            db,
            s3: aws_sdk_s3::Client::from_conf(s3_config),
            config,
            audit,
        };
        (state, rx)
    }

    #[tokio::test]
    async fn test_api_reads_without_actor_are_rejected() {
        let (state, mut rx) = test_state();
        let app = build_router(state);

        for uri in ["/api/audit-logs", "/api/finances", "/api/visitors", "/api/schedule/due"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");

            let event = rx.try_recv().unwrap();
            assert_eq!(event.status, 401);
            assert_eq!(event.user_id, None);
        }
    }

    #[tokio::test]
    async fn test_health_needs_no_actor() {
        let (state, mut rx) = test_state();
        let response = build_router(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(rx.try_recv().is_err());
    }
}
