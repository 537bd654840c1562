use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use crate::audit::{AuditEvent, AuditSink};
use crate::auth::user_id_from_headers;
use crate::errors::AppError;
use crate::models::audit_log::AuditAction;

/// Largest JSON request body buffered for the audit row (matches axum's default body limit).
const MAX_AUDITED_REQUEST_BYTES: usize = 2 * 1024 * 1024;

/// Paths whose bodies never reach the audit trail: the trail itself, and
/// prayer requests, which may carry the identity of an anonymous requester.
const BODILESS_PATHS: [&str; 2] = ["/api/audit-logs", "/api/prayer-requests"];

fn records_bodies(path: &str) -> bool {
    !BODILESS_PATHS.iter().any(|prefix| path.starts_with(prefix))
}

/// Maps the HTTP verb to a coarse action. Intent is not inspected: a search
/// sent as POST is still a CREATE.
pub fn action_for_method(method: &Method) -> AuditAction {
    match *method {
        Method::POST => AuditAction::Create,
        Method::PUT | Method::PATCH => AuditAction::Update,
        Method::DELETE => AuditAction::Delete,
        _ => AuditAction::Read,
    }
}

/// Axum middleware: records one audit event per request after the handler ran.
pub async fn audit_requests(State(sink): State<AuditSink>, request: Request, next: Next) -> Response {
    let action = action_for_method(request.method());
    let path = request.uri().path().to_string();
    let details = format!("{} {}", request.method(), path);
    let user_id = user_id_from_headers(request.headers());
    let ip_address = client_ip(&request);

    let with_bodies = records_bodies(&path);

    let (parts, body) = request.into_parts();
    let buffered = if with_bodies {
        buffer_json(&parts.headers, body, MAX_AUDITED_REQUEST_BYTES).await
    } else {
        Ok((body, None))
    };
    let (request, request_body) = match buffered {
        Ok((body, captured)) => (Request::from_parts(parts, body), captured),
        Err(e) => {
            warn!("Rejecting {details}: unreadable request body: {e}");
            let response = AppError::PayloadTooLarge.into_response();
            sink.record(AuditEvent {
                user_id,
                action,
                details,
                ip_address,
                status: response.status().as_u16(),
                request_body: None,
                response_body: None,
                timestamp: Utc::now(),
            });
            return response;
        }
    };

    let response = next.run(request).await;
    let status = response.status().as_u16();

    let (parts, body) = response.into_parts();
    let (body, response_body) = if !with_bodies {
        (body, None)
    } else {
        match buffer_json(&parts.headers, body, usize::MAX).await {
            Ok(buffered) => buffered,
            Err(e) => {
                warn!("Could not buffer response body for {details}: {e}");
                (Body::empty(), None)
            }
        }
    };

    sink.record(AuditEvent {
        user_id,
        action,
        details,
        ip_address,
        status,
        request_body,
        response_body,
        timestamp: Utc::now(),
    });

    Response::from_parts(parts, body)
}

/// Buffers JSON bodies so they can be both recorded and forwarded.
/// Non-JSON bodies (multipart uploads, empty bodies) pass through untouched.
async fn buffer_json(
    headers: &HeaderMap,
    body: Body,
    limit: usize,
) -> Result<(Body, Option<Value>), axum::Error> {
    if !is_json(headers) {
        return Ok((body, None));
    }
    let bytes = axum::body::to_bytes(body, limit).await?;
    let value = serde_json::from_slice::<Value>(&bytes).ok();
    Ok((Body::from(bytes), value))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
}

/// First `X-Forwarded-For` hop, falling back to the socket peer.
fn client_ip(request: &Request) -> Option<String> {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty());

    forwarded.or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{Request, StatusCode},
        middleware,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use tokio::sync::mpsc;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::USER_ID_HEADER;

    fn app(sink: AuditSink) -> Router {
        Router::new()
            .route(
                "/api/visitors",
                post(|Json(body): Json<Value>| async move {
                    (StatusCode::CREATED, Json(json!({ "id": "v1", "echo": body })))
                }),
            )
            .route(
                "/api/visitors/:id",
                get(|| async { Json(json!({ "id": "v1" })) })
                    .put(|| async { StatusCode::NO_CONTENT })
                    .patch(|| async { StatusCode::NO_CONTENT })
                    .delete(|| async { StatusCode::NO_CONTENT }),
            )
            .route("/api/audit-logs", get(|| async { Json(json!({ "data": [1, 2, 3] })) }))
            .route(
                "/api/prayer-requests",
                post(|Json(body): Json<Value>| async move {
                    let echo = json!({ "id": "p1", "requesterName": body["requesterName"] });
                    (StatusCode::CREATED, Json(echo))
                }),
            )
            .layer(middleware::from_fn_with_state(sink, audit_requests))
    }

    fn drain(rx: &mut mpsc::Receiver<AuditEvent>) -> Vec<AuditEvent> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    #[test]
    fn test_action_for_method() {
        assert_eq!(action_for_method(&Method::POST), AuditAction::Create);
        assert_eq!(action_for_method(&Method::PUT), AuditAction::Update);
        assert_eq!(action_for_method(&Method::PATCH), AuditAction::Update);
        assert_eq!(action_for_method(&Method::DELETE), AuditAction::Delete);
        assert_eq!(action_for_method(&Method::GET), AuditAction::Read);
        assert_eq!(action_for_method(&Method::HEAD), AuditAction::Read);
        assert_eq!(action_for_method(&Method::OPTIONS), AuditAction::Read);
    }

    #[tokio::test]
    async fn test_create_captures_bodies_and_actor() {
        let (sink, mut rx) = AuditSink::channel(16);
        let user = Uuid::new_v4();

        let response = app(sink)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/visitors")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(USER_ID_HEADER, user.to_string())
                    .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                    .body(Body::from(r#"{"firstName":"Ana"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // The handler still sees the full body after buffering.
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["echo"]["firstName"], "Ana");

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.action, AuditAction::Create);
        assert_eq!(event.details, "POST /api/visitors");
        assert_eq!(event.user_id, Some(user));
        assert_eq!(event.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(event.status, 201);
        assert_eq!(event.request_body, Some(json!({ "firstName": "Ana" })));
        assert_eq!(event.response_body.as_ref().unwrap()["id"], "v1");
    }

    #[tokio::test]
    async fn test_one_event_per_request_with_verb_action() {
        let (sink, mut rx) = AuditSink::channel(16);
        let router = app(sink);
        let calls = [
            ("POST", AuditAction::Create),
            ("PUT", AuditAction::Update),
            ("PATCH", AuditAction::Update),
            ("DELETE", AuditAction::Delete),
            ("GET", AuditAction::Read),
        ];

        for (method, _) in calls {
            let uri = if method == "POST" { "/api/visitors" } else { "/api/visitors/v1" };
            let mut builder = Request::builder().method(method).uri(uri);
            let body = if method == "POST" {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from("{}")
            } else {
                Body::empty()
            };
            router
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
        }

        let events = drain(&mut rx);
        assert_eq!(events.len(), calls.len());
        for (event, (_, expected)) in events.iter().zip(calls) {
            assert_eq!(event.action, expected);
        }
        assert!(events.iter().all(|e| e.user_id.is_none()));
    }

    #[tokio::test]
    async fn test_failed_request_is_still_logged() {
        let (sink, mut rx) = AuditSink::channel(4);
        let response = app(sink)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/visitors")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, 400);
        assert_eq!(events[0].request_body, None);
    }

    #[tokio::test]
    async fn test_audit_trail_response_not_copied() {
        let (sink, mut rx) = AuditSink::channel(4);
        app(sink)
            .oneshot(
                Request::builder()
                    .uri("/api/audit-logs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let events = drain(&mut rx);
        assert_eq!(events[0].action, AuditAction::Read);
        assert_eq!(events[0].response_body, None);
    }

    #[tokio::test]
    async fn test_closed_writer_does_not_affect_response() {
        let (sink, rx) = AuditSink::channel(1);
        drop(rx);
        let response = app(sink)
            .oneshot(
                Request::builder()
                    .uri("/api/visitors/v1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_prayer_request_bodies_not_recorded() {
        let (sink, mut rx) = AuditSink::channel(4);
        let owner = Uuid::new_v4();
        let response = app(sink)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/prayer-requests")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(USER_ID_HEADER, owner.to_string())
                    .body(Body::from(
                        r#"{"title":"Healing","requesterName":"Kofi","isAnonymous":true,"isPublic":false}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // The handler still received the body.
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["requesterName"], "Kofi");

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, AuditAction::Create);
        assert_eq!(events[0].details, "POST /api/prayer-requests");
        assert_eq!(events[0].user_id, Some(owner));
        assert_eq!(events[0].request_body, None);
        assert_eq!(events[0].response_body, None);
    }

    #[test]
    fn test_records_bodies() {
        assert!(records_bodies("/api/visitors"));
        assert!(!records_bodies("/api/audit-logs"));
        assert!(!records_bodies("/api/prayer-requests/42/comments"));
    }
}
