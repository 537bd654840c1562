use axum::Json;
use serde_json::{json, Value};

/// GET /health
/// Liveness probe; sits outside `/api` so it is never audited.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "fellowship-api"
    }))
}
