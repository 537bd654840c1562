//! Audit trail: one append-only row per `/api` request.
//!
//! The middleware turns each request/response pair into an [`AuditEvent`] and
//! hands it to an [`AuditSink`]. A single writer task drains the channel into
//! storage, so a slow or failing database never delays or alters a response.

pub mod handlers;
pub mod middleware;
mod writer;

pub use writer::{spawn_writer, AuditEvent, AuditSink, AuditStore, PgAuditStore};
