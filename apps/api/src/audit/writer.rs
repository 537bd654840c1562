use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::audit_log::AuditAction;

/// A not-yet-persisted audit row.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub details: String,
    pub ip_address: Option<String>,
    pub status: u16,
    pub request_body: Option<Value>,
    pub response_body: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

/// Producer half of the audit channel. Cheap to clone into every request.
#[derive(Clone)]
pub struct AuditSink {
    tx: mpsc::Sender<AuditEvent>,
    /// Caps the sends parked while the channel is full.
    overflow: Arc<Semaphore>,
    dropped: Arc<AtomicU64>,
}

impl AuditSink {
    /// A channel of `capacity` entries, with as many more allowed to wait for room.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AuditEvent>) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let sink = Self {
            tx,
            overflow: Arc::new(Semaphore::new(capacity)),
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (sink, rx)
    }

    /// Entries discarded because both the channel and the overflow were full.
    #[cfg(test)]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Queues an event without waiting. When the channel is full the send is
    /// parked on its own task while overflow permits remain; past that the
    /// entry is dropped and counted.
    pub fn record(&self, event: AuditEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                let Ok(permit) = self.overflow.clone().try_acquire_owned() else {
                    let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(
                        "Audit backlog full, dropped entry for {} ({dropped} dropped so far)",
                        event.details
                    );
                    return;
                };
                debug!("Audit channel full, deferring entry for {}", event.details);
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = tx.send(event).await {
                        error!("Audit writer gone, dropped entry for {}", e.0.details);
                    }
                    drop(permit);
                });
            }
            Err(TrySendError::Closed(event)) => {
                error!("Audit writer gone, dropped entry for {}", event.details);
            }
        }
    }
}

/// Storage backend for the audit writer.
#[async_trait]
pub trait AuditStore: Send + Sync + 'static {
    async fn append(&self, event: &AuditEvent) -> Result<()>;
}

pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(&self, event: &AuditEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (id, user_id, action, details, ip_address, status,
                 request_body, response_body, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.user_id)
        .bind(event.action)
        .bind(&event.details)
        .bind(&event.ip_address)
        .bind(i32::from(event.status))
        .bind(&event.request_body)
        .bind(&event.response_body)
        .bind(event.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Spawns the writer task. It runs until every [`AuditSink`] is dropped and
/// resolves to the number of entries persisted.
pub fn spawn_writer<S: AuditStore>(store: S, mut rx: mpsc::Receiver<AuditEvent>) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut written = 0u64;
        while let Some(event) = rx.recv().await {
            match store.append(&event).await {
                Ok(()) => {
                    written += 1;
                    debug!("Audit entry written: {:?} {}", event.action, event.details);
                }
                Err(e) => error!("Failed to write audit entry for {}: {e:?}", event.details),
            }
        }
        info!("Audit writer stopped after {written} entries");
        written
    })
}
