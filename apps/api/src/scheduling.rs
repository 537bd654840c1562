//! Capabilities shared by the two scheduling entities.
//!
//! Follow-ups (pastoral contact with one visitor) and reminders (general
//! staff tasks) keep separate tables and lifecycles. They meet here: both
//! expose a due time, an assignee and an open/closed state, which is enough
//! to build the merged work queue served at `/api/schedule/due`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot {action} a {from} {entity}")]
    NotAllowed {
        entity: &'static str,
        action: &'static str,
        from: String,
    },

    #[error("snoozedUntil must be in the future")]
    SnoozeNotInFuture,

    #[error("a response is required to complete a follow-up")]
    MissingResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    FollowUp,
    Reminder,
}

/// Anything that can sit in a staff member's work queue.
pub trait Schedulable {
    fn task_id(&self) -> Uuid;
    fn task_kind(&self) -> TaskKind;
    fn title(&self) -> String;
    /// When the task next needs attention.
    fn due_at(&self) -> DateTime<Utc>;
    fn assignee(&self) -> Uuid;
    /// Open tasks can still be acted on; closed ones never re-enter a queue.
    fn is_open(&self) -> bool;
    fn is_urgent(&self) -> bool {
        false
    }
    fn visitor_id(&self) -> Option<Uuid> {
        None
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DueItem {
    pub id: Uuid,
    pub kind: TaskKind,
    pub title: String,
    pub due_at: DateTime<Utc>,
    pub assigned_to: Uuid,
    pub visitor_id: Option<Uuid>,
    pub is_urgent: bool,
    pub overdue: bool,
}

/// Builds the work queue: open tasks due before `horizon`, urgent first, then oldest-due first.
pub fn build_due_queue<'a, I>(tasks: I, now: DateTime<Utc>, horizon: DateTime<Utc>) -> Vec<DueItem>
where
    I: IntoIterator<Item = &'a dyn Schedulable>,
{
    let mut queue: Vec<DueItem> = tasks
        .into_iter()
        .filter(|t| t.is_open() && t.due_at() <= horizon)
        .map(|t| DueItem {
            id: t.task_id(),
            kind: t.task_kind(),
            title: t.title(),
            due_at: t.due_at(),
            assigned_to: t.assignee(),
            visitor_id: t.visitor_id(),
            is_urgent: t.is_urgent(),
            overdue: t.due_at() < now,
        })
        .collect();

    queue.sort_by(|a, b| {
        b.is_urgent
            .cmp(&a.is_urgent)
            .then(a.due_at.cmp(&b.due_at))
    });
    queue
}
