use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::follow_ups::commands::UpdateFollowUp;
use crate::models::follow_up::{FollowUpResponse, FollowUpRow, FollowUpStatus, FollowUpType};
use crate::models::visitor::VisitorStatus;
use crate::scheduling::{Schedulable, TaskKind, TransitionError};

/// Hours between registering a visitor and their first phone call.
pub const INITIAL_FOLLOW_UP_DELAY_HOURS: i64 = 24;

const ENTITY: &str = "follow-up";

/// A follow-up about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFollowUp {
    pub visitor_id: Uuid,
    pub follow_up_type: FollowUpType,
    pub scheduled_date: DateTime<Utc>,
    pub assigned_to: Uuid,
    pub notes: Option<String>,
    pub is_urgent: bool,
    pub next_follow_up: Option<DateTime<Utc>>,
}

impl NewFollowUp {
    /// The follow-up every new visitor gets: a pending phone call assigned to
    /// whoever registered them, one day after registration.
    pub fn initial_for(visitor_id: Uuid, created_by: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            visitor_id,
            follow_up_type: FollowUpType::Phone,
            scheduled_date: created_at + Duration::hours(INITIAL_FOLLOW_UP_DELAY_HOURS),
            assigned_to: created_by,
            notes: None,
            is_urgent: false,
            next_follow_up: None,
        }
    }
}

impl FollowUpRow {
    fn ensure_pending(&self, action: &'static str) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::NotAllowed {
                entity: ENTITY,
                action,
                from: self.status.to_string(),
            });
        }
        Ok(())
    }

    pub fn complete(
        &mut self,
        response: FollowUpResponse,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.ensure_pending("complete")?;
        self.status = FollowUpStatus::Completed;
        self.completed_date = Some(now);
        self.response = Some(response);
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_pending("cancel")?;
        self.status = FollowUpStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Applies field edits, then any requested status transition.
    /// Nothing is modified when the follow-up is already closed.
    pub fn apply_update(
        &mut self,
        update: UpdateFollowUp,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.ensure_pending("update")?;
        if update.status == Some(FollowUpStatus::Completed) && update.response.is_none() {
            return Err(TransitionError::MissingResponse);
        }

        if let Some(kind) = update.follow_up_type {
            self.follow_up_type = kind;
        }
        if let Some(scheduled) = update.scheduled_date {
            self.scheduled_date = scheduled;
        }
        if let Some(assignee) = update.assigned_to {
            self.assigned_to = assignee;
        }
        if update.notes.is_some() {
            self.notes = update.notes;
        }
        if let Some(urgent) = update.is_urgent {
            self.is_urgent = urgent;
        }
        if update.next_follow_up.is_some() {
            self.next_follow_up = update.next_follow_up;
        }
        self.updated_at = now;

        match (update.status, update.response) {
            (Some(FollowUpStatus::Completed), Some(response)) => self.complete(response, now),
            (Some(FollowUpStatus::Cancelled), _) => self.cancel(now),
            _ => Ok(()),
        }
    }
}

/// A first real answer moves a brand-new visitor to `contacted`.
pub fn visitor_status_after(
    current: VisitorStatus,
    response: FollowUpResponse,
) -> Option<VisitorStatus> {
    match (current, response) {
        (_, FollowUpResponse::NoResponse) => None,
        (VisitorStatus::New, _) => Some(VisitorStatus::Contacted),
        _ => None,
    }
}

impl Schedulable for FollowUpRow {
    fn task_id(&self) -> Uuid {
        self.id
    }

    fn task_kind(&self) -> TaskKind {
        TaskKind::FollowUp
    }

    fn title(&self) -> String {
        format!("{} follow-up", self.follow_up_type)
    }

    fn due_at(&self) -> DateTime<Utc> {
        self.scheduled_date
    }

    fn assignee(&self) -> Uuid {
        self.assigned_to
    }

    fn is_open(&self) -> bool {
        self.status == FollowUpStatus::Pending
    }

    fn is_urgent(&self) -> bool {
        self.is_urgent
    }

    fn visitor_id(&self) -> Option<Uuid> {
        Some(self.visitor_id)
    }
}
