use chrono::{DateTime, Days, Months, Utc};
use uuid::Uuid;

use crate::models::reminder::{Recurrence, ReminderRow, ReminderStatus, ReminderType};
use crate::reminders::commands::UpdateReminder;
use crate::scheduling::{Schedulable, TaskKind, TransitionError};

const ENTITY: &str = "reminder";

/// A reminder about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReminder {
    pub title: String,
    pub description: Option<String>,
    pub reminder_type: ReminderType,
    pub due_date: DateTime<Utc>,
    pub recurrence: Recurrence,
    pub visitor_id: Option<Uuid>,
    pub assigned_to: Uuid,
}

impl Recurrence {
    /// `n` intervals after `anchor`, measured from the anchor itself so a
    /// month-end anchor stays at month end (Jan 31, Feb 29, Mar 31).
    /// `None` for one-off reminders or when the date overflows.
    pub fn nth_after(self, anchor: DateTime<Utc>, n: u32) -> Option<DateTime<Utc>> {
        match self {
            Recurrence::None => None,
            Recurrence::Daily => anchor.checked_add_days(Days::new(u64::from(n))),
            Recurrence::Weekly => anchor.checked_add_days(Days::new(7 * u64::from(n))),
            Recurrence::Monthly => anchor.checked_add_months(Months::new(n)),
            Recurrence::Yearly => anchor.checked_add_months(Months::new(n.checked_mul(12)?)),
        }
    }

    /// First occurrence after `due` that is also after `now`.
    /// Completing a late reminder skips the missed intervals instead of queueing a backlog.
    pub fn next_occurrence(self, due: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut n = 1u32;
        loop {
            let next = self.nth_after(due, n)?;
            if next > now {
                return Some(next);
            }
            n = n.checked_add(1)?;
        }
    }
}

impl ReminderRow {
    fn reject(&self, action: &'static str) -> TransitionError {
        TransitionError::NotAllowed {
            entity: ENTITY,
            action,
            from: self.status.to_string(),
        }
    }

    fn ensure_open(&self, action: &'static str) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(self.reject(action));
        }
        Ok(())
    }

    /// Marks the reminder done. For recurring reminders, returns the next occurrence to insert.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<Option<NewReminder>, TransitionError> {
        self.ensure_open("complete")?;
        self.status = ReminderStatus::Completed;
        self.completed_at = Some(now);
        self.snoozed_until = None;
        self.updated_at = now;

        Ok(self
            .recurrence
            .next_occurrence(self.due_date, now)
            .map(|due_date| NewReminder {
                title: self.title.clone(),
                description: self.description.clone(),
                reminder_type: self.reminder_type,
                due_date,
                recurrence: self.recurrence,
                visitor_id: self.visitor_id,
                assigned_to: self.assigned_to,
            }))
    }

    pub fn snooze(&mut self, until: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status != ReminderStatus::Pending {
            return Err(self.reject("snooze"));
        }
        if until <= now {
            return Err(TransitionError::SnoozeNotInFuture);
        }
        self.status = ReminderStatus::Snoozed;
        self.snoozed_until = Some(until);
        self.updated_at = now;
        Ok(())
    }

    /// Brings a snoozed reminder back to pending before its snooze runs out.
    pub fn reactivate(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status != ReminderStatus::Snoozed {
            return Err(self.reject("reactivate"));
        }
        self.status = ReminderStatus::Pending;
        self.snoozed_until = None;
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_open("cancel")?;
        self.status = ReminderStatus::Cancelled;
        self.snoozed_until = None;
        self.updated_at = now;
        Ok(())
    }

    pub fn apply_update(&mut self, update: UpdateReminder, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_open("update")?;
        if let Some(title) = update.title {
            self.title = title;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        if let Some(kind) = update.reminder_type {
            self.reminder_type = kind;
        }
        if let Some(due) = update.due_date {
            self.due_date = due;
        }
        if let Some(recurrence) = update.recurrence {
            self.recurrence = recurrence;
        }
        if update.visitor_id.is_some() {
            self.visitor_id = update.visitor_id;
        }
        if let Some(assignee) = update.assigned_to {
            self.assigned_to = assignee;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Schedulable for ReminderRow {
    fn task_id(&self) -> Uuid {
        self.id
    }

    fn task_kind(&self) -> TaskKind {
        TaskKind::Reminder
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    /// A snoozed reminder is next due when its snooze ends.
    fn due_at(&self) -> DateTime<Utc> {
        match (self.status, self.snoozed_until) {
            (ReminderStatus::Snoozed, Some(until)) => until,
            _ => self.due_date,
        }
    }

    fn assignee(&self) -> Uuid {
        self.assigned_to
    }

    fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    fn visitor_id(&self) -> Option<Uuid> {
        self.visitor_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn reminder(recurrence: Recurrence) -> ReminderRow {
        let created = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
        ReminderRow {
            id: Uuid::new_v4(),
            title: "Pray for the Silva family".to_string(),
            description: None,
            reminder_type: ReminderType::Custom,
            due_date: created,
            status: ReminderStatus::Pending,
            recurrence,
            snoozed_until: None,
            visitor_id: Some(Uuid::new_v4()),
            assigned_to: Uuid::new_v4(),
            completed_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_single_interval() {
        let jan31 = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
        assert_eq!(Recurrence::None.nth_after(jan31, 1), None);
        assert_eq!(
            Recurrence::Daily.nth_after(jan31, 1),
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap())
        );
        assert_eq!(
            Recurrence::Weekly.nth_after(jan31, 1),
            Some(Utc.with_ymd_and_hms(2024, 2, 7, 9, 0, 0).unwrap())
        );
        // Clamped to the last day of a shorter month.
        assert_eq!(
            Recurrence::Monthly.nth_after(jan31, 1),
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap())
        );
        assert_eq!(
            Recurrence::Yearly.nth_after(jan31, 1),
            Some(Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_next_occurrence_skips_missed_intervals() {
        let due = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap();
        assert_eq!(
            Recurrence::Weekly.next_occurrence(due, now),
            Some(Utc.with_ymd_and_hms(2024, 1, 22, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_late_monthly_keeps_month_end_anchor() {
        let due = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
        assert_eq!(
            Recurrence::Monthly.nth_after(due, 3),
            Some(Utc.with_ymd_and_hms(2024, 4, 30, 9, 0, 0).unwrap())
        );
        // Two intervals missed: the next one lands on Mar 31, not Mar 29.
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        assert_eq!(
            Recurrence::Monthly.next_occurrence(due, now),
            Some(Utc.with_ymd_and_hms(2024, 3, 31, 9, 0, 0).unwrap())
        );
        let now = Utc.with_ymd_and_hms(2024, 4, 2, 12, 0, 0).unwrap();
        assert_eq!(
            Recurrence::Monthly.next_occurrence(due, now),
            Some(Utc.with_ymd_and_hms(2024, 4, 30, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_complete_one_off_has_no_successor() {
        let mut r = reminder(Recurrence::None);
        let now = r.due_date + Duration::hours(1);
        assert_eq!(r.complete(now).unwrap(), None);
        assert_eq!(r.status, ReminderStatus::Completed);
        assert_eq!(r.completed_at, Some(now));
    }

    #[test]
    fn test_complete_recurring_returns_next_occurrence() {
        let mut r = reminder(Recurrence::Monthly);
        let now = r.due_date + Duration::hours(1);
        let next = r.complete(now).unwrap().unwrap();
        assert_eq!(next.due_date, Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap());
        assert_eq!(next.title, r.title);
        assert_eq!(next.assigned_to, r.assigned_to);
        assert_eq!(next.visitor_id, r.visitor_id);
        assert_eq!(next.recurrence, Recurrence::Monthly);
    }

    #[test]
    fn test_snooze_requires_future_time() {
        let mut r = reminder(Recurrence::None);
        let now = Utc::now();
        assert_eq!(r.snooze(now, now), Err(TransitionError::SnoozeNotInFuture));
        assert_eq!(r.status, ReminderStatus::Pending);

        let until = now + Duration::hours(4);
        r.snooze(until, now).unwrap();
        assert_eq!(r.status, ReminderStatus::Snoozed);
        assert_eq!(r.due_at(), until);
    }

    #[test]
    fn test_snoozed_can_reactivate_complete_or_cancel() {
        let now = Utc::now();
        let mut snoozed = reminder(Recurrence::None);
        snoozed.snooze(now + Duration::days(1), now).unwrap();

        let mut r = snoozed.clone();
        r.reactivate(now).unwrap();
        assert_eq!(r.status, ReminderStatus::Pending);
        assert_eq!(r.snoozed_until, None);

        let mut r = snoozed.clone();
        r.complete(now).unwrap();
        assert_eq!(r.status, ReminderStatus::Completed);

        let mut r = snoozed;
        r.cancel(now).unwrap();
        assert_eq!(r.status, ReminderStatus::Cancelled);
    }

    #[test]
    fn test_reactivate_only_from_snoozed() {
        let mut r = reminder(Recurrence::None);
        let err = r.reactivate(Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "cannot reactivate a pending reminder");
    }

    #[test]
    fn test_terminal_reminders_are_frozen() {
        let now = Utc::now();
        let mut done = reminder(Recurrence::Daily);
        done.complete(now).unwrap();
        let snapshot = done.clone();

        assert!(done.complete(now).is_err());
        assert!(done.cancel(now).is_err());
        assert!(done.snooze(now + Duration::days(1), now).is_err());
        assert!(done.reactivate(now).is_err());
        assert!(done
            .apply_update(
                UpdateReminder {
                    title: Some("renamed".to_string()),
                    ..Default::default()
                },
                now
            )
            .is_err());
        assert_eq!(done, snapshot);
        assert!(!done.is_open());
    }

    #[test]
    fn test_update_edits_open_reminder() {
        let mut r = reminder(Recurrence::None);
        let staff = Uuid::new_v4();
        r.apply_update(
            UpdateReminder {
                assigned_to: Some(staff),
                recurrence: Some(Recurrence::Yearly),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(r.assigned_to, staff);
        assert_eq!(r.recurrence, Recurrence::Yearly);
        assert_eq!(r.title, "Pray for the Silva family");
    }
}
