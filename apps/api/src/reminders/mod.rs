//! General staff reminders: birthdays, anniversaries and ad-hoc tasks.
//!
//! Reminders can be snoozed and reactivated, and recurring ones roll forward
//! to a fresh pending occurrence when completed.

pub mod commands;
pub mod handlers;
pub mod lifecycle;
pub mod service;
