//! Visitor records and the creation workflow that schedules their first follow-up.

pub mod commands;
pub mod handlers;
pub mod service;
