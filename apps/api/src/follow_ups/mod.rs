//! Follow-ups: scheduled pastoral contact with a single visitor.
//!
//! Lifecycle: `pending -> completed` or `pending -> cancelled`. Both targets
//! are terminal; every later transition or edit is refused with a conflict.

pub mod commands;
pub mod handlers;
pub mod lifecycle;
pub mod service;
