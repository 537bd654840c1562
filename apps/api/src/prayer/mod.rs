//! Prayer requests with append-only "prayed" marks and comments.
//!
//! Only the creator may edit or delete a request; anyone else gets the same
//! 404 as for a missing row.

pub mod commands;
pub mod handlers;
pub mod service;
