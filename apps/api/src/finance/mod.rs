//! Income and expense ledger.

pub mod commands;
pub mod handlers;
pub mod service;
