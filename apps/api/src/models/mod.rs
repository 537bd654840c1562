pub mod audit_log;
pub mod content;
pub mod finance;
pub mod follow_up;
pub mod podcast;
pub mod prayer_request;
pub mod reminder;
pub mod visitor;
