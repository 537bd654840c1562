//! Blog posts and podcast episodes.
//!
//! Both carry a `PublicationStatus`; podcast audio lives in the media bucket
//! and only its object key is stored.

pub mod commands;
pub mod handlers;
pub mod podcasts;
pub mod publishing;
pub mod service;
