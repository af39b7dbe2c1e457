//! Data layer module
//!
//! Handles all data persistence:
//! - Follower registry
//! - Local notifications
//! - Queued external citations

mod database;
mod models;

pub use database::Database;
pub use models::*;
