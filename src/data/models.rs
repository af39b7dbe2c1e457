//! Data models
//!
//! Rust structs representing database entities and the content
//! items handed to the federation hooks.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Followers
// =============================================================================

/// A remote actor following one of the local blogs
///
/// Unique per (blog, follower).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follower {
    /// Blog name the follower subscribed to
    pub blog: String,
    /// Follower actor IRI
    pub follower: String,
    /// Follower inbox IRI for delivery
    pub inbox: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Notifications
// =============================================================================

/// Local notification about a remote interaction
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: String,
    /// Human readable text, e.g. "<actor> liked <object>"
    pub text: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Citations
// =============================================================================

/// A remote document referencing a local one
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Citation {
    pub id: String,
    /// The citing remote document
    pub source: String,
    /// The cited local document
    pub target: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Posts
// =============================================================================

/// A content item of a blog, as seen by the federation hooks
///
/// Storage and rendering of posts live outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Path relative to the public address, e.g. "/posts/42"
    pub path: String,
    /// Owning blog name
    pub blog: String,
    /// Section the post belongs to (empty when unlisted)
    #[serde(default)]
    pub section: String,
    pub title: Option<String>,
    /// Rendered HTML content
    pub content: String,
    /// None for drafts
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    /// IRI this post replies to
    pub in_reply_to: Option<String>,
}
