//! SQLite database operations
//!
//! All database access goes through this module.
//! Every call is a fresh round-trip; nothing is cached in process.

use chrono::Utc;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Store(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Followers
    // =========================================================================

    /// Get all followers of a blog
    ///
    /// # Returns
    /// Mapping of follower actor IRI to inbox IRI
    pub async fn get_followers(&self, blog: &str) -> Result<HashMap<String, String>, AppError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT follower, inbox FROM activitypub_followers WHERE blog = ?",
        )
        .bind(blog)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Get a single follower row
    pub async fn get_follower(
        &self,
        blog: &str,
        follower: &str,
    ) -> Result<Option<Follower>, AppError> {
        let follower = sqlx::query_as::<_, Follower>(
            "SELECT blog, follower, inbox, created_at FROM activitypub_followers WHERE blog = ? AND follower = ?",
        )
        .bind(blog)
        .bind(follower)
        .fetch_optional(&self.pool)
        .await?;

        Ok(follower)
    }

    /// Count followers of a blog
    pub async fn count_followers(&self, blog: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM activitypub_followers WHERE blog = ?",
        )
        .bind(blog)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Add a follower or replace the inbox of an existing one
    ///
    /// Re-following keeps a single row per (blog, follower).
    pub async fn upsert_follower(
        &self,
        blog: &str,
        follower: &str,
        inbox: &str,
    ) -> Result<(), AppError> {
        if follower.is_empty() || inbox.is_empty() {
            return Err(AppError::Parse(
                "Follower actor and inbox must not be empty".to_string(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO activitypub_followers (blog, follower, inbox, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (blog, follower) DO UPDATE SET inbox = excluded.inbox
            "#,
        )
        .bind(blog)
        .bind(follower)
        .bind(inbox)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a follower
    ///
    /// # Returns
    /// Whether a row was removed. Removing an unknown follower is not an error.
    pub async fn delete_follower(&self, blog: &str, follower: &str) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM activitypub_followers WHERE blog = ? AND follower = ?")
                .bind(blog)
                .bind(follower)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Insert notification
    pub async fn insert_notification(&self, text: &str) -> Result<Notification, AppError> {
        let notification = Notification {
            id: EntityId::new().0,
            text: text.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO notifications (id, text, created_at) VALUES (?, ?, ?)")
            .bind(&notification.id)
            .bind(&notification.text)
            .bind(notification.created_at)
            .execute(&self.pool)
            .await?;

        Ok(notification)
    }

    /// Get the most recent notifications, newest first
    pub async fn get_notifications(&self, limit: i64) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT id, text, created_at FROM notifications ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    // =========================================================================
    // Citations
    // =========================================================================

    /// Queue an external citation
    ///
    /// # Returns
    /// false if the same (source, target) pair was already queued
    pub async fn insert_citation(&self, source: &str, target: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO citations (id, source, target, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(EntityId::new().0)
        .bind(source)
        .bind(target)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get queued citations, oldest first
    pub async fn get_citations(&self) -> Result<Vec<Citation>, AppError> {
        let citations = sqlx::query_as::<_, Citation>(
            "SELECT id, source, target, created_at FROM citations ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(citations)
    }
}
