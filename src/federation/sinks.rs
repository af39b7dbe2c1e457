//! Outlets for inbound interactions
//!
//! The dispatcher reports likes, shares and citations through these
//! traits. `Database` is the default implementation.

use async_trait::async_trait;

use crate::data::Database;
use crate::error::AppError;

/// Emits local notifications
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), AppError>;
}

/// Records that a remote document cites a local one
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CitationSink: Send + Sync {
    async fn record_citation(&self, source: &str, target: &str) -> Result<(), AppError>;
}

#[async_trait]
impl Notifier for Database {
    async fn notify(&self, text: &str) -> Result<(), AppError> {
        self.insert_notification(text).await?;
        Ok(())
    }
}

#[async_trait]
impl CitationSink for Database {
    async fn record_citation(&self, source: &str, target: &str) -> Result<(), AppError> {
        if !self.insert_citation(source, target).await? {
            tracing::debug!(source, target, "Citation already queued");
        }
        Ok(())
    }
}
