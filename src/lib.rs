//! Blogfed - ActivityPub federation for a self-hosted blog
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - ActivityPub inbox                                        │
//! │  - WebFinger / host-meta                                    │
//! │  - Health and metrics                                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Service / Federation Layer                    │
//! │  - Inbound activity dispatch                                │
//! │  - Signed delivery and follower fan-out                     │
//! │  - Post lifecycle hooks                                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx): followers, notifications, citations       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Post lifecycle federation
//! - `federation`: ActivityPub federation handling
//! - `data`: Database layer
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod federation;
pub mod metrics;
pub mod service;

use std::sync::Arc;

use federation::{ActivityDelivery, ActivityProcessor, RequestSigner, USER_AGENT_VALUE};

/// Application state shared across all handlers
///
/// Built once at startup and read-only afterwards. The federation
/// members are `None` when `activitypub.enabled` is false.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// HTTP client for federation
    pub http_client: reqwest::Client,

    /// Request signer built from the site key
    pub signer: Option<Arc<RequestSigner>>,

    /// Outbound delivery engine
    pub delivery: Option<Arc<ActivityDelivery>>,

    /// Inbound activity dispatcher
    pub processor: Option<Arc<ActivityProcessor>>,

    /// Post lifecycle hooks
    pub publisher: Arc<service::PostFederation>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Build the HTTP client
    /// 3. Load the signing key (federation only)
    /// 4. Wire delivery, dispatcher and post hooks
    ///
    /// # Errors
    /// Returns error if any initialization step fails. A missing or
    /// unreadable key is fatal when federation is enabled.
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db = Arc::new(data::Database::connect(&config.database.path).await?);
        tracing::info!("Database connected");

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT_VALUE)
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        let signer = if config.activitypub.enabled {
            let key_path = config.activitypub.key_path.as_ref().ok_or_else(|| {
                error::AppError::Config(
                    "activitypub.key_path is required when activitypub.enabled=true".to_string(),
                )
            })?;
            Some(Arc::new(RequestSigner::load(key_path)?))
        } else {
            tracing::info!("ActivityPub disabled");
            None
        };

        Ok(Self::with_signer(config, db, http_client, signer))
    }

    /// Assemble state from already constructed parts
    pub fn with_signer(
        config: config::AppConfig,
        db: Arc<data::Database>,
        http_client: reqwest::Client,
        signer: Option<Arc<RequestSigner>>,
    ) -> Self {
        let config = Arc::new(config);

        let delivery = signer.as_ref().map(|signer| {
            Arc::new(ActivityDelivery::new(
                http_client.clone(),
                signer.clone(),
                db.clone(),
            ))
        });

        let processor = delivery.as_ref().map(|delivery| {
            Arc::new(ActivityProcessor::new(
                db.clone(),
                http_client.clone(),
                delivery.clone(),
                db.clone(),
                db.clone(),
            ))
        });

        let publisher = Arc::new(service::PostFederation::new(
            config.clone(),
            delivery.clone(),
        ));

        tracing::info!(
            blogs = config.blogs.len(),
            federation = signer.is_some(),
            "Application state initialized successfully"
        );

        Self {
            config,
            db,
            http_client,
            signer,
            delivery,
            processor,
            publisher,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let mut router = Router::new().route("/health", axum::routing::get(health_check));

    if state.processor.is_some() {
        router = router
            .merge(api::activitypub_router())
            .merge(api::wellknown_router());
    }

    router
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
