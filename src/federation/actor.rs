//! Remote actor resolution
//!
//! Fetches an actor document on demand. Nothing is cached.

use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;
use crate::metrics::{FEDERATION_REQUEST_DURATION_SECONDS, FEDERATION_REQUESTS_TOTAL};

/// Media type used for actor lookups and deliveries
pub const ACTIVITY_JSON: &str = "application/activity+json";

const RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

/// The parts of a remote actor document federation needs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteActor {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub inbox: String,
}

/// Fetch and parse a remote actor document
///
/// No retries. Any non-2xx status is `RemoteRejected`; a body without
/// a string `id` and `inbox` is `Parse`.
pub async fn resolve_actor(
    http_client: &reqwest::Client,
    actor_iri: &str,
) -> Result<RemoteActor, AppError> {
    fetch_actor(http_client, actor_iri, RESOLVE_TIMEOUT).await
}

async fn fetch_actor(
    http_client: &reqwest::Client,
    actor_iri: &str,
    timeout: Duration,
) -> Result<RemoteActor, AppError> {
    let _timer = FEDERATION_REQUEST_DURATION_SECONDS
        .with_label_values(&["resolve"])
        .start_timer();

    let response = http_client
        .get(actor_iri)
        .timeout(timeout)
        .header(reqwest::header::ACCEPT, ACTIVITY_JSON)
        .send()
        .await
        .inspect_err(|_| {
            FEDERATION_REQUESTS_TOTAL
                .with_label_values(&["resolve", "network"])
                .inc();
        })?;

    let status = response.status();
    if !status.is_success() {
        FEDERATION_REQUESTS_TOTAL
            .with_label_values(&["resolve", "remote_rejected"])
            .inc();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::RemoteRejected {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    let actor = parse_actor_document(&bytes)?;

    FEDERATION_REQUESTS_TOTAL
        .with_label_values(&["resolve", "success"])
        .inc();

    Ok(actor)
}

fn parse_actor_document(bytes: &[u8]) -> Result<RemoteActor, AppError> {
    let actor: RemoteActor = serde_json::from_slice(bytes)
        .map_err(|e| AppError::Parse(format!("Invalid actor document: {}", e)))?;

    if actor.id.is_empty() || actor.inbox.is_empty() {
        return Err(AppError::Parse(
            "Actor document is missing id or inbox".to_string(),
        ));
    }

    Ok(actor)
}
