//! ActivityPub endpoints
//!
//! - POST /activitypub/inbox/:blog

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};

use crate::AppState;
use crate::error::AppError;
use crate::federation::{Activity, ActivityType};
use crate::metrics::{
    ACTIVITYPUB_ACTIVITIES_RECEIVED, FEDERATION_REQUEST_DURATION_SECONDS,
    FEDERATION_REQUESTS_TOTAL, HTTP_REQUESTS_TOTAL,
};

/// Create ActivityPub router
///
/// Routes:
/// - POST /activitypub/inbox/:blog
pub fn activitypub_router() -> Router<AppState> {
    Router::new().route("/activitypub/inbox/:blog", post(inbox))
}

/// POST /activitypub/inbox/:blog
///
/// Receives activities from remote servers.
///
/// Any syntactically valid JSON addressed to a known blog is answered
/// with 201, whatever happens while processing it.
async fn inbox(
    State(state): State<AppState>,
    Path(blog): Path<String>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let _timer = FEDERATION_REQUEST_DURATION_SECONDS
        .with_label_values(&["inbound"])
        .start_timer();

    let result = handle_inbox(&state, &blog, &body).await;
    let status = match &result {
        Ok(status) => status.as_u16().to_string(),
        Err(AppError::NotFound) => "404".to_string(),
        Err(_) => "400".to_string(),
    };
    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/activitypub/inbox/:blog", &status])
        .inc();

    result
}

async fn handle_inbox(state: &AppState, blog: &str, body: &[u8]) -> Result<StatusCode, AppError> {
    let processor = state.processor.as_ref().ok_or(AppError::NotFound)?;
    let (_, blog_iri) = state.config.blog(blog).ok_or(AppError::NotFound)?;

    let document: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        FEDERATION_REQUESTS_TOTAL
            .with_label_values(&["inbound", "invalid"])
            .inc();
        AppError::Parse(format!("Invalid JSON: {}", e))
    })?;

    // Label by known type only; the raw string is sender-controlled
    let activity_type = document
        .get("type")
        .and_then(serde_json::Value::as_str)
        .and_then(ActivityType::from_str)
        .map(|kind| kind.as_str())
        .unwrap_or("Other");
    ACTIVITYPUB_ACTIVITIES_RECEIVED
        .with_label_values(&[activity_type])
        .inc();

    let activity = Activity::decode(document);
    if activity == Activity::Ignored {
        tracing::debug!(blog, activity_type = %activity_type, "Ignoring activity");
    }

    let outcome = match processor.process(blog, &blog_iri, activity).await {
        Ok(()) => "success",
        Err(e) => {
            tracing::warn!(
                blog,
                activity_type = %activity_type,
                error = %e,
                "Activity processing failed"
            );
            "failed"
        }
    };
    FEDERATION_REQUESTS_TOTAL
        .with_label_values(&["inbound", outcome])
        .inc();

    Ok(StatusCode::CREATED)
}
