//! Well-known endpoints
//!
//! - /.well-known/webfinger
//! - /.well-known/host-meta

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, header},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;
use crate::federation::{
    JRD_CONTENT_TYPE, XRD_CONTENT_TYPE, account_from_resource, generate_webfinger_response,
    host_meta_document,
};

/// Create well-known router
///
/// Routes:
/// - GET /.well-known/webfinger
/// - GET /.well-known/host-meta
pub fn wellknown_router() -> Router<AppState> {
    Router::new()
        .route("/.well-known/webfinger", get(webfinger))
        .route("/.well-known/host-meta", get(host_meta))
}

/// WebFinger query parameters
#[derive(Debug, Deserialize)]
struct WebFingerQuery {
    #[serde(default)]
    resource: String,
}

/// GET /.well-known/webfinger
///
/// Query: ?resource=acct:blog@domain
async fn webfinger(
    State(state): State<AppState>,
    Query(query): Query<WebFingerQuery>,
) -> Result<impl IntoResponse, AppError> {
    let domain = &state.config.server.domain;
    let name = account_from_resource(&query.resource, domain)?.ok_or(AppError::NotFound)?;
    let (_, blog_iri) = state.config.blog(&name).ok_or(AppError::NotFound)?;

    let response = generate_webfinger_response(&name, domain, &blog_iri);
    let body = serde_json::to_string(&response)?;

    Ok(([(header::CONTENT_TYPE, JRD_CONTENT_TYPE)], body))
}

/// GET /.well-known/host-meta
///
/// Returns host-meta XML for WebFinger discovery.
async fn host_meta(headers: HeaderMap) -> impl IntoResponse {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    (
        [(header::CONTENT_TYPE, XRD_CONTENT_TYPE)],
        host_meta_document(host),
    )
}
