//! WebFinger and host-meta discovery documents
//!
//! Maps `acct:<blog>@<domain>` to the blog's identity IRI.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::actor::ACTIVITY_JSON;
use crate::error::AppError;

pub const JRD_CONTENT_TYPE: &str = "application/jrd+json; charset=utf-8";
pub const XRD_CONTENT_TYPE: &str = "application/xrd+xml; charset=utf-8";

/// WebFinger JRD response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebFingerResponse {
    pub subject: String,
    pub links: Vec<WebFingerLink>,
}

/// WebFinger link
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebFingerLink {
    pub rel: String,
    #[serde(rename = "type")]
    pub link_type: String,
    pub href: String,
}

/// Extract the account name from a `resource` query value
///
/// # Returns
/// `None` when the resource is not `acct:<name>@<domain>` for this domain
///
/// # Errors
/// `Config` if the domain cannot be turned into a pattern
pub fn account_from_resource(resource: &str, domain: &str) -> Result<Option<String>, AppError> {
    let pattern = format!("^acct:(.*)@{}$", regex::escape(domain));
    let re = Regex::new(&pattern)
        .map_err(|e| AppError::Config(format!("Invalid webfinger pattern: {}", e)))?;

    Ok(re
        .captures(resource)
        .and_then(|caps| caps.get(1))
        .map(|name| name.as_str().to_string()))
}

/// Generate WebFinger response for a blog.
///
/// # Arguments
/// * `name` - Blog name
/// * `domain` - Public domain
/// * `blog_iri` - Identity IRI of the blog
pub fn generate_webfinger_response(name: &str, domain: &str, blog_iri: &str) -> WebFingerResponse {
    WebFingerResponse {
        subject: format!("acct:{}@{}", name, domain),
        links: vec![WebFingerLink {
            rel: "self".to_string(),
            link_type: ACTIVITY_JSON.to_string(),
            href: blog_iri.to_string(),
        }],
    }
}

/// host-meta XRD pointing at the WebFinger endpoint of `host`
pub fn host_meta_document(host: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<XRD xmlns="http://docs.oasis-open.org/ns/xri/xrd-1.0">"#,
            r#"<Link rel="lrdd" type="application/xrd+xml" template="https://{}/.well-known/webfinger?resource={{uri}}"/>"#,
            r#"</XRD>"#
        ),
        html_escape::encode_double_quoted_attribute(host)
    )
}
