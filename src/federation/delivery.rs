//! Activity delivery
//!
//! Signs and POSTs activities to remote inboxes, one attempt each.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{ACCEPT, ACCEPT_CHARSET, CONTENT_TYPE, DATE, HOST, USER_AGENT};

use super::signature::{RequestSigner, key_id_for};
use crate::data::Database;
use crate::error::AppError;
use crate::metrics::{FEDERATION_REQUEST_DURATION_SECONDS, observe_delivery};

/// Content type of delivered activities
pub const ACTIVITY_CONTENT_TYPE: &str = "application/activity+json; charset=utf-8";

/// User agent sent with every federation request
pub const USER_AGENT_VALUE: &str = "blogfed";

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Statuses a remote inbox may answer with on success
const SUCCESS_STATUSES: [u16; 4] = [200, 201, 202, 204];

/// Activity delivery service
///
/// Sends activities to remote inbox endpoints.
pub struct ActivityDelivery {
    http_client: reqwest::Client,
    signer: Arc<RequestSigner>,
    db: Arc<Database>,
}

impl ActivityDelivery {
    /// Create new delivery service
    pub fn new(http_client: reqwest::Client, signer: Arc<RequestSigner>, db: Arc<Database>) -> Self {
        Self {
            http_client,
            signer,
            db,
        }
    }

    /// Deliver activity to a single inbox
    ///
    /// # Arguments
    /// * `blog_iri` - Identity of the sending blog (used for the key id)
    /// * `activity` - Activity JSON
    /// * `inbox` - Target inbox URL
    ///
    /// # Errors
    /// Returns error if delivery fails (serialization, signing, network, rejection)
    pub async fn deliver_to_inbox(
        &self,
        blog_iri: &str,
        activity: &serde_json::Value,
        inbox: &str,
    ) -> Result<(), AppError> {
        let body = serde_json::to_vec(activity)?;
        self.post_signed(blog_iri, activity_type(activity), body, inbox)
            .await
    }

    /// Deliver activity to every follower of a blog
    ///
    /// Spawns one detached task per follower and returns the number of
    /// deliveries started. Task outcomes are logged and discarded.
    ///
    /// # Errors
    /// Only follower lookup and serialization errors surface here.
    pub async fn fan_out(
        self: &Arc<Self>,
        blog: &str,
        blog_iri: &str,
        activity: &serde_json::Value,
    ) -> Result<usize, AppError> {
        let followers = self.db.get_followers(blog).await.inspect_err(|e| {
            tracing::error!(blog, error = %e, "Followers lookup failed");
        })?;

        let body = serde_json::to_vec(activity)?;
        let kind = activity_type(activity).to_string();

        tracing::info!(
            blog,
            activity_type = %kind,
            followers = followers.len(),
            "Fanning out activity"
        );

        let mut dispatched = 0;
        for (follower, inbox) in followers {
            let delivery = Arc::clone(self);
            let blog_iri = blog_iri.to_string();
            let kind = kind.clone();
            let body = body.clone();

            tokio::spawn(async move {
                if let Err(e) = delivery.post_signed(&blog_iri, &kind, body, &inbox).await {
                    tracing::warn!(
                        actor = %follower,
                        inbox = %inbox,
                        activity_type = %kind,
                        error = %e,
                        "Delivery failed"
                    );
                }
            });
            dispatched += 1;
        }

        Ok(dispatched)
    }

    async fn post_signed(
        &self,
        blog_iri: &str,
        kind: &str,
        body: Vec<u8>,
        inbox: &str,
    ) -> Result<(), AppError> {
        let _timer = FEDERATION_REQUEST_DURATION_SECONDS
            .with_label_values(&["outbound"])
            .start_timer();

        let result = self.try_post_signed(blog_iri, body, inbox).await;
        let status = match &result {
            Ok(()) => "success",
            Err(e) => e.kind(),
        };
        observe_delivery(kind, status);

        if result.is_ok() {
            tracing::debug!(inbox, activity_type = kind, "Delivered activity");
        }
        result
    }

    async fn try_post_signed(
        &self,
        blog_iri: &str,
        body: Vec<u8>,
        inbox: &str,
    ) -> Result<(), AppError> {
        let url = url::Url::parse(inbox)
            .map_err(|e| AppError::Parse(format!("Invalid inbox {}: {}", inbox, e)))?;
        let host = host_header(&url)?;
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();

        let mut request = self
            .http_client
            .post(url)
            .timeout(DELIVERY_TIMEOUT)
            .header(ACCEPT_CHARSET, "utf-8")
            .header(DATE, date)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(ACCEPT, ACTIVITY_CONTENT_TYPE)
            .header(CONTENT_TYPE, ACTIVITY_CONTENT_TYPE)
            .header(HOST, host)
            .body(body.clone())
            .build()?;

        self.signer
            .sign(&mut request, &body, &key_id_for(blog_iri))?;

        let response = self.http_client.execute(request).await?;
        let status = response.status().as_u16();
        if !SUCCESS_STATUSES.contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::RemoteRejected { status, body });
        }

        Ok(())
    }
}

fn activity_type(activity: &serde_json::Value) -> &str {
    activity
        .get("type")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("Unknown")
}

/// `Host` header value for a target URL (port only when non-default)
fn host_header(url: &url::Url) -> Result<String, AppError> {
    let host = url
        .host_str()
        .ok_or_else(|| AppError::Parse(format!("Missing host in {}", url)))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Activity builders
///
/// All outbound documents are plain JSON with the ActivityStreams context.
pub mod builder {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde_json::{Map, Value};

    use crate::data::Post;

    pub const ACTIVITY_STREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";
    pub const PUBLIC_AUDIENCE: &str = "https://www.w3.org/ns/activitystreams#Public";

    fn timestamp(value: DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Build an Accept activity answering a Follow
    ///
    /// # Arguments
    /// * `id` - Fresh activity ID (never the Follow's ID)
    /// * `blog_iri` - Accepting blog
    /// * `follower` - Actor the Accept is addressed to
    /// * `follow` - The received Follow; its `@context` is dropped
    pub fn accept(id: &str, blog_iri: &str, follower: &str, follow: &Map<String, Value>) -> Value {
        let mut object = follow.clone();
        object.remove("@context");

        serde_json::json!({
            "@context": ACTIVITY_STREAMS_CONTEXT,
            "to": follower,
            "id": id,
            "actor": blog_iri,
            "object": Value::Object(object),
            "type": "Accept"
        })
    }

    /// Build the Note representing a post
    pub fn note(blog_iri: &str, public_url: &str, post: &Post) -> Value {
        let mut note = Map::new();
        note.insert("type".to_string(), "Note".into());
        note.insert("id".to_string(), public_url.into());
        note.insert("url".to_string(), public_url.into());
        note.insert("attributedTo".to_string(), blog_iri.into());
        note.insert("content".to_string(), post.content.as_str().into());
        note.insert("mediaType".to_string(), "text/html".into());
        note.insert("to".to_string(), serde_json::json!([PUBLIC_AUDIENCE]));
        if let Some(title) = post.title.as_deref().filter(|t| !t.is_empty()) {
            note.insert("name".to_string(), title.into());
        }
        if let Some(published) = post.published {
            note.insert("published".to_string(), timestamp(published).into());
        }
        if let Some(updated) = post.updated {
            note.insert("updated".to_string(), timestamp(updated).into());
        }
        if let Some(in_reply_to) = post.in_reply_to.as_deref().filter(|r| !r.is_empty()) {
            note.insert("inReplyTo".to_string(), in_reply_to.into());
        }
        Value::Object(note)
    }

    /// Build a Create activity for a published post
    pub fn create(blog_iri: &str, public_url: &str, post: &Post) -> Value {
        let mut activity = serde_json::json!({
            "@context": ACTIVITY_STREAMS_CONTEXT,
            "actor": blog_iri,
            "id": public_url,
            "type": "Create",
            "object": note(blog_iri, public_url, post)
        });
        if let Some(published) = post.published {
            activity["published"] = timestamp(published).into();
        }
        activity
    }

    /// Build an Update activity for an edited post
    pub fn update(blog_iri: &str, public_url: &str, post: &Post) -> Value {
        serde_json::json!({
            "@context": ACTIVITY_STREAMS_CONTEXT,
            "actor": blog_iri,
            "id": public_url,
            "type": "Update",
            "object": note(blog_iri, public_url, post)
        })
    }

    /// Build a Delete activity with a Tombstone object
    pub fn delete(blog_iri: &str, public_url: &str) -> Value {
        serde_json::json!({
            "@context": ACTIVITY_STREAMS_CONTEXT,
            "actor": blog_iri,
            "id": format!("{}#delete", public_url),
            "type": "Delete",
            "object": {
                "id": public_url,
                "type": "Tombstone"
            }
        })
    }
}
