//! Activity processing
//!
//! Decodes inbox submissions into [`Activity`] and runs the reaction
//! for each kind. Processing failures never reach the remote sender.

use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::actor::resolve_actor;
use super::delivery::{ActivityDelivery, builder};
use super::links::extract_links;
use super::sinks::{CitationSink, Notifier};
use crate::data::{Database, EntityId};
use crate::error::AppError;

/// Activity types this server reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    Follow,
    Undo,
    Create,
    Delete,
    Block,
    Like,
    Announce,
}

impl ActivityType {
    /// Parse activity type from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Follow" => Some(Self::Follow),
            "Undo" => Some(Self::Undo),
            "Create" => Some(Self::Create),
            "Delete" => Some(Self::Delete),
            "Block" => Some(Self::Block),
            "Like" => Some(Self::Like),
            "Announce" => Some(Self::Announce),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Follow => "Follow",
            Self::Undo => "Undo",
            Self::Create => "Create",
            Self::Delete => "Delete",
            Self::Block => "Block",
            Self::Like => "Like",
            Self::Announce => "Announce",
        }
    }
}

/// Keep strings, turn anything else (objects, numbers, null) into `None`
fn lenient_str<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Fields shared by every activity
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(rename = "type", default, deserialize_with = "lenient_str")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_str")]
    actor: Option<String>,
    #[serde(default)]
    object: Value,
}

/// Embedded Follow inside an Undo
#[derive(Debug, Default, Deserialize)]
struct EmbeddedActivity {
    #[serde(rename = "type", default, deserialize_with = "lenient_str")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_str")]
    actor: Option<String>,
}

/// Object carried by a Create
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreatedObject {
    #[serde(default, deserialize_with = "lenient_str")]
    pub id: Option<String>,
    #[serde(rename = "inReplyTo", default, deserialize_with = "lenient_str")]
    pub in_reply_to: Option<String>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub content: Option<String>,
}

/// A decoded inbox submission
#[derive(Debug, Clone, PartialEq)]
pub enum Activity {
    /// `document` is the whole Follow, echoed back in the Accept
    Follow {
        actor: String,
        object: Option<String>,
        document: Map<String, Value>,
    },
    /// Undo of a Follow: `inner_actor` is the actor of the embedded Follow
    UndoFollow { actor: String, inner_actor: String },
    Create { object: CreatedObject },
    Delete,
    Block { actor: String, object: String },
    Like { actor: String, object: String },
    Announce { actor: String, object: String },
    /// Unknown type or missing required fields
    Ignored,
}

impl Activity {
    /// Decode by type tag. Never fails; unusable documents become `Ignored`.
    pub fn decode(value: Value) -> Self {
        let Value::Object(document) = value else {
            return Self::Ignored;
        };
        let envelope = match Envelope::deserialize(Value::Object(document.clone())) {
            Ok(envelope) => envelope,
            Err(_) => return Self::Ignored,
        };
        let Some(kind) = envelope.kind.as_deref().and_then(ActivityType::from_str) else {
            return Self::Ignored;
        };

        let object_str = envelope
            .object
            .as_str()
            .filter(|object| !object.is_empty())
            .map(str::to_string);
        let actor = envelope.actor.filter(|actor| !actor.is_empty());

        match (kind, actor) {
            (ActivityType::Follow, Some(actor)) => Self::Follow {
                actor,
                object: object_str,
                document,
            },
            (ActivityType::Undo, Some(actor)) => {
                let inner = EmbeddedActivity::deserialize(envelope.object).unwrap_or_default();
                match (inner.kind.as_deref(), inner.actor) {
                    (Some("Follow"), Some(inner_actor)) => Self::UndoFollow { actor, inner_actor },
                    _ => Self::Ignored,
                }
            }
            (ActivityType::Create, _) => Self::Create {
                object: CreatedObject::deserialize(envelope.object).unwrap_or_default(),
            },
            (ActivityType::Delete, _) => Self::Delete,
            (ActivityType::Block, Some(actor)) => match object_str {
                Some(object) => Self::Block { actor, object },
                None => Self::Ignored,
            },
            (ActivityType::Like, Some(actor)) => match object_str {
                Some(object) => Self::Like { actor, object },
                None => Self::Ignored,
            },
            (ActivityType::Announce, Some(actor)) => match object_str {
                Some(object) => Self::Announce { actor, object },
                None => Self::Ignored,
            },
            _ => Self::Ignored,
        }
    }
}

/// Activity processor
///
/// Processes incoming ActivityPub activities from inbox.
pub struct ActivityProcessor {
    db: Arc<Database>,
    http_client: reqwest::Client,
    delivery: Arc<ActivityDelivery>,
    notifier: Arc<dyn Notifier>,
    citations: Arc<dyn CitationSink>,
}

impl ActivityProcessor {
    /// Create new activity processor
    pub fn new(
        db: Arc<Database>,
        http_client: reqwest::Client,
        delivery: Arc<ActivityDelivery>,
        notifier: Arc<dyn Notifier>,
        citations: Arc<dyn CitationSink>,
    ) -> Self {
        Self {
            db,
            http_client,
            delivery,
            notifier,
            citations,
        }
    }

    /// Process an activity addressed to a blog's inbox
    ///
    /// # Arguments
    /// * `blog` - Blog name the inbox belongs to
    /// * `blog_iri` - Identity IRI of that blog
    /// * `activity` - Decoded inbox submission
    ///
    /// # Errors
    /// Store, notification and delivery failures of the branch taken.
    /// A failed actor resolution during Follow is logged and swallowed.
    pub async fn process(
        &self,
        blog: &str,
        blog_iri: &str,
        activity: Activity,
    ) -> Result<(), AppError> {
        match activity {
            Activity::Follow {
                actor,
                object,
                document,
            } => {
                self.handle_follow(blog, blog_iri, &actor, object.as_deref(), &document)
                    .await
            }
            Activity::UndoFollow { actor, inner_actor } => {
                if actor == inner_actor {
                    self.remove_follower(blog, &actor).await?;
                }
                Ok(())
            }
            Activity::Create { object } => self.handle_create(blog_iri, object).await,
            Activity::Delete => Ok(()),
            Activity::Block { actor, object } => {
                if actor == object {
                    self.remove_follower(blog, &actor).await?;
                }
                Ok(())
            }
            Activity::Like { actor, object } => {
                if object.contains(blog_iri) {
                    self.notifier
                        .notify(&format!("{} liked {}", actor, object))
                        .await?;
                }
                Ok(())
            }
            Activity::Announce { actor, object } => {
                if object.contains(blog_iri) {
                    self.notifier
                        .notify(&format!("{} announced {}", actor, object))
                        .await?;
                }
                Ok(())
            }
            Activity::Ignored => Ok(()),
        }
    }

    async fn handle_follow(
        &self,
        blog: &str,
        blog_iri: &str,
        actor: &str,
        object: Option<&str>,
        document: &Map<String, Value>,
    ) -> Result<(), AppError> {
        if object == Some(actor) {
            tracing::debug!(blog, actor, "Ignoring self-follow");
            return Ok(());
        }

        tracing::info!(blog, actor, "New follow request");

        let remote = match resolve_actor(&self.http_client, actor).await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(blog, actor, error = %e, "Actor resolution failed");
                return Ok(());
            }
        };

        self.db
            .upsert_follower(blog, &remote.id, &remote.inbox)
            .await?;

        let accept_id = format!(
            "{}/accept/{}",
            blog_iri.trim_end_matches('/'),
            EntityId::new().0
        );
        let accept = builder::accept(&accept_id, blog_iri, actor, document);

        match self
            .delivery
            .deliver_to_inbox(blog_iri, &accept, &remote.inbox)
            .await
        {
            Ok(()) => {
                tracing::info!(blog, actor = %remote.id, inbox = %remote.inbox, "Follower accepted");
                Ok(())
            }
            Err(e) => {
                tracing::error!(blog, actor = %remote.id, inbox = %remote.inbox, error = %e, "Accept failed");
                Err(e)
            }
        }
    }

    async fn handle_create(&self, blog_iri: &str, object: CreatedObject) -> Result<(), AppError> {
        let Some(source) = object.id.filter(|id| !id.is_empty()) else {
            return Ok(());
        };

        if let Some(target) = object.in_reply_to.filter(|r| r.contains(blog_iri)) {
            return self.citations.record_citation(&source, &target).await;
        }

        if let Some(content) = object.content {
            for link in extract_links(&content, &source) {
                if link.contains(blog_iri) {
                    self.citations.record_citation(&source, &link).await?;
                }
            }
        }
        Ok(())
    }

    async fn remove_follower(&self, blog: &str, actor: &str) -> Result<(), AppError> {
        if self.db.delete_follower(blog, actor).await? {
            let remaining = self.db.count_followers(blog).await?;
            tracing::info!(blog, actor, remaining, "Follower removed");
        }
        Ok(())
    }
}
