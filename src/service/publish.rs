//! Post lifecycle federation
//!
//! Turns publish, edit and delete events of blog posts into
//! Create, Update and Delete activities for followers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::data::Post;
use crate::error::AppError;
use crate::federation::{ActivityDelivery, builder};

/// Post federation service
///
/// Every hook returns the number of deliveries started. Drafts,
/// unlisted sections and disabled federation all yield 0.
pub struct PostFederation {
    config: Arc<AppConfig>,
    /// None when federation is disabled
    delivery: Option<Arc<ActivityDelivery>>,
}

impl PostFederation {
    pub fn new(config: Arc<AppConfig>, delivery: Option<Arc<ActivityDelivery>>) -> Self {
        Self { config, delivery }
    }

    /// Federate a newly published post as a Create
    pub async fn post_created(&self, post: &Post) -> Result<usize, AppError> {
        let Some((delivery, blog_iri, public_url)) = self.prepare(post, true)? else {
            return Ok(0);
        };
        let activity = builder::create(&blog_iri, &public_url, post);
        delivery.fan_out(&post.blog, &blog_iri, &activity).await
    }

    /// Federate an edited post as an Update
    pub async fn post_updated(&self, post: &Post) -> Result<usize, AppError> {
        let Some((delivery, blog_iri, public_url)) = self.prepare(post, true)? else {
            return Ok(0);
        };
        let activity = builder::update(&blog_iri, &public_url, post);
        delivery.fan_out(&post.blog, &blog_iri, &activity).await
    }

    /// Federate a removed post as a Delete
    ///
    /// Sent for any post of a federated blog, drafts included.
    pub async fn post_deleted(&self, post: &Post) -> Result<usize, AppError> {
        let Some((delivery, blog_iri, public_url)) = self.prepare(post, false)? else {
            return Ok(0);
        };
        let activity = builder::delete(&blog_iri, &public_url);
        delivery.fan_out(&post.blog, &blog_iri, &activity).await
    }

    /// Resolve delivery, blog IRI and public URL, or None when the post is skipped
    fn prepare(
        &self,
        post: &Post,
        require_visible: bool,
    ) -> Result<Option<(&Arc<ActivityDelivery>, String, String)>, AppError> {
        let Some(delivery) = self.delivery.as_ref() else {
            return Ok(None);
        };
        let (blog, blog_iri) = self.config.blog(&post.blog).ok_or(AppError::NotFound)?;

        if require_visible {
            if post.published.is_none() {
                tracing::debug!(blog = %post.blog, path = %post.path, "Skipping unpublished post");
                return Ok(None);
            }
            if !blog.is_federated_section(&post.section) {
                tracing::debug!(
                    blog = %post.blog,
                    path = %post.path,
                    section = %post.section,
                    "Skipping post outside federated sections"
                );
                return Ok(None);
            }
        }

        let public_url = format!("{}{}", self.config.server.base_url(), post.path);
        Ok(Some((delivery, blog_iri, public_url)))
    }
}
