//! ActivityPub federation module
//!
//! Handles:
//! - Activity processing (inbox)
//! - Activity delivery (outbox)
//! - HTTP Signatures
//! - Remote actor resolution
//! - WebFinger and host-meta

mod activity;
mod actor;
mod delivery;
mod links;
mod signature;
mod sinks;
mod webfinger;

pub use activity::{Activity, ActivityProcessor, ActivityType, CreatedObject};
pub use actor::{ACTIVITY_JSON, RemoteActor, resolve_actor};
pub use delivery::{ACTIVITY_CONTENT_TYPE, ActivityDelivery, USER_AGENT_VALUE, builder};
pub use links::extract_links;
pub use signature::{
    RequestSigner, SIGNED_HEADERS, generate_digest, key_id_for, parse_signature_header,
    verify_signature,
};
pub use sinks::{CitationSink, Notifier};
pub use webfinger::{
    JRD_CONTENT_TYPE, WebFingerLink, WebFingerResponse, XRD_CONTENT_TYPE, account_from_resource,
    generate_webfinger_response, host_meta_document,
};
