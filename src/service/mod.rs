//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate configuration, storage and federation.

mod publish;

pub use publish::PostFederation;
