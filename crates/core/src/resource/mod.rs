//! Managed resources
//!
//! Each handler takes the configured [`ProviderClient`](crate::ProviderClient)
//! and typed attributes, and returns the new state, or `None` once the
//! resource no longer exists remotely.

pub mod bucket;
pub mod bucket_object;

pub use bucket::{BucketState, GrantBlock};
pub use bucket_object::BucketObjectState;
