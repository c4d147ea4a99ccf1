//! Read-only data sources

pub mod bucket;
pub mod bucket_object;
pub mod bucket_objects;

pub use bucket::{BucketData, BucketDataArgs};
pub use bucket_object::{BucketObjectData, BucketObjectDataArgs};
pub use bucket_objects::{BucketObjectsData, BucketObjectsDataArgs};
