//! S3Api trait definition
//!
//! This trait defines the subset of the S3 API the provider consumes.
//! It keeps the handlers decoupled from the specific S3 SDK so they can be
//! exercised against mocks and in-memory fakes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Bucket owner as reported by GET bucket ACL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

/// The party a grant applies to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grantee {
    /// `CanonicalUser` or `Group`
    pub grantee_type: String,
    pub id: Option<String>,
    pub uri: Option<String>,
    pub display_name: Option<String>,
}

/// A single (grantee, permission) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub grantee: Grantee,
    pub permission: String,
}

/// Full access control policy of a bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlPolicy {
    pub owner: Option<Owner>,
    pub grants: Vec<Grant>,
}

/// Body of a PUT bucket ACL call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclUpdate {
    /// Canned ACL name, e.g. `private`
    Canned(String),
    /// Explicit grant list
    Policy(AccessControlPolicy),
}

/// Input of a create bucket call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateBucketRequest {
    pub bucket: String,
    pub acl: Option<String>,
    /// Omitted for `us-east-1`
    pub location_constraint: Option<String>,
}

/// Input of a put object call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub acl: Option<String>,
    pub body: Vec<u8>,
    pub storage_class: Option<String>,
    pub cache_control: Option<String>,
    pub content_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_disposition: Option<String>,
}

/// Output of a put object call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutObjectOutput {
    pub etag: Option<String>,
    pub version_id: Option<String>,
}

/// Object address for head/get calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectRequest {
    pub bucket: String,
    pub key: String,
    pub version_id: Option<String>,
    pub range: Option<String>,
}

impl ObjectRequest {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            ..Default::default()
        }
    }
}

/// Metadata returned by a head object call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHead {
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_length: Option<i64>,
    pub content_type: Option<String>,
    /// Raw ETag, possibly quoted
    pub etag: Option<String>,
    pub expiration: Option<String>,
    pub expires: Option<String>,
    pub last_modified: Option<jiff::Timestamp>,
    pub metadata: BTreeMap<String, String>,
    pub sse_kms_key_id: Option<String>,
    /// `None` means STANDARD
    pub storage_class: Option<String>,
    pub version_id: Option<String>,
    pub delete_marker: bool,
}

/// Input of a list objects (v2) call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsRequest {
    pub bucket: String,
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub encoding_type: Option<String>,
    /// Page size
    pub max_keys: Option<i32>,
    pub start_after: Option<String>,
    pub fetch_owner: Option<bool>,
    pub continuation_token: Option<String>,
}

/// An entry of a list objects page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub owner_id: Option<String>,
    pub size: Option<i64>,
}

/// One page of a list objects call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsPage {
    pub objects: Vec<ObjectSummary>,
    pub common_prefixes: Vec<String>,
    pub key_count: i32,
    pub is_truncated: bool,
    pub next_continuation_token: Option<String>,
}

/// Input of a list object versions call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListVersionsRequest {
    pub bucket: String,
    pub prefix: Option<String>,
    pub key_marker: Option<String>,
    pub version_id_marker: Option<String>,
}

/// A version or delete marker of an object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: Option<String>,
}

/// One page of a list object versions call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListVersionsPage {
    pub versions: Vec<ObjectVersion>,
    pub delete_markers: Vec<ObjectVersion>,
    pub is_truncated: bool,
    pub next_key_marker: Option<String>,
    pub next_version_id_marker: Option<String>,
}

/// Input of a delete object call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteObjectRequest {
    pub bucket: String,
    pub key: String,
    pub version_id: Option<String>,
    /// Override object lock governance retention
    pub bypass_governance_retention: bool,
}

/// Trait for the S3 operations the provider performs
///
/// This trait is implemented by the SDK adapter and can be mocked for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait S3Api: Send + Sync {
    /// Create a bucket
    async fn create_bucket(&self, request: &CreateBucketRequest) -> Result<()>;

    /// Existence check for a bucket
    async fn head_bucket(&self, bucket: &str) -> Result<()>;

    /// Region the bucket lives in
    async fn bucket_region(&self, bucket: &str) -> Result<String>;

    /// Read the bucket access control policy
    async fn get_bucket_acl(&self, bucket: &str) -> Result<AccessControlPolicy>;

    /// Replace the bucket access control policy
    async fn put_bucket_acl(&self, bucket: &str, acl: &AclUpdate) -> Result<()>;

    /// Delete a bucket
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;

    /// List one page of objects
    async fn list_objects(&self, request: &ListObjectsRequest) -> Result<ListObjectsPage>;

    /// List one page of object versions and delete markers
    async fn list_object_versions(&self, request: &ListVersionsRequest)
    -> Result<ListVersionsPage>;

    /// Upload an object
    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput>;

    /// Get object metadata
    async fn head_object(&self, request: &ObjectRequest) -> Result<ObjectHead>;

    /// Get object content as bytes
    async fn get_object(&self, request: &ObjectRequest) -> Result<Vec<u8>>;

    /// Apply a canned ACL to an object
    async fn put_object_acl(&self, bucket: &str, key: &str, acl: &str) -> Result<()>;

    /// Delete an object or one of its versions
    async fn delete_object(&self, request: &DeleteObjectRequest) -> Result<()>;
}
