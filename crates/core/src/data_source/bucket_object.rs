//! `rabata_s3_bucket_object` data source

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::attrs::non_empty;
use crate::client::ProviderClient;
use crate::error::{Error, Result, ResultExt};
use crate::traits::ObjectRequest;

const RFC1123_UTC: &str = "%a, %d %b %Y %H:%M:%S UTC";
const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BucketObjectDataArgs {
    pub bucket: String,
    pub key: String,
    pub range: String,
    pub version_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BucketObjectData {
    pub id: String,
    pub bucket: String,
    pub key: String,
    pub range: String,
    pub body: String,
    pub cache_control: String,
    pub content_disposition: String,
    pub content_encoding: String,
    pub content_language: String,
    pub content_length: i64,
    pub content_type: String,
    pub etag: String,
    pub expiration: String,
    pub expires: String,
    pub last_modified: String,
    pub metadata: BTreeMap<String, String>,
    pub sse_kms_key_id: String,
    pub storage_class: String,
    pub version_id: String,
}

/// Only textual bodies are exposed as a string attribute
fn is_content_type_allowed(content_type: &str) -> bool {
    content_type
        .strip_prefix("text/")
        .is_some_and(|rest| !rest.is_empty())
        || content_type == "application/json"
}

pub async fn read(client: &ProviderClient, args: BucketObjectDataArgs) -> Result<BucketObjectData> {
    let api = client.api();
    let request = ObjectRequest {
        bucket: args.bucket.clone(),
        key: args.key.clone(),
        version_id: non_empty(&args.version_id),
        range: non_empty(&args.range),
    };

    let mut id = format!("{}/{}", args.bucket, args.key);
    if !args.version_id.is_empty() {
        id.push('@');
        id.push_str(&args.version_id);
    }
    tracing::debug!("Reading S3 Bucket Object: {id}");

    let head = api
        .head_object(&request)
        .await
        .with_context(|| format!("Failed getting S3 object ({id})"))?;

    if head.delete_marker {
        let version = if args.version_id.is_empty() {
            String::new()
        } else {
            format!(" of version {:?}", args.version_id)
        };
        return Err(Error::NotFound(format!(
            "Requested S3 object \"{}/{}\"{version} has been deleted",
            args.bucket, args.key
        )));
    }

    let content_type = head.content_type.clone().unwrap_or_default();
    let body = if is_content_type_allowed(&content_type) {
        let bytes = api
            .get_object(&request)
            .await
            .with_context(|| format!("Failed getting S3 object ({id})"))?;
        tracing::info!("Saving {} bytes from S3 object {id}", bytes.len());
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        tracing::info!(
            "Ignoring body of S3 object {id} with Content-Type {content_type:?}, body set to <EMPTY>"
        );
        String::new()
    };

    Ok(BucketObjectData {
        id,
        body,
        cache_control: head.cache_control.unwrap_or_default(),
        content_disposition: head.content_disposition.unwrap_or_default(),
        content_encoding: head.content_encoding.unwrap_or_default(),
        content_language: head.content_language.unwrap_or_default(),
        content_length: head.content_length.unwrap_or_default(),
        content_type,
        etag: head
            .etag
            .map(|etag| etag.trim_matches('"').to_string())
            .unwrap_or_default(),
        expiration: head.expiration.unwrap_or_default(),
        expires: head.expires.unwrap_or_default(),
        last_modified: head
            .last_modified
            .map(|ts| ts.strftime(RFC1123_UTC).to_string())
            .unwrap_or_default(),
        metadata: head
            .metadata
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect(),
        sse_kms_key_id: head.sse_kms_key_id.unwrap_or_default(),
        storage_class: head
            .storage_class
            .unwrap_or_else(|| DEFAULT_STORAGE_CLASS.to_string()),
        version_id: head.version_id.unwrap_or_default(),
        bucket: args.bucket,
        key: args.key,
        range: args.range,
    })
}
