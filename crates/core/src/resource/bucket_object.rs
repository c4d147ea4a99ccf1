//! `rabata_s3_bucket_object` resource

use std::collections::BTreeMap;
use std::path::Path;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::attrs::non_empty;
use crate::bulk;
use crate::classify::{is_status, status};
use crate::client::ProviderClient;
use crate::config::expand_home;
use crate::error::{Error, Result, ResultExt};
use crate::traits::{ObjectRequest, PutObjectRequest};

const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

/// Attribute values of a bucket object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketObjectState {
    pub id: String,
    pub bucket: String,
    pub key: String,
    pub acl: String,
    pub cache_control: String,
    pub content_disposition: String,
    pub content_encoding: String,
    pub content_language: String,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
    pub source: String,
    pub content: String,
    pub content_base64: String,
    pub storage_class: String,
    pub etag: String,
    pub version_id: String,
    pub force_destroy: bool,
}

impl Default for BucketObjectState {
    fn default() -> Self {
        Self {
            id: String::new(),
            bucket: String::new(),
            key: String::new(),
            acl: "private".to_string(),
            cache_control: String::new(),
            content_disposition: String::new(),
            content_encoding: String::new(),
            content_language: String::new(),
            content_type: String::new(),
            metadata: BTreeMap::new(),
            source: String::new(),
            content: String::new(),
            content_base64: String::new(),
            storage_class: String::new(),
            etag: String::new(),
            version_id: String::new(),
            force_destroy: false,
        }
    }
}

impl BucketObjectState {
    /// The first attribute whose change requires uploading a new object
    /// version, if any
    pub fn changed_content_attribute(&self, plan: &BucketObjectState) -> Option<&'static str> {
        [
            ("cache_control", self.cache_control != plan.cache_control),
            ("content_base64", self.content_base64 != plan.content_base64),
            ("content_disposition", self.content_disposition != plan.content_disposition),
            ("content_encoding", self.content_encoding != plan.content_encoding),
            ("content_language", self.content_language != plan.content_language),
            ("content_type", self.content_type != plan.content_type),
            ("content", self.content != plan.content),
            ("etag", self.etag != plan.etag),
            ("metadata", self.metadata != plan.metadata),
            ("source", self.source != plan.source),
            ("storage_class", self.storage_class != plan.storage_class),
        ]
        .into_iter()
        .find(|(_, changed)| *changed)
        .map(|(name, _)| name)
    }

    fn source_path(&self) -> Option<std::path::PathBuf> {
        non_empty(&self.source).map(|source| expand_home(&source))
    }
}

/// Upload the object and read it back
pub async fn create(
    client: &ProviderClient,
    plan: BucketObjectState,
) -> Result<Option<BucketObjectState>> {
    put(client, plan).await
}

async fn put(client: &ProviderClient, mut state: BucketObjectState) -> Result<Option<BucketObjectState>> {
    let body = object_body(&state).await?;

    let content_type = non_empty(&state.content_type).or_else(|| {
        state
            .source_path()
            .and_then(|path| guess_content_type(&path))
    });

    let request = PutObjectRequest {
        bucket: state.bucket.clone(),
        key: state.key.clone(),
        acl: non_empty(&state.acl),
        body,
        storage_class: non_empty(&state.storage_class),
        cache_control: non_empty(&state.cache_control),
        content_type,
        metadata: state.metadata.clone(),
        content_encoding: non_empty(&state.content_encoding),
        content_language: non_empty(&state.content_language),
        content_disposition: non_empty(&state.content_disposition),
    };

    let output = client
        .api()
        .put_object(request)
        .await
        .with_context(|| format!("Error putting object in S3 bucket ({})", state.bucket))?;

    tracing::debug!(
        bucket = %state.bucket,
        key = %state.key,
        version_id = output.version_id.as_deref().unwrap_or_default(),
        "uploaded S3 bucket object"
    );

    state.id = state.key.clone();
    read(client, state).await
}

/// Exactly one of source, content or content_base64 becomes the body.
/// With none of them set the object is empty.
async fn object_body(state: &BucketObjectState) -> Result<Vec<u8>> {
    if let Some(path) = state.source_path() {
        return tokio::fs::read(&path)
            .await
            .map_err(Error::from)
            .with_context(|| {
                format!("Error opening S3 bucket object source ({})", path.display())
            });
    }

    if !state.content.is_empty() {
        return Ok(state.content.as_bytes().to_vec());
    }

    if !state.content_base64.is_empty() {
        return Ok(base64::engine::general_purpose::STANDARD.decode(&state.content_base64)?);
    }

    Ok(Vec::new())
}

fn guess_content_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// Refresh the object from its metadata. Remote values replace local ones.
pub async fn read(
    client: &ProviderClient,
    mut state: BucketObjectState,
) -> Result<Option<BucketObjectState>> {
    let request = ObjectRequest::new(&state.bucket, &state.key);

    let head = match client.api().head_object(&request).await {
        Ok(head) => head,
        Err(err) if is_status(&err, status::NOT_FOUND) => {
            tracing::warn!(
                "Error Reading Object ({}), object not found (HTTP status 404)",
                state.key
            );
            return Ok(None);
        }
        Err(err) => {
            return Err(err.context(format!(
                "error reading S3 Bucket ({}) Object ({})",
                state.bucket, state.key
            )));
        }
    };

    tracing::debug!("Reading S3 Bucket Object meta: {head:?}");

    state.cache_control = head.cache_control.unwrap_or_default();
    state.content_disposition = head.content_disposition.unwrap_or_default();
    state.content_encoding = head.content_encoding.unwrap_or_default();
    state.content_language = head.content_language.unwrap_or_default();
    state.content_type = head.content_type.unwrap_or_default();
    state.metadata = head
        .metadata
        .into_iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .collect();
    state.version_id = head.version_id.unwrap_or_default();
    state.etag = head.etag.unwrap_or_default().trim_matches('"').to_string();
    state.storage_class = head
        .storage_class
        .unwrap_or_else(|| DEFAULT_STORAGE_CLASS.to_string());

    if state.id.is_empty() {
        state.id = state.key.clone();
    }

    Ok(Some(state))
}

/// Re-upload when content changed, otherwise apply an ACL change in place
pub async fn update(
    client: &ProviderClient,
    prior: &BucketObjectState,
    mut plan: BucketObjectState,
) -> Result<Option<BucketObjectState>> {
    if plan.id.is_empty() {
        plan.id = prior.id.clone();
    }

    if let Some(attribute) = prior.changed_content_attribute(&plan) {
        tracing::debug!(attribute, "content changed, uploading a new object version");
        return put(client, plan).await;
    }

    if prior.acl != plan.acl {
        client
            .api()
            .put_object_acl(&plan.bucket, &plan.key, &plan.acl)
            .await
            .context("error putting S3 object ACL")?;
    }

    read(client, plan).await
}

/// Delete the object. A versioned object loses every version.
pub async fn delete(client: &ProviderClient, state: &BucketObjectState) -> Result<()> {
    let api = client.api();
    let bucket = state.bucket.as_str();
    // a leading slash is not part of the stored key
    let key = state.key.strip_prefix('/').unwrap_or(&state.key);

    let result = if state.version_id.is_empty() {
        bulk::delete_object_version(api, bucket, key, None, false).await
    } else {
        match bulk::delete_all_object_versions(api, bucket, key, state.force_destroy, false).await {
            Err(err) if bulk::is_not_implemented(&err) => {
                bulk::delete_all_objects(api, bucket, key, state.force_destroy, false).await
            }
            other => other,
        }
        .map(|_| ())
    };

    result.with_context(|| format!("error deleting S3 Bucket ({bucket}) Object ({key})"))
}

/// Attributes unknown until apply: a new etag means a new version
pub fn planned_unknowns(prior: &BucketObjectState, plan: &BucketObjectState) -> Vec<&'static str> {
    if prior.etag != plan.etag {
        vec!["version_id"]
    } else {
        Vec::new()
    }
}
