//! `rabata_s3_bucket` resource

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::attrs::non_empty;
use crate::bulk;
use crate::classify::{codes, is_api_error, is_bucket_not_found};
use crate::client::{ProviderClient, bucket_arn};
use crate::error::{Error, Result, ResultExt};
use crate::id::{prefixed_unique_id, unique_id};
use crate::retry::{RetryError, retry_on_code, retry_until};
use crate::traits::{AccessControlPolicy, AclUpdate, CreateBucketRequest, Grant, Grantee};
use crate::validation::validate_s3_bucket_name;

/// Deadline for bucket creation while the service reports `OperationAborted`
pub const CREATE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// How long a just-created bucket may stay invisible
pub const CREATION_READ_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Pause between force-destroy rounds that found nothing to delete
const FORCE_DESTROY_PAUSE: Duration = Duration::from_secs(1);

const PRIVATE_ACL: &str = "private";
const FULL_CONTROL: &str = "FULL_CONTROL";
const NO_LOCATION_CONSTRAINT_REGION: &str = "us-east-1";

/// One grantee and its permissions
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct GrantBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub grant_type: String,
    pub uri: String,
    pub permissions: BTreeSet<String>,
}

/// Attribute values of a bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketState {
    pub id: String,
    pub bucket: String,
    pub bucket_prefix: String,
    pub bucket_domain_name: String,
    pub bucket_regional_domain_name: String,
    pub arn: String,
    pub acl: String,
    pub grant: BTreeSet<GrantBlock>,
    pub region: String,
    pub force_destroy: bool,
}

impl Default for BucketState {
    fn default() -> Self {
        Self {
            id: String::new(),
            bucket: String::new(),
            bucket_prefix: String::new(),
            bucket_domain_name: String::new(),
            bucket_regional_domain_name: String::new(),
            arn: String::new(),
            acl: PRIVATE_ACL.to_string(),
            grant: BTreeSet::new(),
            region: String::new(),
            force_destroy: false,
        }
    }
}

/// Create the bucket, apply its grants and read it back
pub async fn create(client: &ProviderClient, mut plan: BucketState) -> Result<Option<BucketState>> {
    let bucket = if !plan.bucket.is_empty() {
        plan.bucket.clone()
    } else if !plan.bucket_prefix.is_empty() {
        prefixed_unique_id(&plan.bucket_prefix)
    } else {
        unique_id()
    };
    plan.bucket = bucket.clone();

    validate_s3_bucket_name(&bucket).context("error validating S3 bucket name")?;

    let region = client.region();
    tracing::debug!(bucket = %bucket, region, "S3 bucket create");

    let request = CreateBucketRequest {
        bucket: bucket.clone(),
        acl: non_empty(&plan.acl),
        location_constraint: (region != NO_LOCATION_CONSTRAINT_REGION).then(|| region.to_string()),
    };

    let api = client.api();
    let request = &request;
    let name = bucket.as_str();
    let result = retry_until(CREATE_TIMEOUT, || async move {
        tracing::debug!("trying to create new S3 bucket: {name:?}");
        match api.create_bucket(request).await {
            Ok(()) => Ok(()),
            Err(err) if is_api_error(&err, codes::OPERATION_ABORTED, "") => {
                tracing::warn!("got an error while trying to create S3 bucket {name}: {err}");
                Err(RetryError::retryable(
                    err.context(format!("error creating S3 bucket {name}, retrying")),
                ))
            }
            Err(err) => Err(RetryError::non_retryable(err)),
        }
    })
    .await;

    let result = match result {
        Err(err) if err.is_resource_timeout() => api.create_bucket(request).await,
        other => other,
    };
    result.context("error creating S3 bucket")?;

    plan.id = bucket;
    apply(client, None, plan, true).await
}

/// Read the bucket. `is_new` tolerates a bucket that is not visible yet.
pub async fn read(
    client: &ProviderClient,
    mut state: BucketState,
    is_new: bool,
) -> Result<Option<BucketState>> {
    let api = client.api();
    let id_owned = state.id.clone();
    let id = id_owned.as_str();

    let head = retry_until(CREATION_READ_TIMEOUT, || async move {
        match api.head_bucket(id).await {
            Ok(()) => Ok(()),
            Err(err) if is_new && is_bucket_not_found(&err) => Err(RetryError::retryable(err)),
            Err(err) => Err(RetryError::non_retryable(err)),
        }
    })
    .await;

    let head = match head {
        Err(err) if err.is_resource_timeout() => api.head_bucket(id).await,
        other => other,
    };

    match head {
        Ok(()) => {}
        Err(err) if is_bucket_not_found(&err) => {
            tracing::warn!("S3 Bucket ({id}) not found, removing from state");
            return Ok(None);
        }
        Err(err) => return Err(err.context(format!("error reading S3 Bucket ({id})"))),
    }

    // import only knows the id
    if state.bucket.is_empty() {
        state.bucket = id.to_string();
    }

    let domain_name = client.bucket_domain_name(&state.bucket);
    state.bucket_domain_name = domain_name.clone();

    if !state.acl.is_empty() && state.acl != PRIVATE_ACL {
        state.grant.clear();
    } else {
        let policy = retry_on_code(codes::NO_SUCH_BUCKET, || async move {
            api.get_bucket_acl(id).await
        })
        .await
        .with_context(|| format!("error getting S3 Bucket ({id}) ACL"))?;

        tracing::debug!(bucket = id, "read ACL grants policy: {policy:?}");
        state.grant = flatten_grants(&policy);
    }

    let region = retry_on_code(codes::NOT_FOUND, || async move { api.bucket_region(id).await })
        .await
        .context("error getting S3 Bucket location")?;

    state.region = region;
    state.bucket_regional_domain_name = domain_name;
    state.arn = bucket_arn(id);

    Ok(Some(state))
}

/// Apply ACL or grant changes between `prior` and `plan`, then read
pub async fn update(
    client: &ProviderClient,
    prior: &BucketState,
    mut plan: BucketState,
) -> Result<Option<BucketState>> {
    if plan.id.is_empty() {
        plan.id = prior.id.clone();
    }
    if plan.bucket.is_empty() {
        plan.bucket = prior.bucket.clone();
    }
    apply(client, Some(prior), plan, false).await
}

async fn apply(
    client: &ProviderClient,
    prior: Option<&BucketState>,
    plan: BucketState,
    is_new: bool,
) -> Result<Option<BucketState>> {
    let acl_changed = prior.is_some_and(|p| p.acl != plan.acl);
    let grant_changed = match prior {
        Some(p) => p.grant != plan.grant,
        None => !plan.grant.is_empty(),
    };

    if acl_changed && !is_new {
        put_canned_acl(client, &plan).await?;
    }

    if grant_changed {
        update_grants(client, &plan).await?;
    }

    read(client, plan, is_new).await
}

async fn put_canned_acl(client: &ProviderClient, state: &BucketState) -> Result<()> {
    let api = client.api();
    let bucket = state.bucket.as_str();
    let update = AclUpdate::Canned(state.acl.clone());
    let update = &update;

    tracing::debug!(bucket, acl = %state.acl, "S3 put bucket ACL");

    retry_on_code(codes::NO_SUCH_BUCKET, || async move {
        api.put_bucket_acl(bucket, update).await
    })
    .await
    .context("error putting S3 ACL")
}

async fn update_grants(client: &ProviderClient, state: &BucketState) -> Result<()> {
    if state.grant.is_empty() {
        tracing::debug!(bucket = %state.bucket, "grants fallback to canned ACL");
        return put_canned_acl(client, state)
            .await
            .context("error fallback to canned ACL");
    }

    let api = client.api();
    let id = state.id.as_str();
    let bucket = state.bucket.as_str();

    let current = retry_on_code(codes::NO_SUCH_BUCKET, || async move {
        api.get_bucket_acl(id).await
    })
    .await
    .with_context(|| format!("error getting S3 Bucket ({id}) ACL"))?;

    let update = AclUpdate::Policy(AccessControlPolicy {
        owner: current.owner,
        grants: expand_grants(&state.grant),
    });
    let update = &update;

    tracing::debug!(bucket, "put grants: {update:?}");

    retry_on_code(codes::NO_SUCH_BUCKET, || async move {
        api.put_bucket_acl(bucket, update).await
    })
    .await
    .context("error putting S3 Grants")
}

/// Delete the bucket. With `force_destroy` a non-empty bucket is emptied
/// and the delete retried until the service agrees it is empty.
pub async fn delete(client: &ProviderClient, state: &BucketState) -> Result<()> {
    let api = client.api();
    let id = state.id.as_str();

    loop {
        tracing::debug!("S3 Delete Bucket: {id}");
        let err = match api.delete_bucket(id).await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        if is_api_error(&err, codes::NO_SUCH_BUCKET, "") {
            return Ok(());
        }

        if !(state.force_destroy && is_api_error(&err, codes::BUCKET_NOT_EMPTY, "")) {
            return Err(err.context(format!("error deleting S3 Bucket ({id})")));
        }

        tracing::debug!("S3 Bucket attempting to forceDestroy: {err}");

        let deleted = bulk::delete_all_objects(api, id, "", false, false)
            .await
            .context("error S3 Bucket force_destroy")?;
        if deleted > 0 {
            continue;
        }

        // only versions or delete markers can be left
        match bulk::delete_all_object_versions(api, id, "", false, false).await {
            Ok(n) if n > 0 => {}
            Ok(_) => tokio::time::sleep(FORCE_DESTROY_PAUSE).await,
            Err(err) if bulk::is_not_implemented(&err) => {
                tokio::time::sleep(FORCE_DESTROY_PAUSE).await
            }
            Err(err) => return Err(err.context("error S3 Bucket force_destroy")),
        }
    }
}

/// Passthrough import: the id names the bucket and Read fills the rest
pub async fn import(client: &ProviderClient, id: &str) -> Result<BucketState> {
    let state = BucketState {
        id: id.to_string(),
        ..Default::default()
    };
    read(client, state, false).await?.ok_or_else(|| {
        Error::NotFound(format!(
            "Cannot import non-existent remote object: S3 Bucket ({id})"
        ))
    })
}

/// Group a policy's grants by grantee. A policy holding only the owner's
/// FULL_CONTROL is the default private ACL and flattens to nothing.
pub fn flatten_grants(policy: &AccessControlPolicy) -> BTreeSet<GrantBlock> {
    let owner_id = policy
        .owner
        .as_ref()
        .and_then(|o| o.id.as_deref())
        .unwrap_or_default();

    if let [only] = policy.grants.as_slice()
        && only.grantee.id.as_deref().unwrap_or_default() == owner_id
        && only.permission == FULL_CONTROL
    {
        return BTreeSet::new();
    }

    let mut grouped: BTreeMap<(String, String, String), BTreeSet<String>> = BTreeMap::new();
    for grant in &policy.grants {
        let grantee = &grant.grantee;
        grouped
            .entry((
                grantee.grantee_type.clone(),
                grantee.id.clone().unwrap_or_default(),
                grantee.uri.clone().unwrap_or_default(),
            ))
            .or_default()
            .insert(grant.permission.clone());
    }

    grouped
        .into_iter()
        .map(|((grant_type, id, uri), permissions)| GrantBlock {
            id,
            grant_type,
            uri,
            permissions,
        })
        .collect()
}

/// One grant per (grantee, permission)
pub fn expand_grants(blocks: &BTreeSet<GrantBlock>) -> Vec<Grant> {
    blocks
        .iter()
        .flat_map(|block| {
            block.permissions.iter().map(move |permission| Grant {
                grantee: Grantee {
                    grantee_type: block.grant_type.clone(),
                    id: non_empty(&block.id),
                    uri: non_empty(&block.uri),
                    display_name: None,
                },
                permission: permission.clone(),
            })
        })
        .collect()
}
