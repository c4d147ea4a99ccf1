//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the S3Api trait from rabata-core.

use async_trait::async_trait;
use aws_sdk_s3::operation::get_bucket_acl::GetBucketAclOutput;
use aws_sdk_s3::operation::head_object::HeadObjectOutput;
use aws_sdk_s3::operation::list_object_versions::ListObjectVersionsOutput;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::primitives::{ByteStream, DateTime};
use aws_sdk_s3::types::{
    self as sdk, BucketCannedAcl, BucketLocationConstraint, CreateBucketConfiguration,
    EncodingType, ObjectCannedAcl, Permission, StorageClass, Type,
};

use rabata_core::traits::{
    AccessControlPolicy, AclUpdate, CreateBucketRequest, DeleteObjectRequest, Grant, Grantee,
    ListObjectsPage, ListObjectsRequest, ListVersionsPage, ListVersionsRequest, ObjectHead,
    ObjectRequest, ObjectSummary, ObjectVersion, Owner, PutObjectOutput, PutObjectRequest,
};
use rabata_core::{Error, ProviderConfig, Result, S3Api};

use crate::error::from_sdk_error;
use crate::session;

/// Region reported for buckets without a location constraint
const DEFAULT_BUCKET_REGION: &str = "us-east-1";

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client from the provider configuration
    pub async fn new(config: &ProviderConfig) -> Self {
        let sdk_config = session::load(config).await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.s3_force_path_style)
            .build();

        Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        }
    }
}

fn timestamp(value: &DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::new(value.secs(), value.subsec_nanos() as i32).ok()
}

fn policy_from_sdk(output: &GetBucketAclOutput) -> AccessControlPolicy {
    AccessControlPolicy {
        owner: output.owner().map(|owner| Owner {
            id: owner.id().map(str::to_string),
            display_name: owner.display_name().map(str::to_string),
        }),
        grants: output
            .grants()
            .iter()
            .filter_map(|grant| {
                let grantee = grant.grantee()?;
                Some(Grant {
                    grantee: Grantee {
                        grantee_type: grantee.r#type().as_str().to_string(),
                        id: grantee.id().map(str::to_string),
                        uri: grantee.uri().map(str::to_string),
                        display_name: grantee.display_name().map(str::to_string),
                    },
                    permission: grant
                        .permission()
                        .map(|p| p.as_str().to_string())
                        .unwrap_or_default(),
                })
            })
            .collect(),
    }
}

fn policy_to_sdk(policy: &AccessControlPolicy) -> Result<sdk::AccessControlPolicy> {
    let grants = policy
        .grants
        .iter()
        .map(|grant| {
            let grantee = sdk::Grantee::builder()
                .r#type(Type::from(grant.grantee.grantee_type.as_str()))
                .set_id(grant.grantee.id.clone())
                .set_uri(grant.grantee.uri.clone())
                .set_display_name(grant.grantee.display_name.clone())
                .build()
                .map_err(|e| Error::General(format!("invalid grantee: {e}")))?;
            Ok(sdk::Grant::builder()
                .grantee(grantee)
                .permission(Permission::from(grant.permission.as_str()))
                .build())
        })
        .collect::<Result<Vec<_>>>()?;

    let owner = policy.owner.as_ref().map(|owner| {
        sdk::Owner::builder()
            .set_id(owner.id.clone())
            .set_display_name(owner.display_name.clone())
            .build()
    });

    Ok(sdk::AccessControlPolicy::builder()
        .set_owner(owner)
        .set_grants(Some(grants))
        .build())
}

fn list_page(output: ListObjectsV2Output) -> ListObjectsPage {
    let objects: Vec<ObjectSummary> = output
        .contents()
        .iter()
        .map(|object| ObjectSummary {
            key: object.key().unwrap_or_default().to_string(),
            owner_id: object.owner().and_then(|o| o.id()).map(str::to_string),
            size: object.size(),
        })
        .collect();

    ListObjectsPage {
        key_count: output.key_count().unwrap_or(objects.len() as i32),
        common_prefixes: output
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix().map(str::to_string))
            .collect(),
        is_truncated: output.is_truncated().unwrap_or(false),
        next_continuation_token: output.next_continuation_token().map(str::to_string),
        objects,
    }
}

fn versions_page(output: ListObjectVersionsOutput) -> ListVersionsPage {
    ListVersionsPage {
        versions: output
            .versions()
            .iter()
            .map(|v| ObjectVersion {
                key: v.key().unwrap_or_default().to_string(),
                version_id: v.version_id().map(str::to_string),
            })
            .collect(),
        delete_markers: output
            .delete_markers()
            .iter()
            .map(|m| ObjectVersion {
                key: m.key().unwrap_or_default().to_string(),
                version_id: m.version_id().map(str::to_string),
            })
            .collect(),
        is_truncated: output.is_truncated().unwrap_or(false),
        next_key_marker: output.next_key_marker().map(str::to_string),
        next_version_id_marker: output.next_version_id_marker().map(str::to_string),
    }
}

fn object_head(output: HeadObjectOutput) -> ObjectHead {
    ObjectHead {
        cache_control: output.cache_control().map(str::to_string),
        content_disposition: output.content_disposition().map(str::to_string),
        content_encoding: output.content_encoding().map(str::to_string),
        content_language: output.content_language().map(str::to_string),
        content_length: output.content_length(),
        content_type: output.content_type().map(str::to_string),
        etag: output.e_tag().map(str::to_string),
        expiration: output.expiration().map(str::to_string),
        expires: output.expires_string().map(str::to_string),
        last_modified: output.last_modified().and_then(timestamp),
        metadata: output
            .metadata()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default(),
        sse_kms_key_id: output.ssekms_key_id().map(str::to_string),
        storage_class: output.storage_class().map(|s| s.as_str().to_string()),
        version_id: output.version_id().map(str::to_string),
        delete_marker: output.delete_marker().unwrap_or(false),
    }
}

#[async_trait]
impl S3Api for S3Client {
    async fn create_bucket(&self, request: &CreateBucketRequest) -> Result<()> {
        let configuration = request.location_constraint.as_deref().map(|location| {
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(location))
                .build()
        });

        self.inner
            .create_bucket()
            .bucket(&request.bucket)
            .set_acl(request.acl.as_deref().map(BucketCannedAcl::from))
            .set_create_bucket_configuration(configuration)
            .send()
            .await
            .map_err(from_sdk_error)?;

        Ok(())
    }

    async fn head_bucket(&self, bucket: &str) -> Result<()> {
        self.inner
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(from_sdk_error)?;
        Ok(())
    }

    async fn bucket_region(&self, bucket: &str) -> Result<String> {
        let head = self
            .inner
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(from_sdk_error)?;
        if let Some(region) = head.bucket_region().filter(|r| !r.is_empty()) {
            return Ok(region.to_string());
        }

        let location = self
            .inner
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(from_sdk_error)?;

        Ok(location
            .location_constraint()
            .map(|l| l.as_str())
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_BUCKET_REGION)
            .to_string())
    }

    async fn get_bucket_acl(&self, bucket: &str) -> Result<AccessControlPolicy> {
        let output = self
            .inner
            .get_bucket_acl()
            .bucket(bucket)
            .send()
            .await
            .map_err(from_sdk_error)?;
        Ok(policy_from_sdk(&output))
    }

    async fn put_bucket_acl(&self, bucket: &str, acl: &AclUpdate) -> Result<()> {
        let request = self.inner.put_bucket_acl().bucket(bucket);
        let request = match acl {
            AclUpdate::Canned(acl) => request.acl(BucketCannedAcl::from(acl.as_str())),
            AclUpdate::Policy(policy) => request.access_control_policy(policy_to_sdk(policy)?),
        };

        request.send().await.map_err(from_sdk_error)?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.inner
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(from_sdk_error)?;
        Ok(())
    }

    async fn list_objects(&self, request: &ListObjectsRequest) -> Result<ListObjectsPage> {
        let output = self
            .inner
            .list_objects_v2()
            .bucket(&request.bucket)
            .set_prefix(request.prefix.clone())
            .set_delimiter(request.delimiter.clone())
            .set_encoding_type(request.encoding_type.as_deref().map(EncodingType::from))
            .set_max_keys(request.max_keys)
            .set_start_after(request.start_after.clone())
            .set_fetch_owner(request.fetch_owner)
            .set_continuation_token(request.continuation_token.clone())
            .send()
            .await
            .map_err(from_sdk_error)?;

        Ok(list_page(output))
    }

    async fn list_object_versions(
        &self,
        request: &ListVersionsRequest,
    ) -> Result<ListVersionsPage> {
        let output = self
            .inner
            .list_object_versions()
            .bucket(&request.bucket)
            .set_prefix(request.prefix.clone())
            .set_key_marker(request.key_marker.clone())
            .set_version_id_marker(request.version_id_marker.clone())
            .send()
            .await
            .map_err(from_sdk_error)?;

        Ok(versions_page(output))
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput> {
        let metadata = (!request.metadata.is_empty())
            .then(|| request.metadata.into_iter().collect());

        let output = self
            .inner
            .put_object()
            .bucket(request.bucket)
            .key(request.key)
            .body(ByteStream::from(request.body))
            .set_acl(request.acl.as_deref().map(ObjectCannedAcl::from))
            .set_storage_class(request.storage_class.as_deref().map(StorageClass::from))
            .set_cache_control(request.cache_control)
            .set_content_type(request.content_type)
            .set_content_encoding(request.content_encoding)
            .set_content_language(request.content_language)
            .set_content_disposition(request.content_disposition)
            .set_metadata(metadata)
            .send()
            .await
            .map_err(from_sdk_error)?;

        Ok(PutObjectOutput {
            etag: output.e_tag().map(str::to_string),
            version_id: output.version_id().map(str::to_string),
        })
    }

    async fn head_object(&self, request: &ObjectRequest) -> Result<ObjectHead> {
        let output = self
            .inner
            .head_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .set_version_id(request.version_id.clone())
            .set_range(request.range.clone())
            .send()
            .await
            .map_err(from_sdk_error)?;

        Ok(object_head(output))
    }

    async fn get_object(&self, request: &ObjectRequest) -> Result<Vec<u8>> {
        let response = self
            .inner
            .get_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .set_version_id(request.version_id.clone())
            .set_range(request.range.clone())
            .send()
            .await
            .map_err(from_sdk_error)?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn put_object_acl(&self, bucket: &str, key: &str, acl: &str) -> Result<()> {
        self.inner
            .put_object_acl()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::from(acl))
            .send()
            .await
            .map_err(from_sdk_error)?;
        Ok(())
    }

    async fn delete_object(&self, request: &DeleteObjectRequest) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .set_version_id(request.version_id.clone())
            .set_bypass_governance_retention(request.bypass_governance_retention.then_some(true))
            .send()
            .await
            .map_err(from_sdk_error)?;
        Ok(())
    }
}
