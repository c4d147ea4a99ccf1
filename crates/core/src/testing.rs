//! In-memory S3 service for handler tests

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ApiError, Error, Result};
use crate::traits::*;

pub(crate) const OWNER_ID: &str = "owner-id";
const ALL_USERS: &str = "http://acs.amazonaws.com/groups/global/AllUsers";

fn api(code: &str, status: u16) -> Error {
    Error::Api(ApiError::new(code, "").with_status(status))
}

struct StoredObject {
    body: Vec<u8>,
    head: ObjectHead,
    acl: String,
}

struct FakeBucket {
    acl: AccessControlPolicy,
    objects: BTreeMap<String, StoredObject>,
}

#[derive(Default)]
struct FakeState {
    buckets: BTreeMap<String, FakeBucket>,
    calls: HashMap<&'static str, usize>,
    failures: HashMap<&'static str, VecDeque<Error>>,
    hangs: HashMap<&'static str, usize>,
    version_seq: u64,
    versioning_unsupported: bool,
}

pub(crate) struct FakeS3 {
    region: String,
    state: Mutex<FakeState>,
}

fn owner_policy(acl: Option<&str>) -> AccessControlPolicy {
    let owner = Owner {
        id: Some(OWNER_ID.to_string()),
        display_name: Some("owner".to_string()),
    };
    let mut grants = vec![Grant {
        grantee: Grantee {
            grantee_type: "CanonicalUser".to_string(),
            id: Some(OWNER_ID.to_string()),
            uri: None,
            display_name: Some("owner".to_string()),
        },
        permission: "FULL_CONTROL".to_string(),
    }];
    if matches!(acl, Some("public-read" | "public-read-write")) {
        grants.push(Grant {
            grantee: Grantee {
                grantee_type: "Group".to_string(),
                id: None,
                uri: Some(ALL_USERS.to_string()),
                display_name: None,
            },
            permission: "READ".to_string(),
        });
    }
    AccessControlPolicy {
        owner: Some(owner),
        grants,
    }
}

/// FNV-1a, enough to give distinct bodies distinct ETags
fn etag_of(body: &[u8]) -> String {
    let hash = body.iter().fold(0xcbf29ce484222325u64, |h, b| {
        (h ^ u64::from(*b)).wrapping_mul(0x100000001b3)
    });
    format!("\"{hash:016x}\"")
}

impl FakeS3 {
    pub(crate) fn new() -> Self {
        Self::with_region("eu-west-1")
    }

    pub(crate) fn with_region(region: &str) -> Self {
        Self {
            region: region.to_string(),
            state: Mutex::new(FakeState::default()),
        }
    }

    pub(crate) fn with_bucket(self, bucket: &str) -> Self {
        self.state.lock().unwrap().buckets.insert(
            bucket.to_string(),
            FakeBucket {
                acl: owner_policy(None),
                objects: BTreeMap::new(),
            },
        );
        self
    }

    /// Seed an object without counting a call
    pub(crate) fn with_object(self, bucket: &str, key: &str, body: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.version_seq += 1;
            let version = format!("v{}", state.version_seq);
            let objects = &mut state.buckets.get_mut(bucket).unwrap().objects;
            objects.insert(
                key.to_string(),
                StoredObject {
                    body: body.as_bytes().to_vec(),
                    head: ObjectHead {
                        content_type: Some("text/plain".to_string()),
                        content_length: Some(body.len() as i64),
                        etag: Some(etag_of(body.as_bytes())),
                        version_id: Some(version),
                        ..Default::default()
                    },
                    acl: "private".to_string(),
                },
            );
        }
        self
    }

    pub(crate) fn without_versioning(self) -> Self {
        self.state.lock().unwrap().versioning_unsupported = true;
        self
    }

    /// The next call to `op` fails with `err`
    pub(crate) fn fail_next(&self, op: &'static str, err: Error) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(op)
            .or_default()
            .push_back(err);
    }

    /// The next call to `op` never completes
    pub(crate) fn hang_next(&self, op: &'static str) {
        *self.state.lock().unwrap().hangs.entry(op).or_default() += 1;
    }

    /// Count a call to `op` and report whether it should hang
    fn take_hang(&self, op: &'static str) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.hangs.get_mut(op) {
            Some(pending) if *pending > 0 => {
                *pending -= 1;
                *state.calls.entry(op).or_default() += 1;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn calls(&self, op: &str) -> usize {
        self.state.lock().unwrap().calls.get(op).copied().unwrap_or(0)
    }

    pub(crate) fn bucket_exists(&self, bucket: &str) -> bool {
        self.state.lock().unwrap().buckets.contains_key(bucket)
    }

    pub(crate) fn object_count(&self, bucket: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .buckets
            .get(bucket)
            .map_or(0, |b| b.objects.len())
    }

    pub(crate) fn object_body(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.buckets.get(bucket)?.objects.get(key).map(|o| o.body.clone())
    }

    pub(crate) fn object_acl(&self, bucket: &str, key: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.buckets.get(bucket)?.objects.get(key).map(|o| o.acl.clone())
    }

    pub(crate) fn remove_object(&self, bucket: &str, key: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(b) = state.buckets.get_mut(bucket) {
            b.objects.remove(key);
        }
    }

    pub(crate) fn remove_bucket(&self, bucket: &str) {
        self.state.lock().unwrap().buckets.remove(bucket);
    }

    fn begin(&self, op: &'static str) -> Result<std::sync::MutexGuard<'_, FakeState>> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(op).or_default() += 1;
        if let Some(err) = state.failures.get_mut(op).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        Ok(state)
    }
}

#[async_trait]
impl S3Api for FakeS3 {
    async fn create_bucket(&self, request: &CreateBucketRequest) -> Result<()> {
        if self.take_hang("create_bucket") {
            std::future::pending::<()>().await;
        }
        let mut state = self.begin("create_bucket")?;
        if state.buckets.contains_key(&request.bucket) {
            return Err(api("BucketAlreadyOwnedByYou", 409));
        }
        state.buckets.insert(
            request.bucket.clone(),
            FakeBucket {
                acl: owner_policy(request.acl.as_deref()),
                objects: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn head_bucket(&self, bucket: &str) -> Result<()> {
        let state = self.begin("head_bucket")?;
        if state.buckets.contains_key(bucket) {
            Ok(())
        } else {
            Err(api("NotFound", 404))
        }
    }

    async fn bucket_region(&self, bucket: &str) -> Result<String> {
        let state = self.begin("bucket_region")?;
        if state.buckets.contains_key(bucket) {
            Ok(self.region.clone())
        } else {
            Err(api("NotFound", 404))
        }
    }

    async fn get_bucket_acl(&self, bucket: &str) -> Result<AccessControlPolicy> {
        let state = self.begin("get_bucket_acl")?;
        state
            .buckets
            .get(bucket)
            .map(|b| b.acl.clone())
            .ok_or_else(|| api("NoSuchBucket", 404))
    }

    async fn put_bucket_acl(&self, bucket: &str, acl: &AclUpdate) -> Result<()> {
        let mut state = self.begin("put_bucket_acl")?;
        let b = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| api("NoSuchBucket", 404))?;
        b.acl = match acl {
            AclUpdate::Canned(name) => owner_policy(Some(name)),
            AclUpdate::Policy(policy) => policy.clone(),
        };
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let mut state = self.begin("delete_bucket")?;
        match state.buckets.get(bucket) {
            None => Err(api("NoSuchBucket", 404)),
            Some(b) if !b.objects.is_empty() => Err(api("BucketNotEmpty", 409)),
            Some(_) => {
                state.buckets.remove(bucket);
                Ok(())
            }
        }
    }

    async fn list_objects(&self, request: &ListObjectsRequest) -> Result<ListObjectsPage> {
        let state = self.begin("list_objects")?;
        let b = state
            .buckets
            .get(&request.bucket)
            .ok_or_else(|| api("NoSuchBucket", 404))?;

        let page_size = request.max_keys.unwrap_or(1000).max(0) as usize;
        let after = request
            .continuation_token
            .clone()
            .or_else(|| request.start_after.clone());
        let prefix = request.prefix.clone().unwrap_or_default();

        let mut page = ListObjectsPage::default();
        let mut last_key = None;
        let mut remaining = b
            .objects
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .filter(|(k, _)| after.as_ref().is_none_or(|a| k.as_str() > a.as_str()));

        for (key, object) in remaining.by_ref() {
            if page.key_count as usize >= page_size {
                page.is_truncated = true;
                break;
            }
            if let Some(delimiter) = &request.delimiter
                && let Some(pos) = key[prefix.len()..].find(delimiter.as_str())
            {
                let common = key[..prefix.len() + pos + delimiter.len()].to_string();
                if !page.common_prefixes.contains(&common) {
                    page.common_prefixes.push(common);
                }
                last_key = Some(key.clone());
                continue;
            }
            page.objects.push(ObjectSummary {
                key: key.clone(),
                owner_id: request
                    .fetch_owner
                    .unwrap_or(false)
                    .then(|| OWNER_ID.to_string()),
                size: object.head.content_length,
            });
            page.key_count += 1;
            last_key = Some(key.clone());
        }

        if page.is_truncated {
            page.next_continuation_token = last_key;
        }
        Ok(page)
    }

    async fn list_object_versions(
        &self,
        request: &ListVersionsRequest,
    ) -> Result<ListVersionsPage> {
        let state = self.begin("list_object_versions")?;
        if state.versioning_unsupported {
            return Err(api("NotImplemented", 501));
        }
        let b = state
            .buckets
            .get(&request.bucket)
            .ok_or_else(|| api("NoSuchBucket", 404))?;
        let prefix = request.prefix.clone().unwrap_or_default();

        Ok(ListVersionsPage {
            versions: b
                .objects
                .iter()
                .filter(|(k, _)| k.starts_with(&prefix))
                .map(|(k, o)| ObjectVersion {
                    key: k.clone(),
                    version_id: o.head.version_id.clone(),
                })
                .collect(),
            ..Default::default()
        })
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput> {
        let mut state = self.begin("put_object")?;
        state.version_seq += 1;
        let version_id = format!("v{}", state.version_seq);
        let b = state
            .buckets
            .get_mut(&request.bucket)
            .ok_or_else(|| api("NoSuchBucket", 404))?;

        let etag = etag_of(&request.body);
        let head = ObjectHead {
            cache_control: request.cache_control,
            content_disposition: request.content_disposition,
            content_encoding: request.content_encoding,
            content_language: request.content_language,
            content_length: Some(request.body.len() as i64),
            content_type: request
                .content_type
                .or_else(|| Some("binary/octet-stream".to_string())),
            etag: Some(etag.clone()),
            last_modified: Some(jiff::Timestamp::UNIX_EPOCH),
            metadata: request.metadata,
            storage_class: request.storage_class.filter(|s| s != "STANDARD"),
            version_id: Some(version_id.clone()),
            ..Default::default()
        };
        b.objects.insert(
            request.key,
            StoredObject {
                body: request.body,
                head,
                acl: request.acl.unwrap_or_else(|| "private".to_string()),
            },
        );
        Ok(PutObjectOutput {
            etag: Some(etag),
            version_id: Some(version_id),
        })
    }

    async fn head_object(&self, request: &ObjectRequest) -> Result<ObjectHead> {
        let state = self.begin("head_object")?;
        state
            .buckets
            .get(&request.bucket)
            .and_then(|b| b.objects.get(&request.key))
            .map(|o| o.head.clone())
            .ok_or_else(|| api("NotFound", 404))
    }

    async fn get_object(&self, request: &ObjectRequest) -> Result<Vec<u8>> {
        let state = self.begin("get_object")?;
        state
            .buckets
            .get(&request.bucket)
            .and_then(|b| b.objects.get(&request.key))
            .map(|o| o.body.clone())
            .ok_or_else(|| api("NoSuchKey", 404))
    }

    async fn put_object_acl(&self, bucket: &str, key: &str, acl: &str) -> Result<()> {
        let mut state = self.begin("put_object_acl")?;
        let object = state
            .buckets
            .get_mut(bucket)
            .and_then(|b| b.objects.get_mut(key))
            .ok_or_else(|| api("NoSuchKey", 404))?;
        object.acl = acl.to_string();
        Ok(())
    }

    async fn delete_object(&self, request: &DeleteObjectRequest) -> Result<()> {
        let mut state = self.begin("delete_object")?;
        let b = state
            .buckets
            .get_mut(&request.bucket)
            .ok_or_else(|| api("NoSuchBucket", 404))?;
        b.objects.remove(&request.key);
        Ok(())
    }
}
