//! Bulk object deletion
//!
//! Walks list pages and deletes every entry. Used by bucket force-destroy
//! and by object deletion when the object is versioned.

use crate::classify::{codes, is_api_error, is_object_gone, is_status, status};
use crate::error::{Error, Result};
use crate::traits::{DeleteObjectRequest, ListObjectsRequest, ListVersionsRequest, S3Api};

/// Delete one object or object version, treating an already missing
/// bucket or key as success. `force` bypasses governance retention.
pub async fn delete_object_version(
    api: &dyn S3Api,
    bucket: &str,
    key: &str,
    version_id: Option<&str>,
    force: bool,
) -> Result<()> {
    tracing::info!(
        bucket,
        key,
        version = version_id.unwrap_or_default(),
        "deleting S3 object"
    );

    let request = DeleteObjectRequest {
        bucket: bucket.to_string(),
        key: key.to_string(),
        version_id: version_id.map(str::to_string),
        bypass_governance_retention: force,
    };

    match api.delete_object(&request).await {
        Ok(()) => Ok(()),
        Err(err) if is_object_gone(&err) => Ok(()),
        Err(err) => {
            tracing::warn!(bucket, key, "error deleting S3 object: {err}");
            Err(err)
        }
    }
}

/// Delete the current version of every object in `bucket`, or only the
/// object named exactly `key` when `key` is non-empty. Returns the number
/// of objects deleted.
///
/// Individual delete failures do not stop the walk; the last one is
/// reported afterwards unless `ignore_object_errors` is set.
pub async fn delete_all_objects(
    api: &dyn S3Api,
    bucket: &str,
    key: &str,
    force: bool,
    ignore_object_errors: bool,
) -> Result<usize> {
    let mut request = ListObjectsRequest {
        bucket: bucket.to_string(),
        prefix: (!key.is_empty()).then(|| key.to_string()),
        ..Default::default()
    };
    let mut deleted = 0;
    let mut last_error = None;

    loop {
        let page = match api.list_objects(&request).await {
            Ok(page) => page,
            Err(err) if is_api_error(&err, codes::NO_SUCH_BUCKET, "") => break,
            Err(err) => return Err(err),
        };

        for object in page.objects {
            if !key.is_empty() && key != object.key {
                continue;
            }
            match delete_object_version(api, bucket, &object.key, None, force).await {
                Ok(()) => deleted += 1,
                Err(err) => last_error = Some(err),
            }
        }

        match page.next_continuation_token {
            Some(token) if page.is_truncated => request.continuation_token = Some(token),
            _ => break,
        }
    }

    finish("object version", deleted, last_error, ignore_object_errors)
}

/// Delete every version and delete marker in `bucket`, or those of the
/// object named exactly `key` when `key` is non-empty. Returns the number
/// of entries deleted. Services without versioning answer `NotImplemented`,
/// which is returned to the caller.
pub async fn delete_all_object_versions(
    api: &dyn S3Api,
    bucket: &str,
    key: &str,
    force: bool,
    ignore_object_errors: bool,
) -> Result<usize> {
    let mut request = ListVersionsRequest {
        bucket: bucket.to_string(),
        prefix: (!key.is_empty()).then(|| key.to_string()),
        ..Default::default()
    };
    let mut deleted = 0;
    let mut last_error = None;

    loop {
        let page = match api.list_object_versions(&request).await {
            Ok(page) => page,
            Err(err) if is_api_error(&err, codes::NO_SUCH_BUCKET, "") => break,
            Err(err) => return Err(err),
        };

        for entry in page.versions.iter().chain(page.delete_markers.iter()) {
            if !key.is_empty() && key != entry.key {
                continue;
            }
            match delete_object_version(api, bucket, &entry.key, entry.version_id.as_deref(), force)
                .await
            {
                Ok(()) => deleted += 1,
                Err(err) => last_error = Some(err),
            }
        }

        if !page.is_truncated {
            break;
        }
        request.key_marker = page.next_key_marker;
        request.version_id_marker = page.next_version_id_marker;
        if request.key_marker.is_none() && request.version_id_marker.is_none() {
            break;
        }
    }

    finish("object version or delete marker", deleted, last_error, ignore_object_errors)
}

/// True when the service does not support the requested operation
pub fn is_not_implemented(err: &Error) -> bool {
    is_api_error(err, codes::NOT_IMPLEMENTED, "") || is_status(err, status::NOT_IMPLEMENTED)
}

fn finish(
    what: &str,
    deleted: usize,
    last_error: Option<Error>,
    ignore_object_errors: bool,
) -> Result<usize> {
    match last_error {
        Some(err) if !ignore_object_errors => Err(err.context(format!(
            "error deleting at least one {what}, last error"
        ))),
        _ => Ok(deleted),
    }
}
