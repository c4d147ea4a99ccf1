//! `rabata_s3_bucket_objects` data source
//!
//! `max_keys` bounds the total number of keys across every page, so the
//! page size shrinks once fewer than a full page remain.

use serde::{Deserialize, Serialize};

use crate::attrs::non_empty;
use crate::client::ProviderClient;
use crate::error::{Result, ResultExt};
use crate::id::unique_id;
use crate::schema::DEFAULT_MAX_KEYS;
use crate::traits::ListObjectsRequest;

const KEY_REQUEST_PAGE_SIZE: i64 = 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BucketObjectsDataArgs {
    pub bucket: String,
    pub prefix: String,
    pub delimiter: String,
    pub encoding_type: String,
    pub max_keys: i64,
    pub start_after: String,
    pub fetch_owner: bool,
}

impl Default for BucketObjectsDataArgs {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: String::new(),
            delimiter: String::new(),
            encoding_type: String::new(),
            max_keys: DEFAULT_MAX_KEYS,
            start_after: String::new(),
            fetch_owner: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BucketObjectsData {
    pub id: String,
    pub bucket: String,
    pub prefix: String,
    pub delimiter: String,
    pub encoding_type: String,
    pub max_keys: i64,
    pub start_after: String,
    pub fetch_owner: bool,
    pub keys: Vec<String>,
    pub common_prefixes: Vec<String>,
    pub owners: Vec<String>,
}

pub async fn read(client: &ProviderClient, args: BucketObjectsDataArgs) -> Result<BucketObjectsData> {
    let api = client.api();
    let mut request = ListObjectsRequest {
        bucket: args.bucket.clone(),
        prefix: non_empty(&args.prefix),
        delimiter: non_empty(&args.delimiter),
        encoding_type: non_empty(&args.encoding_type),
        start_after: non_empty(&args.start_after),
        fetch_owner: args.fetch_owner.then_some(true),
        ..Default::default()
    };

    let mut keys = Vec::new();
    let mut common_prefixes = Vec::new();
    let mut owners = Vec::new();
    let mut max_keys = args.max_keys;

    while max_keys > 0 {
        request.max_keys = (max_keys <= KEY_REQUEST_PAGE_SIZE).then_some(max_keys as i32);

        let page = api
            .list_objects(&request)
            .await
            .context("error listing S3 Bucket Objects")?;

        tracing::debug!(
            "Listed {} keys from S3 bucket {}",
            page.key_count,
            args.bucket
        );

        common_prefixes.extend(page.common_prefixes);
        for object in page.objects {
            keys.push(object.key);
            if let Some(owner) = object.owner_id {
                owners.push(owner);
            }
        }

        max_keys -= i64::from(page.key_count);

        match page.next_continuation_token {
            Some(token) if page.is_truncated => request.continuation_token = Some(token),
            _ => break,
        }
    }

    Ok(BucketObjectsData {
        id: unique_id(),
        bucket: args.bucket,
        prefix: args.prefix,
        delimiter: args.delimiter,
        encoding_type: args.encoding_type,
        max_keys: args.max_keys,
        start_after: args.start_after,
        fetch_owner: args.fetch_owner,
        keys,
        common_prefixes,
        owners,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::config::ProviderConfig;
    use crate::testing::FakeS3;
    use crate::traits::{ListObjectsPage, MockS3Api, ObjectSummary};

    fn client(api: Arc<dyn crate::traits::S3Api>) -> ProviderClient {
        let config = ProviderConfig::with_static_credentials("eu-west-1", "a", "b");
        ProviderClient::new(api, &config)
    }

    fn seeded(count: usize) -> FakeS3 {
        (0..count).fold(FakeS3::new().with_bucket("b"), |fake, i| {
            fake.with_object("b", &format!("key-{i:05}"), "x")
        })
    }

    #[tokio::test]
    async fn test_default_budget_reads_one_page() {
        let fake = Arc::new(seeded(1500));
        let data = read(
            &client(fake.clone()),
            BucketObjectsDataArgs {
                bucket: "b".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(data.keys.len(), 1000);
        assert_eq!(fake.calls("list_objects"), 1);
        assert!(data.owners.is_empty());
        assert_eq!(data.id.len(), 26);
    }

    #[tokio::test]
    async fn test_budget_spans_pages() {
        let fake = Arc::new(seeded(2600));
        let data = read(
            &client(fake.clone()),
            BucketObjectsDataArgs {
                bucket: "b".into(),
                max_keys: 2500,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(data.keys.len(), 2500);
        assert_eq!(data.keys[2499], "key-02499");
        assert_eq!(fake.calls("list_objects"), 3);
    }

    #[tokio::test]
    async fn test_page_size_shrinks_with_budget() {
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let seen = sizes.clone();
        let mut mock = MockS3Api::new();
        mock.expect_list_objects().returning(move |request| {
            seen.lock().unwrap().push(request.max_keys);
            let count = request.max_keys.unwrap_or(1000);
            Ok(ListObjectsPage {
                objects: (0..count)
                    .map(|i| ObjectSummary {
                        key: format!("k{i}"),
                        owner_id: Some("me".into()),
                        size: None,
                    })
                    .collect(),
                key_count: count,
                is_truncated: true,
                next_continuation_token: Some("next".into()),
                ..Default::default()
            })
        });

        let data = read(
            &client(Arc::new(mock)),
            BucketObjectsDataArgs {
                bucket: "b".into(),
                max_keys: 1200,
                fetch_owner: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(*sizes.lock().unwrap(), vec![None, Some(200)]);
        assert_eq!(data.keys.len(), 1200);
        assert_eq!(data.owners.len(), 1200);
    }

    #[tokio::test]
    async fn test_delimiter_collects_common_prefixes() {
        let fake = FakeS3::new()
            .with_bucket("b")
            .with_object("b", "logs/a", "x")
            .with_object("b", "logs/b", "x")
            .with_object("b", "top", "x");
        let data = read(
            &client(Arc::new(fake)),
            BucketObjectsDataArgs {
                bucket: "b".into(),
                delimiter: "/".into(),
                fetch_owner: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(data.keys, vec!["top"]);
        assert_eq!(data.common_prefixes, vec!["logs/"]);
        assert_eq!(data.owners, vec![crate::testing::OWNER_ID]);
    }

    #[tokio::test]
    async fn test_truncated_page_without_token_ends_listing() {
        let mut mock = MockS3Api::new();
        mock.expect_list_objects().times(1).returning(|_| {
            Ok(ListObjectsPage {
                key_count: 0,
                is_truncated: true,
                next_continuation_token: None,
                ..Default::default()
            })
        });

        let data = read(
            &client(Arc::new(mock)),
            BucketObjectsDataArgs {
                bucket: "b".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(data.keys.is_empty());
    }

    #[tokio::test]
    async fn test_zero_budget_skips_listing() {
        let mut mock = MockS3Api::new();
        mock.expect_list_objects().never();

        let data = read(
            &client(Arc::new(mock)),
            BucketObjectsDataArgs {
                bucket: "b".into(),
                max_keys: 0,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(data.keys.is_empty());
    }
}
