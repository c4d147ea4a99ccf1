//! `rabata_s3_bucket` data source

use serde::{Deserialize, Serialize};

use crate::client::{ProviderClient, bucket_arn};
use crate::error::{Result, ResultExt};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BucketDataArgs {
    pub bucket: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BucketData {
    pub id: String,
    pub bucket: String,
    pub arn: String,
    pub bucket_domain_name: String,
    pub bucket_regional_domain_name: String,
    pub region: String,
}

/// Look up an existing bucket. A missing bucket is an error.
pub async fn read(client: &ProviderClient, args: BucketDataArgs) -> Result<BucketData> {
    let bucket = args.bucket;
    let api = client.api();

    tracing::debug!("Reading S3 bucket: {bucket}");

    api.head_bucket(&bucket)
        .await
        .with_context(|| format!("failed getting S3 bucket ({bucket})"))?;

    let region = api
        .bucket_region(&bucket)
        .await
        .context("error getting S3 Bucket location")?;

    let domain_name = client.bucket_domain_name(&bucket);
    Ok(BucketData {
        id: bucket.clone(),
        arn: bucket_arn(&bucket),
        bucket_domain_name: domain_name.clone(),
        bucket_regional_domain_name: domain_name,
        region,
        bucket,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::ProviderConfig;
    use crate::testing::FakeS3;

    #[tokio::test]
    async fn test_read_existing_bucket() {
        let fake = Arc::new(FakeS3::with_region("us-east-1").with_bucket("assets"));
        let config = ProviderConfig::with_static_credentials("us-east-1", "a", "b");
        let client = ProviderClient::new(fake, &config);

        let data = read(
            &client,
            BucketDataArgs {
                bucket: "assets".into(),
            },
        )
        .await
        .unwrap();

        assert_eq!(data.id, "assets");
        assert_eq!(data.arn, "arn:aws:s3:::assets");
        assert_eq!(data.bucket_domain_name, "assets.s3.us-east-1.rabata.io");
        assert_eq!(data.region, "us-east-1");
    }

    #[tokio::test]
    async fn test_missing_bucket_is_error() {
        let config = ProviderConfig::with_static_credentials("eu-west-1", "a", "b");
        let client = ProviderClient::new(Arc::new(FakeS3::new()), &config);

        let err = read(
            &client,
            BucketDataArgs {
                bucket: "missing".into(),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.exit_code(), 5);
        assert!(err.to_string().contains("failed getting S3 bucket (missing)"));
    }
}
