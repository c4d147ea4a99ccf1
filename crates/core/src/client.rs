//! The configured client handed to every handler

use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::traits::S3Api;

/// One S3 API handle plus the resolved region and DNS suffix
#[derive(Clone)]
pub struct ProviderClient {
    api: Arc<dyn S3Api>,
    region: String,
    dns_suffix: String,
}

impl ProviderClient {
    pub fn new(api: Arc<dyn S3Api>, config: &ProviderConfig) -> Self {
        Self {
            api,
            region: config.region.clone(),
            dns_suffix: config.dns_suffix(),
        }
    }

    pub fn api(&self) -> &dyn S3Api {
        self.api.as_ref()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn dns_suffix(&self) -> &str {
        &self.dns_suffix
    }

    /// `prefix` joined with the DNS suffix, e.g. `bucket.s3.eu-west-1.rabata.io`
    pub fn partition_hostname(&self, prefix: &str) -> String {
        format!("{prefix}.{}", self.dns_suffix)
    }

    /// Domain name of a bucket
    pub fn bucket_domain_name(&self, bucket: &str) -> String {
        self.partition_hostname(&format!("{bucket}.s3"))
    }
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("region", &self.region)
            .field("dns_suffix", &self.dns_suffix)
            .finish_non_exhaustive()
    }
}

/// ARN of a bucket. The partition is always `aws`.
pub fn bucket_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{bucket}")
}
