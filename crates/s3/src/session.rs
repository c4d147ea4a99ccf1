//! SDK configuration from the resolved provider configuration

use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};

use rabata_core::{Credentials, ProviderConfig};

const STATIC_CREDENTIALS_PROVIDER: &str = "rabata-static-credentials";

/// Total attempts for one call: the first plus `max_retries` retries
pub(crate) fn max_attempts(max_retries: u32) -> u32 {
    max_retries.saturating_add(1)
}

/// Load the shared SDK configuration
pub async fn load(config: &ProviderConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .retry_config(RetryConfig::standard().with_max_attempts(max_attempts(config.max_retries)))
        .endpoint_url(config.s3_endpoint_url());

    match &config.credentials {
        Credentials::Static {
            access_key,
            secret_key,
        } => {
            loader = loader.credentials_provider(aws_credential_types::Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                STATIC_CREDENTIALS_PROVIDER,
            ));
        }
        Credentials::Profile {
            profile,
            shared_credentials_file,
        } => {
            if let Some(profile) = profile {
                loader = loader.profile_name(profile);
            }
            if let Some(path) = shared_credentials_file {
                tracing::debug!("Using shared credentials file {}", path.display());
                let files = ProfileFiles::builder()
                    .include_default_config_file(true)
                    .with_file(ProfileFileKind::Credentials, path)
                    .build();
                loader = loader.profile_files(files);
            }
        }
    }

    tracing::debug!(
        region = %config.region,
        endpoint = %config.s3_endpoint_url(),
        "Loading S3 session"
    );
    loader.load().await
}
