//! Provider configuration
//!
//! Configuration is layered: the TOML file, then environment variables for
//! unset credentials and region, then explicit overrides (CLI flags). The
//! result is resolved once into an immutable [`ProviderConfig`].
//!
//! The configuration file lives at `$RABATA_CONFIG_DIR/provider.toml` or
//! `<config dir>/rabata/provider.toml`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Default number of attempts the SDK makes per API request
pub const DEFAULT_MAX_RETRIES: u32 = 25;

/// Region used to build the DNS suffix when none is configured
pub const FALLBACK_DNS_REGION: &str = "eu-west-1";

/// Services whose endpoint can be overridden
pub const ENDPOINT_SERVICE_NAMES: &[&str] = &["s3"];

pub const ENV_ACCESS_KEY: &str = "RABATA_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "RABATA_SECRET_KEY";
pub const ENV_REGION: &str = "RABATA_REGION";
pub const ENV_CONFIG_DIR: &str = "RABATA_CONFIG_DIR";

/// Human readable descriptions of the provider attributes
pub const DESCRIPTIONS: &[(&str, &str)] = &[
    (
        "region",
        "The region where Rabata operations will take place. Examples are eu-west-1, us-east-1, etc.",
    ),
    (
        "access_key",
        "The access key for API operations. You can retrieve this from the 'Security & Credentials' section of the Rabata.io.",
    ),
    (
        "secret_key",
        "The secret key for API operations. You can retrieve this from the 'Security & Credentials' section of the Rabata.io.",
    ),
    (
        "profile",
        "The profile for API operations. If not set, the default profile created with `aws configure` will be used.",
    ),
    (
        "shared_credentials_file",
        "The path to the shared credentials file. If not set this defaults to ~/.aws/credentials.",
    ),
    (
        "max_retries",
        "The maximum number of times an Rabata API request is being executed. If the API request still fails, an error is thrown.",
    ),
    ("endpoints", "Use this to override the default service endpoint URL."),
    (
        "insecure",
        "Must be `false` or omitted: TLS certificate verification cannot be disabled.",
    ),
    (
        "s3_force_path_style",
        "Set this to true to force the request to use path-style addressing, i.e., http://s3.eu-west-1.rabata.io/BUCKET/KEY. \
         Otherwise the S3 client will use virtual hosted bucket addressing when possible \
         (http://BUCKET.s3.eu-west-1.rabata.io/KEY).",
    ),
];

/// Description of a provider attribute
pub fn description(name: &str) -> Option<&'static str> {
    DESCRIPTIONS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, text)| *text)
}

/// DNS suffix of a region, e.g. `eu-west-1.rabata.io`
pub fn dns_suffix(region: &str) -> String {
    let region = if region.is_empty() {
        FALLBACK_DNS_REGION
    } else {
        region
    };
    format!("{region}.rabata.io")
}

/// Default S3 endpoint of a region
pub fn default_s3_endpoint(region: &str) -> String {
    format!("https://s3.{}", dns_suffix(region))
}

/// Provider settings as written in the file or passed on the command line.
/// Every field is optional so layers can be merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_credentials_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Per-service endpoint overrides, keyed by service name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub endpoints: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_force_path_style: Option<bool>,
}

impl RawProviderConfig {
    /// Layer `overrides` on top of `self`; set values in `overrides` win
    pub fn merge(mut self, overrides: RawProviderConfig) -> Self {
        fn pick<T>(base: &mut Option<T>, over: Option<T>) {
            if over.is_some() {
                *base = over;
            }
        }

        pick(&mut self.access_key, overrides.access_key);
        pick(&mut self.secret_key, overrides.secret_key);
        pick(&mut self.profile, overrides.profile);
        pick(&mut self.shared_credentials_file, overrides.shared_credentials_file);
        pick(&mut self.region, overrides.region);
        pick(&mut self.max_retries, overrides.max_retries);
        pick(&mut self.insecure, overrides.insecure);
        pick(&mut self.s3_force_path_style, overrides.s3_force_path_style);
        self.endpoints.extend(overrides.endpoints);
        self
    }

    /// Resolve against the process environment
    pub fn resolve(self) -> Result<ProviderConfig> {
        self.resolve_with_env(|key| std::env::var(key).ok())
    }

    /// Resolve using `env` to look up environment variables
    pub fn resolve_with_env<F>(self, env: F) -> Result<ProviderConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        let from_env = |value: Option<String>, key: &str| non_empty(value).or_else(|| non_empty(env(key)));

        if self.insecure == Some(true) {
            return Err(Error::Config(
                "insecure = true is not supported: TLS certificate verification cannot be disabled".into(),
            ));
        }

        let access_key = from_env(self.access_key, ENV_ACCESS_KEY);
        let secret_key = from_env(self.secret_key, ENV_SECRET_KEY);
        let region = from_env(self.region, ENV_REGION).ok_or_else(|| {
            Error::Config(format!(
                "region is required: set it in the configuration file, with --region or with {ENV_REGION}"
            ))
        })?;

        let credentials = match (access_key, secret_key) {
            (Some(access_key), Some(secret_key)) => Credentials::Static {
                access_key,
                secret_key,
            },
            (None, None) => Credentials::Profile {
                profile: non_empty(self.profile),
                shared_credentials_file: non_empty(self.shared_credentials_file)
                    .map(|path| expand_home(&path)),
            },
            (Some(_), None) => {
                return Err(Error::Config(
                    "access_key is set but secret_key is missing".into(),
                ));
            }
            (None, Some(_)) => {
                return Err(Error::Config(
                    "secret_key is set but access_key is missing".into(),
                ));
            }
        };

        let mut s3_endpoint = None;
        for (service, value) in self.endpoints {
            if !ENDPOINT_SERVICE_NAMES.contains(&service.as_str()) {
                return Err(Error::Config(format!(
                    "unsupported endpoint service {service:?}, expected one of {ENDPOINT_SERVICE_NAMES:?}"
                )));
            }
            if !value.is_empty() {
                s3_endpoint = Some(Url::parse(&value)?);
            }
        }

        Ok(ProviderConfig {
            credentials,
            region,
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            s3_endpoint,
            s3_force_path_style: self.s3_force_path_style.unwrap_or(true),
        })
    }
}

/// Where credentials come from
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Explicit access/secret key pair
    Static {
        access_key: String,
        secret_key: String,
    },
    /// Shared config/credentials files, optionally a named profile
    Profile {
        profile: Option<String>,
        shared_credentials_file: Option<PathBuf>,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Static { access_key, .. } => f
                .debug_struct("Static")
                .field("access_key", access_key)
                .field("secret_key", &"<redacted>")
                .finish(),
            Credentials::Profile {
                profile,
                shared_credentials_file,
            } => f
                .debug_struct("Profile")
                .field("profile", profile)
                .field("shared_credentials_file", shared_credentials_file)
                .finish(),
        }
    }
}

/// Fully resolved, immutable provider configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub credentials: Credentials,
    pub region: String,
    pub max_retries: u32,
    /// Explicit S3 endpoint override
    pub s3_endpoint: Option<Url>,
    pub s3_force_path_style: bool,
}

impl ProviderConfig {
    /// Configuration with static credentials and defaults elsewhere
    pub fn with_static_credentials(
        region: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            credentials: Credentials::Static {
                access_key: access_key.into(),
                secret_key: secret_key.into(),
            },
            region: region.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            s3_endpoint: None,
            s3_force_path_style: true,
        }
    }

    /// The S3 endpoint URL requests are sent to
    pub fn s3_endpoint_url(&self) -> String {
        match &self.s3_endpoint {
            Some(url) => url.as_str().trim_end_matches('/').to_string(),
            None => default_s3_endpoint(&self.region),
        }
    }

    pub fn dns_suffix(&self) -> String {
        dns_suffix(&self.region)
    }
}

/// Expand a leading `~` to the home directory
pub(crate) fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => &rest[1..],
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// On-disk configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Schema version for migration support
    pub schema_version: u32,

    #[serde(default)]
    pub provider: RawProviderConfig,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            provider: RawProviderConfig::default(),
        }
    }
}

/// Loads and saves the configuration file
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        Self::from_env(|key| std::env::var(key).ok())
    }

    /// Create a ConfigManager, reading `RABATA_CONFIG_DIR` through `env`
    pub fn from_env<F>(env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = env(ENV_CONFIG_DIR).filter(|d| !d.is_empty()) {
            return Ok(Self {
                config_path: PathBuf::from(dir).join("provider.toml"),
            });
        }

        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".into()))?;
        Ok(Self {
            config_path: config_dir.join("rabata").join("provider.toml"),
        })
    }

    /// Create a ConfigManager with an explicit path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load the configuration file; a missing file yields the defaults
    pub fn load(&self) -> Result<ConfigFile> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "no configuration file");
            return Ok(ConfigFile::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let config: ConfigFile = toml::from_str(&content)?;

        if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade the provider.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        Ok(config)
    }

    /// Save the configuration file with owner-only permissions
    pub fn save(&self, config: &ConfigFile) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }
}
