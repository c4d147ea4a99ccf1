//! Provider configuration file commands
//!
//! The file holds the same settings as the provider block. Values given on
//! the command line and in `RABATA_*` variables still take precedence when
//! the provider is configured.

use std::fmt;

use clap::Subcommand;
use rabata_core::{ConfigFile, ConfigManager, RawProviderConfig};
use serde::Serialize;

use super::Connection;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

const REDACTED: &str = "********";

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the stored settings (the secret key is redacted)
    Show,

    /// Store settings, keeping the ones not given
    Set(SetArgs),

    /// Print the configuration file location
    Path,
}

#[derive(clap::Args, Debug, Default)]
pub struct SetArgs {
    #[arg(long)]
    pub access_key: Option<String>,

    #[arg(long)]
    pub secret_key: Option<String>,

    /// Profile in the shared credentials file
    #[arg(long)]
    pub profile: Option<String>,

    #[arg(long, value_name = "PATH")]
    pub shared_credentials_file: Option<String>,

    /// Default region
    #[arg(long, value_name = "REGION")]
    pub default_region: Option<String>,

    /// Retries for retryable errors
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Custom S3 endpoint URL
    #[arg(long = "s3-endpoint", value_name = "URL")]
    pub s3_endpoint: Option<String>,

    /// Only false is accepted; TLS verification stays on
    #[arg(long)]
    pub insecure: Option<bool>,

    /// Address buckets as path segments instead of subdomains
    #[arg(long)]
    pub s3_force_path_style: Option<bool>,
}

impl SetArgs {
    fn to_raw(&self) -> RawProviderConfig {
        RawProviderConfig {
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            profile: self.profile.clone(),
            shared_credentials_file: self.shared_credentials_file.clone(),
            region: self.default_region.clone(),
            max_retries: self.max_retries,
            endpoints: self
                .s3_endpoint
                .iter()
                .map(|url| ("s3".to_string(), url.clone()))
                .collect(),
            insecure: self.insecure,
            s3_force_path_style: self.s3_force_path_style,
        }
    }
}

/// Stored settings as printed by `config show`
#[derive(Debug, Serialize)]
struct ConfigView {
    path: String,
    provider: RawProviderConfig,
}

impl ConfigView {
    fn new(manager: &ConfigManager, mut file: ConfigFile) -> Self {
        if file.provider.secret_key.is_some() {
            file.provider.secret_key = Some(REDACTED.to_string());
        }
        Self {
            path: manager.config_path().display().to_string(),
            provider: file.provider,
        }
    }
}

impl fmt::Display for ConfigView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.path)?;
        match toml::to_string_pretty(&self.provider) {
            Ok(text) if text.trim().is_empty() => write!(f, "(no settings)"),
            Ok(text) => write!(f, "{}", text.trim_end()),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Merge `args` into the stored settings
fn apply_set(file: ConfigFile, args: &SetArgs) -> Result<ConfigFile, String> {
    let provider = file.provider.merge(args.to_raw());
    if provider.access_key.is_some() != provider.secret_key.is_some() {
        return Err("access_key and secret_key must be set together".into());
    }
    if provider.insecure == Some(true) {
        return Err("insecure = true is not supported: TLS certificate verification cannot be disabled".into());
    }
    if let Some(url) = provider.endpoints.get("s3")
        && !url.is_empty()
        && url::Url::parse(url).is_err()
    {
        return Err(format!("invalid S3 endpoint URL: {url}"));
    }
    Ok(ConfigFile { provider, ..file })
}

/// Execute a config subcommand
pub fn execute(cmd: ConfigCommands, connection: &Connection, formatter: &Formatter) -> ExitCode {
    let manager = match connection.manager() {
        Ok(manager) => manager,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    match cmd {
        ConfigCommands::Path => {
            let path = manager.config_path().display().to_string();
            if formatter.is_json() {
                formatter.json(&serde_json::json!({ "path": path }));
            } else {
                println!("{path}");
            }
            ExitCode::Success
        }
        ConfigCommands::Show => match manager.load() {
            Ok(file) => {
                formatter.output(&ConfigView::new(&manager, file));
                ExitCode::Success
            }
            Err(e) => {
                formatter.error(&format!("Failed to load configuration: {e}"));
                ExitCode::from_error(&e)
            }
        },
        ConfigCommands::Set(args) => {
            let file = match manager.load() {
                Ok(file) => file,
                Err(e) => {
                    formatter.error(&format!("Failed to load configuration: {e}"));
                    return ExitCode::from_error(&e);
                }
            };
            let file = match apply_set(file, &args) {
                Ok(file) => file,
                Err(message) => {
                    formatter.error(&message);
                    return ExitCode::UsageError;
                }
            };
            if let Err(e) = manager.save(&file) {
                formatter.error(&format!("Failed to save configuration: {e}"));
                return ExitCode::from_error(&e);
            }
            tracing::info!(path = %manager.config_path().display(), "configuration saved");
            formatter.success(&format!(
                "Configuration saved to {}",
                manager.config_path().display()
            ));
            ExitCode::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_manager() -> (ConfigManager, TempDir) {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("provider.toml"));
        (manager, dir)
    }

    #[test]
    fn test_set_keeps_other_settings() {
        let (manager, _dir) = temp_manager();
        let first = apply_set(
            ConfigFile::default(),
            &SetArgs {
                access_key: Some("AK".into()),
                secret_key: Some("SK".into()),
                default_region: Some("eu-west-1".into()),
                ..Default::default()
            },
        )
        .unwrap();
        manager.save(&first).unwrap();

        let second = apply_set(
            manager.load().unwrap(),
            &SetArgs {
                max_retries: Some(5),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(second.provider.region.as_deref(), Some("eu-west-1"));
        assert_eq!(second.provider.access_key.as_deref(), Some("AK"));
        assert_eq!(second.provider.max_retries, Some(5));
    }

    #[test]
    fn test_set_rejects_lone_access_key() {
        let err = apply_set(
            ConfigFile::default(),
            &SetArgs {
                access_key: Some("AK".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.contains("together"));
    }

    #[test]
    fn test_set_rejects_insecure() {
        let err = apply_set(
            ConfigFile::default(),
            &SetArgs {
                insecure: Some(true),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.contains("insecure = true is not supported"));
    }

    #[test]
    fn test_set_rejects_bad_endpoint() {
        let err = apply_set(
            ConfigFile::default(),
            &SetArgs {
                s3_endpoint: Some("not a url".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.starts_with("invalid S3 endpoint URL"));
    }

    #[test]
    fn test_show_redacts_secret() {
        let (manager, _dir) = temp_manager();
        let mut file = ConfigFile::default();
        file.provider.access_key = Some("AK".into());
        file.provider.secret_key = Some("super-secret".into());

        let view = ConfigView::new(&manager, file);
        let text = view.to_string();
        assert!(text.contains("access_key = \"AK\""));
        assert!(!text.contains("super-secret"));
        assert!(text.contains(REDACTED));
    }

    #[test]
    fn test_show_empty() {
        let (manager, _dir) = temp_manager();
        let view = ConfigView::new(&manager, ConfigFile::default());
        assert!(view.to_string().ends_with("(no settings)"));
    }
}
