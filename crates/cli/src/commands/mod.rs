//! CLI command definitions and execution
//!
//! Resource and data source commands build a provider [`Request`] and run it
//! through the same dispatcher the `invoke` command uses.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rabata_core::{Attributes, ConfigManager, Provider, RawProviderConfig, Request};
use rabata_s3::S3Client;
use serde_json::Value;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, StateView};

mod bucket;
mod completions;
mod config;
mod data;
mod invoke;
mod object;
mod schema;
mod validate;

/// Rabata S3 provider
///
/// Manages Rabata.io buckets and objects and reads them as data sources.
#[derive(Parser, Debug)]
#[command(name = "terraform-provider-rabata")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    /// Provider configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Region, overriding the configuration file and RABATA_REGION
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// S3 endpoint URL, overriding the configuration file
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage buckets
    #[command(subcommand)]
    Bucket(bucket::BucketCommands),

    /// Manage bucket objects
    #[command(subcommand)]
    Object(object::ObjectCommands),

    /// Read data sources
    #[command(subcommand)]
    Data(data::DataCommands),

    /// Run one JSON request read from stdin and print the JSON response
    Invoke(invoke::InvokeArgs),

    /// Print resource and data source schemas
    Schema(schema::SchemaArgs),

    /// Check a bucket name without contacting the service
    ValidateBucketName(validate::ValidateArgs),

    /// Show or change the provider configuration file
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Where and how to reach the service, from the global flags
#[derive(Debug, Clone, Default)]
pub struct Connection {
    pub config_path: Option<PathBuf>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

impl Connection {
    pub(crate) fn manager(&self) -> rabata_core::Result<ConfigManager> {
        match &self.config_path {
            Some(path) => Ok(ConfigManager::with_path(path.clone())),
            None => ConfigManager::new(),
        }
    }

    /// Flag values layered over the configuration file
    fn overrides(&self) -> RawProviderConfig {
        RawProviderConfig {
            region: self.region.clone(),
            endpoints: self
                .endpoint
                .iter()
                .map(|url| ("s3".to_string(), url.clone()))
                .collect(),
            ..Default::default()
        }
    }

    /// Resolve the configuration and build a provider backed by the SDK
    pub async fn connect(&self) -> rabata_core::Result<Provider> {
        let file = self.manager()?.load()?;
        let config = file.provider.merge(self.overrides()).resolve()?;
        tracing::debug!(?config, "resolved provider configuration");

        let client = S3Client::new(&config).await;
        Ok(Provider::new(config, Arc::new(client)))
    }
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let formatter = Formatter::new(OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    });
    let connection = Connection {
        config_path: cli.config,
        region: cli.region,
        endpoint: cli.endpoint,
    };

    match cli.command {
        Commands::Bucket(cmd) => bucket::execute(cmd, &connection, &formatter).await,
        Commands::Object(cmd) => object::execute(cmd, &connection, &formatter).await,
        Commands::Data(cmd) => data::execute(cmd, &connection, &formatter).await,
        Commands::Invoke(args) => invoke::execute(args, &connection).await,
        Commands::Schema(args) => schema::execute(args, &formatter),
        Commands::ValidateBucketName(args) => validate::execute(args, &formatter),
        Commands::Config(cmd) => config::execute(cmd, &connection, &formatter),
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Connect, run one request and print the resulting state
pub(crate) async fn run(
    request: Request,
    connection: &Connection,
    formatter: &Formatter,
) -> ExitCode {
    let provider = match connection.connect().await {
        Ok(provider) => provider,
        Err(e) => {
            formatter.error(&format!("Failed to configure provider: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let operation = request.operation;
    match provider.dispatch(request).await {
        Ok(response) => {
            for diagnostic in &response.diagnostics {
                formatter.diagnostic(diagnostic);
            }
            if response.new_state.is_none() {
                formatter.success(&format!("{operation} complete, resource is gone"));
            }
            formatter.output(&StateView(response.new_state));
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from_error(&e)
        }
    }
}

/// Read a JSON attribute object from a file
pub(crate) fn load_attributes(path: &Path) -> anyhow::Result<Attributes> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading attributes from {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("parsing attributes in {}", path.display()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!(
            "{} must hold a JSON object, found {}",
            path.display(),
            kind_of(&other)
        ),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Attributes from an optional file with flag values layered on top.
/// Flags that were not given leave the file's values alone.
pub(crate) fn attributes(
    file: Option<&Path>,
    flags: impl IntoIterator<Item = (&'static str, Option<Value>)>,
) -> anyhow::Result<Attributes> {
    let mut attributes = match file {
        Some(path) => load_attributes(path)?,
        None => Attributes::new(),
    };
    for (name, value) in flags {
        if let Some(value) = value {
            attributes.insert(name.to_string(), value);
        }
    }
    Ok(attributes)
}

/// Parse repeated `key=value` flags
pub(crate) fn parse_key_value(pair: &str) -> Result<(String, String), String> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{pair}'")),
    }
}

pub(crate) fn string_flag(value: Option<String>) -> Option<Value> {
    value.map(Value::String)
}

pub(crate) fn bool_flag(set: bool) -> Option<Value> {
    set.then_some(Value::Bool(true))
}

pub(crate) fn map_flag(pairs: Vec<(String, String)>) -> Option<Value> {
    if pairs.is_empty() {
        return None;
    }
    let map: BTreeMap<String, String> = pairs.into_iter().collect();
    serde_json::to_value(map).ok()
}

/// Report an attribute file or flag problem
pub(crate) fn usage_error(formatter: &Formatter, err: &anyhow::Error) -> ExitCode {
    formatter.error(&format!("{err:#}"));
    ExitCode::UsageError
}
