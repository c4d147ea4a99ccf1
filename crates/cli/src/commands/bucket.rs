//! bucket commands - manage `rabata_s3_bucket` resources
//!
//! Attributes come from flags, from a JSON file given with `--attributes`,
//! or both (flags win). Commands that act on an existing bucket take its
//! state from `--state` or just the bucket name.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use rabata_core::schema::BUCKET;
use rabata_core::{Attributes, Operation, Request};
use serde_json::Value;

use super::{Connection, attributes, bool_flag, load_attributes, run, string_flag, usage_error};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

#[derive(Subcommand, Debug)]
pub enum BucketCommands {
    /// Create a bucket
    Create(ConfigArgs),

    /// Refresh a bucket's state
    Read(TargetArgs),

    /// Apply ACL or grant changes to a bucket
    Update(UpdateArgs),

    /// Delete a bucket
    Delete(DeleteArgs),

    /// Import an existing bucket by name
    Import(ImportArgs),
}

/// Bucket attributes given as flags
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Bucket name
    #[arg(long)]
    pub bucket: Option<String>,

    /// Generate a unique name starting with this prefix
    #[arg(long, conflicts_with = "bucket")]
    pub bucket_prefix: Option<String>,

    /// Canned ACL, e.g. private or public-read
    #[arg(long)]
    pub acl: Option<String>,

    /// Delete all objects when the bucket is destroyed
    #[arg(long)]
    pub force_destroy: bool,

    /// JSON file with bucket attributes (grants go here)
    #[arg(long, value_name = "FILE")]
    pub attributes: Option<PathBuf>,
}

impl ConfigArgs {
    fn to_attributes(&self) -> anyhow::Result<Attributes> {
        attributes(
            self.attributes.as_deref(),
            [
                ("bucket", string_flag(self.bucket.clone())),
                ("bucket_prefix", string_flag(self.bucket_prefix.clone())),
                ("acl", string_flag(self.acl.clone())),
                ("force_destroy", bool_flag(self.force_destroy)),
            ],
        )
    }
}

/// An existing bucket: its name or a saved state file
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Bucket name
    #[arg(required_unless_present = "state")]
    pub name: Option<String>,

    /// JSON file with the bucket's current state
    #[arg(long, value_name = "FILE", conflicts_with = "name")]
    pub state: Option<PathBuf>,
}

impl TargetArgs {
    fn prior_state(&self) -> anyhow::Result<Attributes> {
        match (&self.state, &self.name) {
            (Some(path), _) => load_attributes(path),
            (None, Some(name)) => Ok(name_state(name)),
            (None, None) => anyhow::bail!("either a bucket name or --state is required"),
        }
    }
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Delete all objects and versions first
    #[arg(long)]
    pub force_destroy: bool,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Name of the existing bucket
    pub name: String,
}

/// Attributes an update carries over from the prior state
const CONFIGURABLE: &[&str] = &["bucket", "bucket_prefix", "acl", "grant", "force_destroy"];

/// Minimal state naming a bucket
fn name_state(name: &str) -> Attributes {
    let mut state = Attributes::new();
    state.insert("id".into(), Value::String(name.to_string()));
    state.insert("bucket".into(), Value::String(name.to_string()));
    state
}

/// Configuration for an update: the attribute file if given, otherwise the
/// prior configurable values, with flags on top. A new canned ACL replaces
/// the prior grants.
fn update_config(prior: &Attributes, args: &ConfigArgs) -> anyhow::Result<Attributes> {
    let mut config = args.to_attributes()?;
    if args.attributes.is_none() {
        for name in CONFIGURABLE {
            if args.acl.is_some() && *name == "grant" {
                continue;
            }
            if let Some(value) = prior.get(*name) {
                config.entry(*name).or_insert_with(|| value.clone());
            }
        }
    }
    Ok(config)
}

fn request(cmd: BucketCommands) -> anyhow::Result<Request> {
    let request = match cmd {
        BucketCommands::Create(args) => {
            Request::new(BUCKET, Operation::Create).with_config(args.to_attributes()?)
        }
        BucketCommands::Read(args) => {
            Request::new(BUCKET, Operation::Read).with_prior_state(args.prior_state()?)
        }
        BucketCommands::Update(args) => {
            let prior = args.target.prior_state()?;
            let config = update_config(&prior, &args.config)?;
            Request::new(BUCKET, Operation::Update)
                .with_prior_state(prior)
                .with_config(config)
        }
        BucketCommands::Delete(args) => {
            let mut prior = args.target.prior_state()?;
            if args.force_destroy {
                prior.insert("force_destroy".into(), Value::Bool(true));
            }
            Request::new(BUCKET, Operation::Delete).with_prior_state(prior)
        }
        BucketCommands::Import(args) => Request::new(BUCKET, Operation::Import).with_id(args.name),
    };
    Ok(request)
}

/// Execute a bucket subcommand
pub async fn execute(cmd: BucketCommands, connection: &Connection, formatter: &Formatter) -> ExitCode {
    match request(cmd) {
        Ok(request) => run(request, connection, formatter).await,
        Err(e) => usage_error(formatter, &e),
    }
}
