//! object commands - manage `rabata_s3_bucket_object` resources

use std::path::PathBuf;

use clap::{Args, Subcommand};
use rabata_core::schema::BUCKET_OBJECT;
use rabata_core::{Attributes, Operation, Request};
use serde_json::Value;

use super::{
    Connection, attributes, bool_flag, load_attributes, map_flag, parse_key_value, run,
    string_flag, usage_error,
};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

#[derive(Subcommand, Debug)]
pub enum ObjectCommands {
    /// Upload an object
    Create(ConfigArgs),

    /// Refresh an object's state from its metadata
    Read(TargetArgs),

    /// Re-upload changed content, or apply an ACL change in place
    Update(UpdateArgs),

    /// Delete an object, or all of its versions when the state has a version id
    Delete(DeleteArgs),
}

/// Object attributes given as flags
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Bucket to put the object in
    #[arg(long)]
    pub bucket: Option<String>,

    /// Object key
    #[arg(long)]
    pub key: Option<String>,

    /// Local file to upload
    #[arg(long, conflicts_with_all = ["content", "content_base64"])]
    pub source: Option<String>,

    /// Literal UTF-8 content
    #[arg(long, conflicts_with = "content_base64")]
    pub content: Option<String>,

    /// Base64-encoded binary content
    #[arg(long)]
    pub content_base64: Option<String>,

    /// Canned ACL, e.g. private or public-read
    #[arg(long)]
    pub acl: Option<String>,

    #[arg(long)]
    pub content_type: Option<String>,

    #[arg(long)]
    pub cache_control: Option<String>,

    #[arg(long)]
    pub content_disposition: Option<String>,

    #[arg(long)]
    pub content_encoding: Option<String>,

    #[arg(long)]
    pub content_language: Option<String>,

    /// Storage class, e.g. STANDARD or GLACIER
    #[arg(long)]
    pub storage_class: Option<String>,

    /// User metadata, KEY=VALUE (repeatable, lowercase keys)
    #[arg(long = "metadata", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub metadata: Vec<(String, String)>,

    /// Bypass governance retention when deleting versions
    #[arg(long)]
    pub force_destroy: bool,

    /// JSON file with object attributes
    #[arg(long, value_name = "FILE")]
    pub attributes: Option<PathBuf>,
}

/// The three ways of giving object content
const CONTENT_SOURCES: &[&str] = &["source", "content", "content_base64"];

/// Attributes an update carries over from the prior state
const CONFIGURABLE: &[&str] = &[
    "bucket",
    "key",
    "acl",
    "cache_control",
    "content_disposition",
    "content_encoding",
    "content_language",
    "content_type",
    "metadata",
    "source",
    "content",
    "content_base64",
    "storage_class",
    "etag",
    "force_destroy",
];

impl ConfigArgs {
    fn to_attributes(&self) -> anyhow::Result<Attributes> {
        attributes(
            self.attributes.as_deref(),
            [
                ("bucket", string_flag(self.bucket.clone())),
                ("key", string_flag(self.key.clone())),
                ("source", string_flag(self.source.clone())),
                ("content", string_flag(self.content.clone())),
                ("content_base64", string_flag(self.content_base64.clone())),
                ("acl", string_flag(self.acl.clone())),
                ("content_type", string_flag(self.content_type.clone())),
                ("cache_control", string_flag(self.cache_control.clone())),
                ("content_disposition", string_flag(self.content_disposition.clone())),
                ("content_encoding", string_flag(self.content_encoding.clone())),
                ("content_language", string_flag(self.content_language.clone())),
                ("storage_class", string_flag(self.storage_class.clone())),
                ("metadata", map_flag(self.metadata.clone())),
                ("force_destroy", bool_flag(self.force_destroy)),
            ],
        )
    }

    fn sets_content(&self) -> bool {
        self.source.is_some() || self.content.is_some() || self.content_base64.is_some()
    }
}

/// An existing object: bucket and key, or a saved state file
#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// JSON file with the object's current state
    #[arg(long, value_name = "FILE", conflicts_with_all = ["target_bucket", "target_key"])]
    pub state: Option<PathBuf>,

    /// Bucket holding the object
    #[arg(long = "bucket", id = "target_bucket", required_unless_present = "state")]
    pub bucket: Option<String>,

    /// Object key
    #[arg(long = "key", id = "target_key", required_unless_present = "state")]
    pub key: Option<String>,
}

impl TargetArgs {
    fn prior_state(&self) -> anyhow::Result<Attributes> {
        match (&self.state, &self.bucket, &self.key) {
            (Some(path), _, _) => load_attributes(path),
            (None, Some(bucket), Some(key)) => {
                let mut state = Attributes::new();
                state.insert("id".into(), Value::String(key.clone()));
                state.insert("bucket".into(), Value::String(bucket.clone()));
                state.insert("key".into(), Value::String(key.clone()));
                Ok(state)
            }
            _ => anyhow::bail!("either --bucket and --key or --state is required"),
        }
    }
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// JSON file with the object's current state
    #[arg(long, value_name = "FILE")]
    pub state: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Delete this version only, or with --force-destroy every version
    #[arg(long)]
    pub version_id: Option<String>,

    /// Bypass governance retention
    #[arg(long)]
    pub force_destroy: bool,
}

/// Configuration for an update: the attribute file if given, otherwise the
/// prior configurable values, with flags on top. New content from a flag
/// replaces every prior content source.
fn update_config(prior: &Attributes, args: &ConfigArgs) -> anyhow::Result<Attributes> {
    let mut config = args.to_attributes()?;
    if args.attributes.is_none() {
        for name in CONFIGURABLE {
            if args.sets_content() && CONTENT_SOURCES.contains(name) {
                continue;
            }
            if let Some(value) = prior.get(*name) {
                config.entry(*name).or_insert_with(|| value.clone());
            }
        }
    }
    Ok(config)
}

fn request(cmd: ObjectCommands) -> anyhow::Result<Request> {
    let request = match cmd {
        ObjectCommands::Create(args) => {
            Request::new(BUCKET_OBJECT, Operation::Create).with_config(args.to_attributes()?)
        }
        ObjectCommands::Read(args) => {
            Request::new(BUCKET_OBJECT, Operation::Read).with_prior_state(args.prior_state()?)
        }
        ObjectCommands::Update(args) => {
            let prior = load_attributes(&args.state)?;
            let config = update_config(&prior, &args.config)?;
            Request::new(BUCKET_OBJECT, Operation::Update)
                .with_prior_state(prior)
                .with_config(config)
        }
        ObjectCommands::Delete(args) => {
            let mut prior = args.target.prior_state()?;
            if let Some(version_id) = args.version_id {
                prior.insert("version_id".into(), Value::String(version_id));
            }
            if args.force_destroy {
                prior.insert("force_destroy".into(), Value::Bool(true));
            }
            Request::new(BUCKET_OBJECT, Operation::Delete).with_prior_state(prior)
        }
    };
    Ok(request)
}

/// Execute an object subcommand
pub async fn execute(cmd: ObjectCommands, connection: &Connection, formatter: &Formatter) -> ExitCode {
    match request(cmd) {
        Ok(request) => run(request, connection, formatter).await,
        Err(e) => usage_error(formatter, &e),
    }
}
