//! data commands - read data sources

use clap::{Args, Subcommand};
use rabata_core::schema::{BUCKET, BUCKET_OBJECT, BUCKET_OBJECTS};
use rabata_core::{Operation, Request};
use serde_json::Value;

use super::{Connection, attributes, bool_flag, run, string_flag, usage_error};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

#[derive(Subcommand, Debug)]
pub enum DataCommands {
    /// Look up an existing bucket
    Bucket(BucketArgs),

    /// Read an object's metadata, and its body when it is text
    Object(ObjectArgs),

    /// List object keys
    Objects(ObjectsArgs),
}

#[derive(Args, Debug)]
pub struct BucketArgs {
    /// Bucket name
    pub bucket: String,
}

#[derive(Args, Debug, Default)]
pub struct ObjectArgs {
    #[arg(long)]
    pub bucket: String,

    #[arg(long)]
    pub key: String,

    /// Byte range, e.g. bytes=0-99
    #[arg(long)]
    pub range: Option<String>,

    #[arg(long)]
    pub version_id: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ObjectsArgs {
    #[arg(long)]
    pub bucket: String,

    #[arg(long)]
    pub prefix: Option<String>,

    /// Group keys sharing a prefix up to this character
    #[arg(long)]
    pub delimiter: Option<String>,

    #[arg(long)]
    pub encoding_type: Option<String>,

    /// Maximum number of keys across all pages (default 1000)
    #[arg(long)]
    pub max_keys: Option<i64>,

    #[arg(long)]
    pub start_after: Option<String>,

    /// Return the owner of each key
    #[arg(long)]
    pub fetch_owner: bool,
}

fn request(cmd: DataCommands) -> anyhow::Result<Request> {
    let (type_name, config) = match cmd {
        DataCommands::Bucket(args) => (
            BUCKET,
            attributes(None, [("bucket", Some(Value::String(args.bucket)))])?,
        ),
        DataCommands::Object(args) => (
            BUCKET_OBJECT,
            attributes(
                None,
                [
                    ("bucket", Some(Value::String(args.bucket))),
                    ("key", Some(Value::String(args.key))),
                    ("range", string_flag(args.range)),
                    ("version_id", string_flag(args.version_id)),
                ],
            )?,
        ),
        DataCommands::Objects(args) => (
            BUCKET_OBJECTS,
            attributes(
                None,
                [
                    ("bucket", Some(Value::String(args.bucket))),
                    ("prefix", string_flag(args.prefix)),
                    ("delimiter", string_flag(args.delimiter)),
                    ("encoding_type", string_flag(args.encoding_type)),
                    ("max_keys", args.max_keys.map(Value::from)),
                    ("start_after", string_flag(args.start_after)),
                    ("fetch_owner", bool_flag(args.fetch_owner)),
                ],
            )?,
        ),
    };
    Ok(Request::new(type_name, Operation::ReadData).with_config(config))
}

/// Execute a data subcommand
pub async fn execute(cmd: DataCommands, connection: &Connection, formatter: &Formatter) -> ExitCode {
    match request(cmd) {
        Ok(request) => run(request, connection, formatter).await,
        Err(e) => usage_error(formatter, &e),
    }
}
