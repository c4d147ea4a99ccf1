//! rabata-core: Core library of the Rabata S3 provider
//!
//! This crate provides:
//! - Provider configuration and its TOML file
//! - Attribute schemas and validation
//! - The bucket and bucket object resources, and the read-only data sources
//! - The `S3Api` trait the handlers talk to
//! - Error classification and retry helpers
//!
//! It is independent of any specific S3 SDK; the `rabata-s3` crate supplies
//! the SDK-backed `S3Api`.

pub mod attrs;
pub mod bulk;
pub mod classify;
pub mod client;
pub mod config;
pub mod data_source;
pub mod diag;
pub mod error;
pub mod id;
pub mod provider;
pub mod resource;
pub mod retry;
pub mod schema;
pub mod traits;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use attrs::Attributes;
pub use client::ProviderClient;
pub use config::{ConfigFile, ConfigManager, Credentials, ProviderConfig, RawProviderConfig};
pub use diag::{Diagnostic, Severity};
pub use error::{ApiError, Error, Result, ResultExt};
pub use provider::{Operation, Provider, Request, Response};
pub use traits::S3Api;
