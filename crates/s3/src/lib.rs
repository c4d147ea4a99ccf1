//! rabata-s3: S3 SDK adapter for the Rabata provider
//!
//! This crate provides the implementation of the S3Api trait
//! using the aws-sdk-s3 crate. It is the only crate that directly
//! depends on the AWS SDK.

pub mod client;
mod error;
pub mod session;

pub use client::S3Client;
