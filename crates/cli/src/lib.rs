//! Command-line front end for the Rabata S3 provider
//!
//! Exported so integration tests can drive the commands directly.

pub mod commands;
pub mod exit_code;
pub mod output;
