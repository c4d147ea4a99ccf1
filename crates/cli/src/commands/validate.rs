//! validate-bucket-name command - offline bucket name check

use clap::Args;
use rabata_core::validation::validate_s3_bucket_name;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::Formatter;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Bucket name to check
    pub name: String,
}

#[derive(Debug, Serialize)]
struct ValidateOutput {
    name: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn check(name: String) -> ValidateOutput {
    match validate_s3_bucket_name(&name) {
        Ok(()) => ValidateOutput {
            name,
            valid: true,
            error: None,
        },
        Err(e) => ValidateOutput {
            name,
            valid: false,
            error: Some(e.to_string()),
        },
    }
}

/// Execute the validate-bucket-name command
pub fn execute(args: ValidateArgs, formatter: &Formatter) -> ExitCode {
    let output = check(args.name);

    if formatter.is_json() {
        formatter.json(&output);
    } else if let Some(error) = &output.error {
        formatter.error(error);
    } else {
        formatter.success(&format!("'{}' is a valid bucket name", output.name));
    }

    if output.valid {
        ExitCode::Success
    } else {
        ExitCode::UsageError
    }
}
