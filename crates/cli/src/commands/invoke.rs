//! invoke command - one JSON request in, one JSON response out
//!
//! Failures are reported as diagnostics inside the response; the exit code
//! only says whether an error diagnostic is present.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use rabata_core::{Diagnostic, Request, Response};

use super::Connection;
use crate::exit_code::ExitCode;

#[derive(Args, Debug)]
pub struct InvokeArgs {
    /// Read the request from this file instead of stdin
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,
}

fn read_request(input: Option<&PathBuf>) -> anyhow::Result<Request> {
    let content = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading request from {}", path.display()))?,
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("reading request from stdin")?;
            content
        }
    };
    parse_request(&content)
}

fn parse_request(content: &str) -> anyhow::Result<Request> {
    serde_json::from_str(content).context("invalid request")
}

fn failure(summary: String) -> Response {
    Response {
        diagnostics: vec![Diagnostic::error(summary)],
        ..Default::default()
    }
}

/// Execute the invoke command
pub async fn execute(args: InvokeArgs, connection: &Connection) -> ExitCode {
    let response = match read_request(args.input.as_ref()) {
        Err(e) => failure(format!("{e:#}")),
        Ok(request) => match connection.connect().await {
            Ok(provider) => provider.invoke(request).await,
            Err(e) => Response {
                diagnostics: vec![Diagnostic::from_error(&e.context("failed to configure provider"))],
                ..Default::default()
            },
        },
    };

    match serde_json::to_string(&response) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing response: {e}");
            return ExitCode::GeneralError;
        }
    }

    if response.has_errors() {
        ExitCode::GeneralError
    } else {
        ExitCode::Success
    }
}
