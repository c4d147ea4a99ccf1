//! schema command - print resource and data source schemas

use std::fmt;

use clap::Args;
use rabata_core::schema::{self, Attribute, ResourceSchema, SchemaKind};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::Formatter;

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Only this type, e.g. rabata_s3_bucket (matches both a resource and
    /// a data source of the same name)
    pub type_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct SchemaOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<ResourceSchema>,
    resources: Vec<ResourceSchema>,
    data_sources: Vec<ResourceSchema>,
}

impl SchemaOutput {
    fn select(type_name: Option<&str>) -> Self {
        match type_name {
            None => Self {
                provider: Some(schema::provider()),
                resources: schema::resources(),
                data_sources: schema::data_sources(),
            },
            Some(name) => Self {
                provider: schema::find(name, SchemaKind::Provider),
                resources: schema::find(name, SchemaKind::Resource).into_iter().collect(),
                data_sources: schema::find(name, SchemaKind::DataSource)
                    .into_iter()
                    .collect(),
            },
        }
    }

    fn is_empty(&self) -> bool {
        self.provider.is_none() && self.resources.is_empty() && self.data_sources.is_empty()
    }
}

fn flags(attr: &Attribute) -> String {
    let mut flags = Vec::new();
    if attr.required {
        flags.push("required".to_string());
    }
    if attr.optional {
        flags.push("optional".to_string());
    }
    if attr.computed {
        flags.push("computed".to_string());
    }
    if attr.force_new {
        flags.push("forces replacement".to_string());
    }
    if let Some(default) = &attr.default {
        flags.push(format!("default {default}"));
    }
    flags.join(", ")
}

fn write_schema(f: &mut fmt::Formatter<'_>, label: &str, schema: &ResourceSchema) -> fmt::Result {
    writeln!(f, "{label} {}", schema.type_name)?;
    for attr in &schema.attributes {
        writeln!(f, "  {:<28} {:<14} {}", attr.name, attr.kind.name(), flags(attr))?;
    }
    Ok(())
}

impl fmt::Display for SchemaOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(provider) = &self.provider {
            write_schema(f, "provider", provider)?;
        }
        for resource in &self.resources {
            write_schema(f, "resource", resource)?;
        }
        for data_source in &self.data_sources {
            write_schema(f, "data", data_source)?;
        }
        Ok(())
    }
}

/// Execute the schema command
pub fn execute(args: SchemaArgs, formatter: &Formatter) -> ExitCode {
    let output = SchemaOutput::select(args.type_name.as_deref());
    if output.is_empty() {
        formatter.error(&format!(
            "Unknown type '{}'",
            args.type_name.unwrap_or_default()
        ));
        return ExitCode::NotFound;
    }

    formatter.output(&output);
    ExitCode::Success
}
