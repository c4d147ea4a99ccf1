//! Human-readable rendering of resource state

use std::fmt;

use rabata_core::Attributes;
use serde::Serialize;
use serde_json::Value;

/// Resource or data source state; `None` once the resource is gone.
/// Serializes as the bare attribute map (or `null`).
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct StateView(pub Option<Attributes>);

fn render(value: &Value) -> String {
    match value {
        Value::Null => "(known after apply)".to_string(),
        Value::String(s) => format!("{s:?}"),
        other => other.to_string(),
    }
}

impl fmt::Display for StateView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(attributes) = &self.0 else {
            return write!(f, "(resource no longer exists)");
        };

        let width = attributes.keys().map(String::len).max().unwrap_or(0);
        let mut first = true;
        for (name, value) in attributes {
            if !first {
                writeln!(f)?;
            }
            first = false;

            write!(f, "{name:<width$} = {}", render(value))?;
            if name == "content_length"
                && let Some(size) = value.as_u64()
            {
                write!(f, " ({})", humansize::format_size(size, humansize::BINARY))?;
            }
        }
        Ok(())
    }
}
