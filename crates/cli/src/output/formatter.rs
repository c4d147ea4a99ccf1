//! Output formatter for human-readable and JSON output
//!
//! Results go to stdout, messages and errors to stderr, so JSON results
//! stay parseable.

use rabata_core::{Diagnostic, Severity};
use serde::Serialize;

use super::OutputConfig;

/// Formatter for CLI output
///
/// When JSON mode is enabled, stdout carries strict JSON without colors.
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    pub fn is_quiet(&self) -> bool {
        self.config.quiet
    }

    /// Colors are off in JSON mode and with `--no-color`
    pub fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    /// Print a result: serialized in JSON mode, displayed otherwise
    pub fn output<T: Serialize + std::fmt::Display>(&self, value: &T) {
        if self.config.quiet {
            return;
        }

        if self.config.json {
            self.json(value);
        } else {
            println!("{value}");
        }
    }

    /// Print a value as pretty JSON regardless of mode
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
    }

    pub fn success(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }
        eprintln!("{}", self.decorate("32", "✓", message));
    }

    /// Errors are always printed, even in quiet mode.
    pub fn error(&self, message: &str) {
        if self.config.json {
            eprintln!("{}", serde_json::json!({ "error": message }));
        } else {
            eprintln!("{}", self.decorate("31", "✗", message));
        }
    }

    pub fn warning(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }
        eprintln!("{}", self.decorate("33", "⚠", message));
    }

    /// Report a diagnostic with the matching severity
    pub fn diagnostic(&self, diagnostic: &Diagnostic) {
        let message = if diagnostic.detail.is_empty() {
            diagnostic.summary.clone()
        } else {
            format!("{} ({})", diagnostic.summary, diagnostic.detail)
        };
        match diagnostic.severity {
            Severity::Error => self.error(&message),
            Severity::Warning => self.warning(&message),
        }
    }

    fn decorate(&self, color: &str, symbol: &str, message: &str) -> String {
        if self.colors_enabled() {
            format!("\x1b[{color}m{symbol}\x1b[0m {message}")
        } else {
            format!("{symbol} {message}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatter_default() {
        let formatter = Formatter::default();
        assert!(!formatter.is_json());
        assert!(!formatter.is_quiet());
        assert!(formatter.colors_enabled());
    }

    #[test]
    fn test_formatter_json_mode_disables_colors() {
        let formatter = Formatter::new(OutputConfig {
            json: true,
            ..Default::default()
        });
        assert!(formatter.is_json());
        assert!(!formatter.colors_enabled());
    }

    #[test]
    fn test_decorate_without_color() {
        let formatter = Formatter::new(OutputConfig {
            no_color: true,
            ..Default::default()
        });
        assert_eq!(formatter.decorate("31", "✗", "failed"), "✗ failed");
    }

    #[test]
    fn test_decorate_with_color() {
        let formatter = Formatter::default();
        assert_eq!(
            formatter.decorate("32", "✓", "done"),
            "\x1b[32m✓\x1b[0m done"
        );
    }
}
