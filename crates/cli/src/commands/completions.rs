//! Shell completion generation

use std::io::Write;

use clap::CommandFactory;
use clap_complete::{Generator, Shell};

use super::Cli;
use crate::exit_code::ExitCode;

#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Print the completion script for the requested shell to stdout
pub fn execute(args: CompletionsArgs) -> ExitCode {
    write_completions(args.shell, &mut std::io::stdout());
    ExitCode::Success
}

fn write_completions<G: Generator>(generator: G, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(generator, &mut cmd, name, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(shell: Shell) -> String {
        let mut buf = Vec::new();
        write_completions(shell, &mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_bash_completes_subcommands() {
        let output = script(Shell::Bash);
        assert!(output.contains("terraform-provider-rabata"));
        assert!(output.contains("validate-bucket-name"));
    }

    #[test]
    fn test_zsh_registers_compdef() {
        let output = script(Shell::Zsh);
        assert!(output.contains("#compdef terraform-provider-rabata"));
    }

    #[test]
    fn test_fish_completes_data_sources() {
        let output = script(Shell::Fish);
        assert!(output.contains("complete -c terraform-provider-rabata"));
        assert!(output.contains("objects"));
    }
}
