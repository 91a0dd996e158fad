use std::io::{self, Write};

use anyhow::Result;
use async_trait::async_trait;
use clap::{Args, Command, CommandFactory};
use clap_complete::Shell;

use crate::app::AppContext;
use crate::commands::{Cli, CliCommand};

#[derive(Args, Debug, Clone)]
#[command(about = "Print a shell completion script to stdout")]
pub struct CompletionCommand {
    #[arg(value_enum)]
    pub shell: Shell,

    /// Leave help texts out of the completions
    #[arg(long)]
    pub no_descriptions: bool,
}

impl CompletionCommand {
    fn write_script(&self, out: &mut dyn Write) {
        let mut command = Cli::command();
        if self.no_descriptions {
            command = strip_descriptions(command);
        }
        let name = command.get_name().to_owned();
        clap_complete::aot::generate(self.shell, &mut command, name, out);
    }
}

fn strip_descriptions(command: Command) -> Command {
    command
        .about(None::<&str>)
        .long_about(None::<&str>)
        .mut_args(|arg| arg.help(None::<&str>).long_help(None::<&str>))
        .mut_subcommands(strip_descriptions)
}

#[async_trait]
impl CliCommand for CompletionCommand {
    async fn execute(&self, _ctx: &AppContext) -> Result<()> {
        self.write_script(&mut io::stdout());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(shell: Shell, no_descriptions: bool) -> String {
        let cmd = CompletionCommand {
            shell,
            no_descriptions,
        };
        let mut buf = Vec::new();
        cmd.write_script(&mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn generates_a_script_naming_the_binary() {
        let script = script(Shell::Bash, false);
        assert!(script.contains("loglens"));
        assert!(script.contains("stream"));
    }

    #[test]
    fn descriptions_can_be_left_out() {
        let described = script(Shell::Fish, false);
        assert!(described.contains("Livestream events of a dataset"));

        let bare = script(Shell::Fish, true);
        assert!(bare.contains("stream"));
        assert!(!bare.contains("Livestream events of a dataset"));
        assert!(!bare.contains("Skip TLS certificate verification"));
    }
}
