mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser as ClapParser;

use cli::{Cli, SubCommand};

fn main() -> ExitCode {
  let cli = Cli::parse();

  let status = match &cli.subcommand {
    SubCommand::Build(command) => commands::build(&cli, command),
    SubCommand::Probe(command) => commands::probe(command),
  };

  ExitCode::from(status)
}
