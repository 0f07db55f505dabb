use clap::{ColorChoice, Parser, Subcommand, ValueEnum};
use kiln_config::{DebugTrace, TargetArchitecture};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum DebugTraceCli {
  Resolve,
  Ir,
  Ownership,
  Codegen,
  Toolchain,
  Driver,
}

impl From<DebugTraceCli> for DebugTrace {
  fn from(value: DebugTraceCli) -> DebugTrace {
    match value {
      DebugTraceCli::Resolve => DebugTrace::Resolve,
      DebugTraceCli::Ir => DebugTrace::Ir,
      DebugTraceCli::Ownership => DebugTrace::Ownership,
      DebugTraceCli::Codegen => DebugTrace::Codegen,
      DebugTraceCli::Toolchain => DebugTrace::Toolchain,
      DebugTraceCli::Driver => DebugTrace::Driver,
    }
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum TargetCli {
  /// JVM assembly listings
  Jvm,
  /// LLVM IR against the C++ runtime
  LlvmCpp,
  /// LLVM IR against the Go runtime
  LlvmGo,
}

impl From<TargetCli> for TargetArchitecture {
  fn from(value: TargetCli) -> TargetArchitecture {
    match value {
      TargetCli::Jvm => TargetArchitecture::Jvm,
      TargetCli::LlvmCpp => TargetArchitecture::LlvmCpp,
      TargetCli::LlvmGo => TargetArchitecture::LlvmGo,
    }
  }
}

#[derive(Parser, Debug, Clone, PartialEq)]
pub struct BuildCommand {
  /// Serialized IR program (JSON)
  pub program: String,

  /// Target architecture (overrides kiln.toml)
  #[arg(short, long, value_enum)]
  pub target: Option<TargetCli>,

  /// Write under generated/dev instead of generated/main
  #[arg(long)]
  pub dev: bool,

  /// Output base directory (overrides kiln.toml)
  #[arg(short = 'o', long)]
  pub out_dir: Option<String>,

  /// Directory holding kiln.toml (defaults to the current directory)
  #[arg(long)]
  pub project: Option<String>,
}

#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ProbeCommand {
  /// Only probe this target
  #[arg(short, long, value_enum)]
  pub target: Option<TargetCli>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum SubCommand {
  /// Lower a serialized IR program for one target
  Build(BuildCommand),
  /// Report which targets this host can build
  Probe(ProbeCommand),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "The kiln code generator", long_about = None)]
#[command(propagate_version = true)]
#[command(color = ColorChoice::Always)]
pub struct Cli {
  #[command(subcommand)]
  pub subcommand: SubCommand,

  /// Enable internal debug mode
  #[arg(long, default_value = "false", global = true)]
  pub debug: bool,

  /// Enable debug tracing for subsystems
  #[arg(long, value_enum, action = clap::ArgAction::Append, global = true)]
  pub debug_trace: Vec<DebugTraceCli>,

  /// Don't print any output
  #[arg(long, short = 'q', default_value = "false", global = true)]
  pub quiet: bool,

  /// Use verbose output
  #[arg(long, short, action = clap::ArgAction::Count, global = true)]
  pub verbose: u8,
}
