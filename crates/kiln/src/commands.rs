use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use colored::*;
use kiln_backend::{CompilerFault, ToolchainStatus, locate_target};
use kiln_config::{BuildOverrides, CompilerFlags, KilnProjectConfig, TargetArchitecture};
use kiln_diagnostics::{
  render_batch,
  diagnostic_report::{Diagnostic, Severity},
};
use kiln_driver::generate_code;
use kiln_ir::IrProgram;
use kiln_log::log_dbg;

use crate::cli::{BuildCommand, Cli, ProbeCommand};

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILED: u8 = 1;
pub const EXIT_USAGE: u8 = 2;
pub const EXIT_INTERNAL: u8 = 3;

fn error(message: impl std::fmt::Display) {
  eprintln!("{} {}", "Error:".red().bold(), message);
}

pub fn base_flags(cli: &Cli) -> CompilerFlags {
  CompilerFlags::new_basic(
    cli.debug,
    cli.debug_trace.iter().copied().map(Into::into).collect(),
    cli.quiet,
    cli.verbose,
  )
}

/// `kiln.toml` from `dir`, or from the current directory.
fn load_project(dir: Option<&str>) -> Result<Option<KilnProjectConfig>, String> {
  let dir = match dir {
    Some(dir) => PathBuf::from(dir),
    None => env::current_dir().map_err(|e| format!("cannot read the current directory: {}", e))?,
  };

  match KilnProjectConfig::find_in(&dir) {
    Some(path) => KilnProjectConfig::load(&path).map(Some).map_err(|e| e.to_string()),
    None => Ok(None),
  }
}

fn load_program(path: &Path) -> Result<IrProgram, String> {
  let text = fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
  serde_json::from_str(&text).map_err(|e| format!("{} is not a valid IR program: {}", path.display(), e))
}

pub fn build(
  cli: &Cli,
  command: &BuildCommand,
) -> u8 {
  let project = match load_project(command.project.as_deref()) {
    Ok(project) => project,
    Err(message) => {
      error(message);
      return EXIT_USAGE;
    },
  };

  let overrides = BuildOverrides {
    target: command.target.map(Into::into),
    dev: command.dev,
    output_dir: command.out_dir.clone(),
  };
  let flags = base_flags(cli).merge_build(project.as_ref(), &overrides);
  log_dbg!(&flags, "flags: {:?}", flags);

  let program = match load_program(Path::new(&command.program)) {
    Ok(program) => program,
    Err(message) => {
      error(message);
      return EXIT_USAGE;
    },
  };

  let report = match generate_code(&Mutex::new(program), &flags) {
    Ok(report) => report,
    Err(fault @ CompilerFault::UnsupportedArchitecture { .. }) => {
      error(fault);
      return EXIT_USAGE;
    },
    Err(fault) => {
      error(format!("internal compiler fault: {}", fault));
      return EXIT_INTERNAL;
    },
  };

  let success = report.is_success();
  for failed in &report.failed {
    error(failed);
  }
  render_batch(&shown(report.diagnostics.into_vec(), flags.quiet));

  if success { EXIT_OK } else { EXIT_FAILED }
}

/// `-q` hides hints and infos, never warnings or errors.
fn shown(
  diagnostics: Vec<Diagnostic>,
  quiet: bool,
) -> Vec<Diagnostic> {
  diagnostics
    .into_iter()
    .filter(|d| !quiet || matches!(d.severity, Severity::Warning | Severity::Error))
    .collect()
}

fn describe(
  architecture: TargetArchitecture,
  status: Option<&ToolchainStatus>,
) -> String {
  match status {
    None => format!("{}: available", architecture),
    Some(ToolchainStatus::Available { version }) => format!("{}: available (clang {})", architecture, version),
    Some(ToolchainStatus::NotFound) => format!("{}: unavailable, clang not found on PATH", architecture),
    Some(ToolchainStatus::TooOld { found }) => format!("{}: unavailable, clang {} is too old", architecture, found),
    Some(ToolchainStatus::Unusable { reason }) => format!("{}: unavailable, {}", architecture, reason),
  }
}

pub fn probe(command: &ProbeCommand) -> u8 {
  let requested: Vec<TargetArchitecture> = match command.target {
    Some(target) => vec![target.into()],
    None => TargetArchitecture::SUPPORTED.to_vec(),
  };

  let mut all_available = true;
  for architecture in requested {
    let target = match locate_target(architecture) {
      Ok(target) => target,
      Err(fault) => {
        error(fault);
        return EXIT_INTERNAL;
      },
    };

    all_available &= target.is_supported();
    println!("{}", describe(architecture, target.toolchain_status().as_ref()));
  }

  if all_available { EXIT_OK } else { EXIT_FAILED }
}

#[cfg(test)]
mod tests {
  use clap::Parser;
  use kiln_diagnostics::DiagnosticMessage;

  use super::*;

  const HELLO: &str = r#"{
    "modules": [{
      "name": "app",
      "constructs": [{
        "name": "app::Hello",
        "kind": "Program",
        "methods": [{
          "name": "main",
          "is_static": true,
          "body": [{ "kind": { "Branch": { "Return": { "value": null } } } }]
        }]
      }]
    }]
  }"#;

  fn run(args: &[&str]) -> u8 {
    let cli = Cli::try_parse_from(args).unwrap();
    match &cli.subcommand {
      crate::cli::SubCommand::Build(command) => build(&cli, command),
      crate::cli::SubCommand::Probe(command) => probe(command),
    }
  }

  #[test]
  fn project_file_picks_the_target() {
    let dir = tempfile::tempdir().unwrap();
    let program = dir.path().join("hello.json");
    fs::write(&program, HELLO).unwrap();
    fs::write(
      dir.path().join("kiln.toml"),
      "[project]\nname = \"hello\"\n\n[build]\ntarget = \"jvm\"\noutput_dir = \"target-out\"\n",
    )
    .unwrap();

    let out = dir.path().join("out");
    let code = run(&[
      "kiln",
      "build",
      program.to_str().unwrap(),
      "--project",
      dir.path().to_str().unwrap(),
      "-o",
      out.to_str().unwrap(),
      "-q",
    ]);

    assert_eq!(code, EXIT_OK);
    assert!(out.join("generated/main/jvm/app/Hello.jasm").is_file());
    assert!(out.join("generated/main/jvm/kiln-entry.jasm").is_file());
  }

  #[test]
  fn unsupported_target_in_project_file_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let program = dir.path().join("hello.json");
    fs::write(&program, HELLO).unwrap();
    fs::write(dir.path().join("kiln.toml"), "[project]\nname = \"hello\"\n\n[build]\ntarget = \"wasm\"\n").unwrap();

    let code = run(&["kiln", "build", program.to_str().unwrap(), "--project", dir.path().to_str().unwrap(), "-q"]);

    assert_eq!(code, EXIT_USAGE);
  }

  #[test]
  fn unreadable_program_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");

    let code = run(&["kiln", "build", missing.to_str().unwrap(), "--project", dir.path().to_str().unwrap(), "-q"]);

    assert_eq!(code, EXIT_USAGE);
  }

  #[test]
  fn probe_lines_name_the_problem() {
    assert_eq!(describe(TargetArchitecture::Jvm, None), "jvm: available");
    assert_eq!(
      describe(TargetArchitecture::LlvmCpp, Some(&ToolchainStatus::TooOld { found: 14 })),
      "llvm-cpp: unavailable, clang 14 is too old"
    );
  }

  #[test]
  fn quiet_still_shows_warnings_and_errors() {
    let unavailable = DiagnosticMessage::TargetUnavailable {
      target: "llvm-cpp".to_string(),
      executable: "clang".to_string(),
      minimum_version: 15,
      found_version: None,
    }
    .report();
    let info = Diagnostic::new(Severity::Info, "cache hit".to_string(), "I0001".to_string(), None);

    let quiet = shown(vec![unavailable.clone(), info.clone()], true);
    assert_eq!(quiet.len(), 1);
    assert_eq!(quiet[0].error_code, "T0001");

    assert_eq!(shown(vec![unavailable, info], false).len(), 2);
  }
}
