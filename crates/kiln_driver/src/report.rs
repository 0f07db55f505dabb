use std::fmt;
use std::path::PathBuf;

use kiln_backend::CompilerFault;
use kiln_config::TargetArchitecture;
use kiln_diagnostics::DiagnosticCollector;
use kiln_ir::VerifyError;

/// Outcome of one code generation phase.
#[derive(Debug)]
pub struct CodegenReport {
  pub architecture: TargetArchitecture,
  /// Construct artifacts, in program order.
  pub written: Vec<PathBuf>,
  pub entry: Option<PathBuf>,
  pub failed: Vec<FailedConstruct>,
  pub diagnostics: DiagnosticCollector,
  /// The target could not be built on this host; nothing was lowered.
  pub skipped: bool,
}

impl CodegenReport {
  pub fn new(architecture: TargetArchitecture) -> Self {
    Self {
      architecture,
      written: Vec::new(),
      entry: None,
      failed: Vec::new(),
      diagnostics: DiagnosticCollector::new(),
      skipped: false,
    }
  }

  pub fn is_success(&self) -> bool {
    !self.skipped && self.failed.is_empty() && !self.diagnostics.has_errors()
  }

  pub fn failed_names(&self) -> Vec<&str> {
    self.failed.iter().map(|f| f.name.as_str()).collect()
  }
}

#[derive(Debug)]
pub struct FailedConstruct {
  pub name: String,
  pub reason: FailureReason,
}

#[derive(Debug)]
pub enum FailureReason {
  /// Malformed IR; never handed to a backend.
  Verification(Vec<VerifyError>),
  Codegen(CompilerFault),
  /// The worker lowering this construct panicked.
  Panicked,
}

impl fmt::Display for FailureReason {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      FailureReason::Verification(errors) => {
        write!(f, "IR verification failed:")?;
        for error in errors {
          write!(f, "\n  {}", error)?;
        }
        Ok(())
      },
      FailureReason::Codegen(fault) => write!(f, "{}", fault),
      FailureReason::Panicked => write!(f, "lowering panicked"),
    }
  }
}

impl fmt::Display for FailedConstruct {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{}: {}", self.name, self.reason)
  }
}
