pub mod diagnostic_report;
pub mod message;

use std::io::{self, Write};

use colored::*;
use diagnostic_report::{Diagnostic, Severity};

pub use diagnostic_report::{Label, SourceLocation};
pub use message::DiagnosticMessage;

/// Accumulates user-facing diagnostics for one phase without unwinding.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollector {
  diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(
    &mut self,
    diagnostic: Diagnostic,
  ) {
    self.diagnostics.push(diagnostic);
  }

  pub fn report(
    &mut self,
    message: DiagnosticMessage,
  ) {
    self.diagnostics.push(message.report());
  }

  pub fn extend(
    &mut self,
    other: DiagnosticCollector,
  ) {
    self.diagnostics.extend(other.diagnostics);
  }

  pub fn has_errors(&self) -> bool {
    self.diagnostics.iter().any(Diagnostic::is_error)
  }

  pub fn error_count(&self) -> usize {
    self.count(Severity::Error)
  }

  pub fn warning_count(&self) -> usize {
    self.count(Severity::Warning)
  }

  fn count(
    &self,
    severity: Severity,
  ) -> usize {
    self.diagnostics.iter().filter(|d| d.severity == severity).count()
  }

  pub fn len(&self) -> usize {
    self.diagnostics.len()
  }

  pub fn is_empty(&self) -> bool {
    self.diagnostics.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
    self.diagnostics.iter()
  }

  pub fn into_vec(self) -> Vec<Diagnostic> {
    self.diagnostics
  }
}

pub fn render(diag: &Diagnostic) {
  let stderr = io::stderr();
  let _ = render_to(&mut stderr.lock(), diag);
}

pub fn render_batch(diagnostics: &[Diagnostic]) {
  let stderr = io::stderr();
  let mut out = stderr.lock();
  for diag in diagnostics {
    let _ = render_to(&mut out, diag);
  }
}

pub fn render_to(
  out: &mut impl Write,
  diag: &Diagnostic,
) -> io::Result<()> {
  write_header(out, diag)?;

  if let Some(location) = &diag.location {
    writeln!(out, "{:2}{} {}", "", "-->".blue().bold(), location.to_string().bold())?;
  }

  for label in &diag.labels {
    match &label.location {
      Some(location) => writeln!(out, "  {} {} ({})", "label:".yellow().bold(), label.message, location)?,
      None => writeln!(out, "  {} {}", "label:".yellow().bold(), label.message)?,
    }
  }

  for note in &diag.notes {
    writeln!(out, "  {} {}", "note:".cyan().bold(), note)?;
  }

  writeln!(out)
}

fn write_header(
  out: &mut impl Write,
  diag: &Diagnostic,
) -> io::Result<()> {
  let message = diag.message.bold();
  let code = diag.error_code.bold();

  match diag.severity {
    Severity::Info => writeln!(out, "{}[{}]: {}", "Info".blue().bold(), code.blue(), message),
    Severity::Warning => writeln!(out, "{}[{}]: {}", "Warning".yellow().bold(), code.yellow(), message),
    Severity::Error => writeln!(out, "{}[{}]: {}", "Error".red().bold(), code.red().bold(), message),
    Severity::Hint => writeln!(out, "{}[{}]: {}", "Hint".cyan().bold(), code.cyan(), message),
  }
}
