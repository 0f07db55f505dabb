use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
  Hint,
  Info,
  Warning,
  Error,
}

/// Where in the source program a diagnostic points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
  pub file: String,
  pub line: u32,
  pub column: u32,
}

impl SourceLocation {
  pub fn new(
    file: impl Into<String>,
    line: u32,
    column: u32,
  ) -> Self {
    Self {
      file: file.into(),
      line,
      column,
    }
  }
}

impl fmt::Display for SourceLocation {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{}:{}:{}", self.file, self.line, self.column)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
  pub location: Option<SourceLocation>,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
  pub severity: Severity,
  pub message: String,
  pub error_code: String,
  /// Call sites lowered without debug info have no location.
  pub location: Option<SourceLocation>,
  pub labels: Vec<Label>,
  pub notes: Vec<String>,
}

impl Diagnostic {
  pub fn new(
    severity: Severity,
    message: String,
    error_code: String,
    location: Option<SourceLocation>,
  ) -> Self {
    Self {
      severity,
      message,
      error_code,
      location,
      labels: Vec::new(),
      notes: Vec::new(),
    }
  }

  pub fn with_label(
    mut self,
    location: Option<SourceLocation>,
    message: String,
  ) -> Self {
    self.labels.push(Label { location, message });
    self
  }

  pub fn with_note(
    mut self,
    note: String,
  ) -> Self {
    self.notes.push(note);
    self
  }

  pub fn is_error(&self) -> bool {
    self.severity == Severity::Error
  }
}
