use std::fmt;

use super::diagnostic_report::{Diagnostic, Severity, SourceLocation};

/// Every user-facing problem the IR and lowering phases can report.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticMessage {
  AmbiguousCall {
    method: String,
    target: Option<String>,
    candidates: Vec<String>,
    at: Option<SourceLocation>,
  },
  UnresolvedCall {
    method: String,
    target: Option<String>,
    argument_types: Vec<String>,
    at: Option<SourceLocation>,
  },
  TargetUnavailable {
    target: String,
    executable: String,
    minimum_version: u32,
    found_version: Option<u32>,
  },
}

impl fmt::Display for DiagnosticMessage {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      DiagnosticMessage::AmbiguousCall { method, target, .. } => match target {
        Some(target) => write!(f, "Ambiguous call to '{}' on '{}'", method, target),
        None => write!(f, "Ambiguous call to '{}'", method),
      },
      DiagnosticMessage::UnresolvedCall {
        method,
        target,
        argument_types,
        ..
      } => {
        let args = argument_types.join(", ");
        match target {
          Some(target) => write!(f, "No method '{}({})' found on '{}'", method, args, target),
          None => write!(f, "No function '{}({})' found", method, args),
        }
      },
      DiagnosticMessage::TargetUnavailable { target, .. } => {
        write!(f, "Target '{}' is not available on this host", target)
      },
    }
  }
}

impl DiagnosticMessage {
  pub fn code(&self) -> String {
    match self {
      DiagnosticMessage::AmbiguousCall { .. } => "C0001",
      DiagnosticMessage::UnresolvedCall { .. } => "C0002",
      DiagnosticMessage::TargetUnavailable { .. } => "T0001",
    }
    .to_string()
  }

  pub fn level(&self) -> Severity {
    match self {
      DiagnosticMessage::AmbiguousCall { .. } | DiagnosticMessage::UnresolvedCall { .. } => Severity::Error,
      DiagnosticMessage::TargetUnavailable { .. } => Severity::Warning,
    }
  }

  pub fn location(&self) -> Option<SourceLocation> {
    match self {
      DiagnosticMessage::AmbiguousCall { at, .. } | DiagnosticMessage::UnresolvedCall { at, .. } => at.clone(),
      DiagnosticMessage::TargetUnavailable { .. } => None,
    }
  }

  fn notes(&self) -> Vec<String> {
    match self {
      DiagnosticMessage::AmbiguousCall { candidates, .. } => {
        candidates.iter().map(|c| format!("candidate: {}", c)).collect()
      },
      DiagnosticMessage::UnresolvedCall { .. } => Vec::new(),
      DiagnosticMessage::TargetUnavailable {
        executable,
        minimum_version,
        found_version,
        ..
      } => {
        let found = match found_version {
          Some(version) => format!("found {} {}", executable, version),
          None => format!("'{}' was not found on PATH", executable),
        };
        vec![
          found,
          format!("install {} {} or newer, or choose another target", executable, minimum_version),
        ]
      },
    }
  }

  pub fn report(&self) -> Diagnostic {
    self.report_with_severity(self.level())
  }

  pub fn report_with_severity(
    &self,
    severity: Severity,
  ) -> Diagnostic {
    let mut diagnostic = Diagnostic::new(severity, self.to_string(), self.code(), self.location());
    for note in self.notes() {
      diagnostic = diagnostic.with_note(note);
    }
    diagnostic
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ambiguity_lists_every_candidate() {
    let message = DiagnosticMessage::AmbiguousCall {
      method: "add".to_string(),
      target: Some("kiln.lang::Integer".to_string()),
      candidates: vec!["add(Float)".to_string(), "add(Decimal)".to_string()],
      at: Some(SourceLocation::new("main.kn", 3, 7)),
    };

    let diagnostic = message.report();
    assert_eq!(diagnostic.error_code, "C0001");
    assert_eq!(diagnostic.severity, Severity::Error);
    assert_eq!(diagnostic.notes.len(), 2);
    assert_eq!(diagnostic.message, "Ambiguous call to 'add' on 'kiln.lang::Integer'");
  }

  #[test]
  fn missing_toolchain_is_a_warning_with_a_remedy() {
    let message = DiagnosticMessage::TargetUnavailable {
      target: "llvm-cpp".to_string(),
      executable: "clang".to_string(),
      minimum_version: 15,
      found_version: Some(11),
    };

    let diagnostic = message.report();
    assert_eq!(diagnostic.severity, Severity::Warning);
    assert_eq!(diagnostic.notes[0], "found clang 11");
    assert!(diagnostic.notes[1].contains("clang 15 or newer"));
  }
}
