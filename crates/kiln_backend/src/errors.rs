use std::fmt;
use std::io;
use std::path::PathBuf;

/// Unrecoverable code generation faults. Each one aborts the current phase.
#[derive(Debug)]
pub enum CompilerFault {
  /// A locator was asked for an architecture nobody taught it.
  UnsupportedArchitecture {
    operation: &'static str,
    requested: String,
  },
  /// A construct name that cannot be mapped to an output path.
  MalformedName {
    name: String,
    reason: &'static str,
  },
  Io {
    path: PathBuf,
    source: io::Error,
  },
  Lowering {
    construct: String,
    message: String,
  },
}

impl CompilerFault {
  pub fn unsupported(
    operation: &'static str,
    requested: impl Into<String>,
  ) -> Self {
    Self::UnsupportedArchitecture {
      operation,
      requested: requested.into(),
    }
  }

  pub fn io(
    path: impl Into<PathBuf>,
    source: io::Error,
  ) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }

  pub fn lowering(
    construct: impl Into<String>,
    message: impl Into<String>,
  ) -> Self {
    Self::Lowering {
      construct: construct.into(),
      message: message.into(),
    }
  }
}

impl fmt::Display for CompilerFault {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      CompilerFault::UnsupportedArchitecture { operation, requested } => {
        write!(f, "{}: no backend for architecture '{}'", operation, requested)
      },
      CompilerFault::MalformedName { name, reason } => {
        write!(f, "cannot derive an output path for '{}': {}", name, reason)
      },
      CompilerFault::Io { path, source } => write!(f, "{}: {}", path.display(), source),
      CompilerFault::Lowering { construct, message } => write!(f, "lowering {}: {}", construct, message),
    }
  }
}

impl std::error::Error for CompilerFault {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      CompilerFault::Io { source, .. } => Some(source),
      _ => None,
    }
  }
}
