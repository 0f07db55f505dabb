pub mod builder;
pub mod display;
pub mod instr;
pub mod names;
pub mod ownership;
pub mod program;
pub mod synthetic;
pub mod verify;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use builder::MethodBuilder;
pub use instr::{Branch, Call, CallDetails, CallMetaData, DebugInfo, Instr, InstrKind, Memory, Scope};
pub use ownership::{OwnershipTracker, ValueState};
pub use program::{ConstructKind, EntryPoint, IrConstruct, IrField, IrMethod, IrModule, IrParam, IrProgram};
pub use verify::{VerifyError, VerifyResult, verify_construct, verify_method};

/// Opaque handle of a lexical scope inside one method body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(String);

impl ScopeId {
  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ScopeId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Generator defects found while building IR. Never caused by user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrFault {
  /// A label was reserved for a forward branch but never placed.
  UnplacedLabel { method: String, label: String },
  DuplicateLabel { method: String, label: String },
  /// A type the generator needs is missing from the symbol graph.
  MissingType { name: String },
  /// A field or supertype lacks an operator the synthetic body calls.
  MissingOperator { ty: String, operator: String },
  NotSynthesizable { ty: String, operator: String },
  /// `_fieldSetStatus` has one bit per field.
  TooManyFields { ty: String, limit: usize },
  Verification { construct: String, errors: Vec<VerifyError> },
}

impl fmt::Display for IrFault {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      IrFault::UnplacedLabel { method, label } => {
        write!(f, "label '{}' reserved in '{}' was never placed", label, method)
      },
      IrFault::DuplicateLabel { method, label } => write!(f, "label '{}' placed twice in '{}'", label, method),
      IrFault::MissingType { name } => write!(f, "type '{}' is not in the symbol graph", name),
      IrFault::MissingOperator { ty, operator } => write!(f, "type '{}' has no '{}' operator", ty, operator),
      IrFault::NotSynthesizable { ty, operator } => {
        write!(f, "operator '{}' cannot be synthesized for '{}'", operator, ty)
      },
      IrFault::TooManyFields { ty, limit } => write!(f, "'{}' has more than {} fields", ty, limit),
      IrFault::Verification { construct, errors } => {
        write!(f, "'{}' failed IR verification:", construct)?;
        for error in errors {
          write!(f, "\n  {}", error)?;
        }
        Ok(())
      },
    }
  }
}

impl std::error::Error for IrFault {}
