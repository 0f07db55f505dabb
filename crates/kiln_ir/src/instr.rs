use kiln_diagnostics::SourceLocation;
use serde::{Deserialize, Serialize};

use crate::ScopeId;

/// Source position an instruction was lowered from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DebugInfo {
  pub source_file: String,
  pub line: u32,
  pub column: u32,
}

impl DebugInfo {
  pub fn new(
    source_file: impl Into<String>,
    line: u32,
    column: u32,
  ) -> Self {
    Self {
      source_file: source_file.into(),
      line,
      column,
    }
  }
}

impl From<&DebugInfo> for SourceLocation {
  fn from(info: &DebugInfo) -> Self {
    SourceLocation::new(info.source_file.clone(), info.line, info.column)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Branch {
  Return { value: Option<String> },
  Jump { target: String },
  /// Falls through to the next instruction when the condition is false.
  JumpIfTrue { condition: String, target: String },
  /// Falls through to the next instruction when the condition is true.
  JumpIfFalse { condition: String, target: String },
}

impl Branch {
  pub fn target(&self) -> Option<&str> {
    match self {
      Branch::Return { .. } => None,
      Branch::Jump { target } | Branch::JumpIfTrue { target, .. } | Branch::JumpIfFalse { target, .. } => Some(target),
    }
  }

  /// Control never reaches the following instruction.
  pub fn is_unconditional(&self) -> bool {
    matches!(self, Branch::Return { .. } | Branch::Jump { .. })
  }
}

/// Static facts about the called method that backends and later passes may use.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallMetaData {
  pub pure: bool,
  pub complexity: u32,
  pub side_effects: Vec<String>,
}

/// Everything needed to dispatch one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDetails {
  /// Static type of the receiver; `None` for calls without one.
  pub target_type: Option<String>,
  pub declaring_type: String,
  pub method_name: String,
  pub argument_types: Vec<String>,
  /// `None` when the method produces no value.
  pub return_type: Option<String>,
  pub metadata: CallMetaData,
  /// Dispatch through a trait table rather than directly.
  pub trait_call: bool,
}

impl CallDetails {
  pub fn is_static(&self) -> bool {
    self.target_type.is_none()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
  pub details: CallDetails,
  /// Variable holding the receiver for instance calls.
  pub receiver: Option<String>,
  pub arguments: Vec<String>,
  pub dest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Memory {
  Retain(String),
  Release(String),
  /// `dest` takes a reference to the value held by `src`.
  Store {
    dest: String,
    src: String,
  },
  /// Declares a variable slot of the given type.
  Reference {
    variable: String,
    ty: String,
  },
  /// Reads a variable or `receiver.field` path into `dest`.
  Load {
    dest: String,
    source: String,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
  Enter(ScopeId),
  Register { variable: String, scope: ScopeId },
  /// Releases everything registered to the scope, last registered first.
  Exit(ScopeId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrKind {
  Label(String),
  Branch(Branch),
  Call(Call),
  Literal { dest: String, value: String, ty: String },
  Memory(Memory),
  Scope(Scope),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instr {
  pub kind: InstrKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub debug_info: Option<DebugInfo>,
}

impl Instr {
  pub fn new(kind: InstrKind) -> Self {
    Self { kind, debug_info: None }
  }

  pub fn with_debug_info(
    mut self,
    debug_info: Option<DebugInfo>,
  ) -> Self {
    self.debug_info = debug_info;
    self
  }

  pub fn label_name(&self) -> Option<&str> {
    match &self.kind {
      InstrKind::Label(name) => Some(name),
      _ => None,
    }
  }

  pub fn branch(&self) -> Option<&Branch> {
    match &self.kind {
      InstrKind::Branch(branch) => Some(branch),
      _ => None,
    }
  }

  /// Variable this instruction writes a fresh value into.
  pub fn defines(&self) -> Option<&str> {
    match &self.kind {
      InstrKind::Call(call) => call.dest.as_deref(),
      InstrKind::Literal { dest, .. } => Some(dest),
      InstrKind::Memory(Memory::Load { dest, .. }) => Some(dest),
      InstrKind::Memory(Memory::Store { dest, .. }) => Some(dest),
      _ => None,
    }
  }

  /// Variables whose current value this instruction reads.
  pub fn uses(&self) -> Vec<&str> {
    match &self.kind {
      InstrKind::Call(call) => call
        .receiver
        .as_deref()
        .into_iter()
        .chain(call.arguments.iter().map(String::as_str))
        .collect(),
      InstrKind::Branch(Branch::Return { value }) => value.as_deref().into_iter().collect(),
      InstrKind::Branch(Branch::JumpIfTrue { condition, .. } | Branch::JumpIfFalse { condition, .. }) => {
        vec![condition.as_str()]
      },
      InstrKind::Memory(Memory::Store { src, .. }) => vec![src.as_str()],
      InstrKind::Memory(Memory::Load { source, .. }) => vec![load_root(source)],
      _ => Vec::new(),
    }
  }
}

/// `this.x` reads through `this`.
pub fn load_root(source: &str) -> &str {
  source.split('.').next().unwrap_or(source)
}
