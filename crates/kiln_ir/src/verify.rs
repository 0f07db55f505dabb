use std::collections::HashMap;
use std::fmt;

use crate::{
  Branch, ConstructKind, InstrKind, IrConstruct, IrMethod, Memory, Scope,
  instr::load_root,
  ownership::{OwnershipError, OwnershipTracker},
  program::ENTRY_METHOD,
};

/// Malformed IR. Always a generator defect, never a user error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
  DuplicateLabel {
    method: String,
    label: String,
  },
  UnknownLabel {
    method: String,
    label: String,
  },
  /// Ownership protocol broken by the instruction at `index`.
  Ownership {
    method: String,
    index: usize,
    error: OwnershipError,
  },
  /// Retained on some path and neither registered nor returned before `return`.
  LeakedValue {
    method: String,
    variable: String,
  },
  ScopeNotExited {
    method: String,
    scope: String,
  },
  /// Paths reaching `label` disagree about a value or scope.
  InconsistentJoin {
    method: String,
    label: String,
  },
  FallsOffEnd {
    method: String,
  },
  /// A program whose `main` cannot be called as an entry point.
  EntrySignature {
    construct: String,
  },
}

impl fmt::Display for VerifyError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      VerifyError::DuplicateLabel { method, label } => write!(f, "{}: label '{}' defined twice", method, label),
      VerifyError::UnknownLabel { method, label } => write!(f, "{}: branch to unknown label '{}'", method, label),
      VerifyError::Ownership { method, index, error } => write!(f, "{} [{}]: {}", method, index, error),
      VerifyError::LeakedValue { method, variable } => {
        write!(f, "{}: '{}' is retained but never released", method, variable)
      },
      VerifyError::ScopeNotExited { method, scope } => write!(f, "{}: scope '{}' still open at return", method, scope),
      VerifyError::InconsistentJoin { method, label } => {
        write!(f, "{}: paths reaching '{}' disagree on ownership", method, label)
      },
      VerifyError::FallsOffEnd { method } => write!(f, "{}: control reaches the end without a return", method),
      VerifyError::EntrySignature { construct } => {
        write!(f, "{}: '{}' must be static with no parameters and no result", construct, ENTRY_METHOD)
      },
    }
  }
}

pub type VerifyResult = Result<(), Vec<VerifyError>>;

pub fn verify_construct(construct: &IrConstruct) -> VerifyResult {
  let mut errors: Vec<VerifyError> = construct
    .methods
    .iter()
    .filter_map(|method| verify_method(&construct.name, method).err())
    .flatten()
    .collect();

  let misshapen_main = construct.method(ENTRY_METHOD).is_some_and(|main| !main.is_entry_signature());
  if construct.kind == ConstructKind::Program && misshapen_main {
    errors.push(VerifyError::EntrySignature {
      construct: construct.name.clone(),
    });
  }

  if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn verify_method(
  owner: &str,
  method: &IrMethod,
) -> VerifyResult {
  MethodVerifier::new(owner, method).verify()
}

struct MethodVerifier<'a> {
  name: String,
  method: &'a IrMethod,
  labels: HashMap<&'a str, usize>,
  errors: Vec<VerifyError>,
}

impl<'a> MethodVerifier<'a> {
  fn new(
    owner: &str,
    method: &'a IrMethod,
  ) -> Self {
    Self {
      name: format!("{}.{}", owner, method.name),
      method,
      labels: HashMap::new(),
      errors: Vec::new(),
    }
  }

  fn verify(mut self) -> VerifyResult {
    self.collect_labels();
    self.check_branch_targets();

    // Flow checks need every branch to resolve.
    if self.errors.is_empty() {
      self.check_ownership();
    }

    if self.errors.is_empty() { Ok(()) } else { Err(self.errors) }
  }

  fn report(
    &mut self,
    error: VerifyError,
  ) {
    if !self.errors.contains(&error) {
      self.errors.push(error);
    }
  }

  fn collect_labels(&mut self) {
    let method = self.method;
    for (index, instr) in method.body.iter().enumerate() {
      if let Some(label) = instr.label_name() {
        if self.labels.insert(label, index).is_some() {
          self.report(VerifyError::DuplicateLabel {
            method: self.name.clone(),
            label: label.to_string(),
          });
        }
      }
    }
  }

  fn check_branch_targets(&mut self) {
    let method = self.method;
    for instr in &method.body {
      if let Some(target) = instr.branch().and_then(Branch::target) {
        if !self.labels.contains_key(target) {
          self.report(VerifyError::UnknownLabel {
            method: self.name.clone(),
            label: target.to_string(),
          });
        }
      }
    }
  }

  /// Walk every path, merging states where paths meet at a label. A label
  /// is walked again only when the merge taught it something new.
  fn check_ownership(&mut self) {
    let method = self.method;
    let body = &method.body;
    let mut at_label: HashMap<usize, OwnershipTracker> = HashMap::new();
    let mut worklist: Vec<(usize, OwnershipTracker)> = vec![(0, OwnershipTracker::new())];

    while let Some((start, mut state)) = worklist.pop() {
      let mut index = start;

      loop {
        let Some(instr) = body.get(index) else {
          self.report(VerifyError::FallsOffEnd {
            method: self.name.clone(),
          });
          break;
        };

        if let Some(label) = instr.label_name() {
          match at_label.get_mut(&index) {
            None => {
              at_label.insert(index, state.clone());
            },
            Some(known) => {
              let outcome = known.join(&state);
              if outcome.conflict {
                self.report(VerifyError::InconsistentJoin {
                  method: self.name.clone(),
                  label: label.to_string(),
                });
              }
              if !outcome.changed {
                break;
              }
              state = known.clone();
            },
          }
        }

        match &instr.kind {
          InstrKind::Branch(Branch::Return { value }) => {
            if let Some(value) = value {
              self.apply(index, state.check_use(value));
            }
            self.check_exit_state(&state, value.as_deref());
            break;
          },
          InstrKind::Branch(Branch::Jump { target }) => {
            let to = self.labels[target.as_str()];
            worklist.push((to, along_edge(&at_label, index, to, state)));
            break;
          },
          InstrKind::Branch(Branch::JumpIfTrue { condition, target } | Branch::JumpIfFalse { condition, target }) => {
            self.apply(index, state.check_use(condition));
            let to = self.labels[target.as_str()];
            worklist.push((to, along_edge(&at_label, index, to, state.clone())));
          },
          kind => self.step(index, kind, &mut state),
        }

        index += 1;
      }
    }
  }

  fn step(
    &mut self,
    index: usize,
    kind: &InstrKind,
    state: &mut OwnershipTracker,
  ) {
    match kind {
      InstrKind::Call(call) => {
        for used in call.receiver.iter().chain(call.arguments.iter()) {
          self.apply(index, state.check_use(used));
        }
        if let Some(dest) = &call.dest {
          state.produce(dest);
        }
      },
      InstrKind::Literal { dest, .. } => state.produce(dest),
      InstrKind::Memory(Memory::Retain(variable)) => self.apply(index, state.retain(variable)),
      InstrKind::Memory(Memory::Release(variable)) => self.apply(index, state.release(variable)),
      InstrKind::Memory(Memory::Store { dest, src }) => self.apply(index, state.store(dest, src)),
      InstrKind::Memory(Memory::Load { source, .. }) => self.apply(index, state.check_use(load_root(source))),
      InstrKind::Memory(Memory::Reference { .. }) | InstrKind::Label(_) | InstrKind::Branch(_) => {},
      InstrKind::Scope(Scope::Enter(scope)) => self.apply(index, state.enter(scope)),
      InstrKind::Scope(Scope::Register { variable, scope }) => self.apply(index, state.register(variable, scope)),
      InstrKind::Scope(Scope::Exit(scope)) => {
        let released = state.exit(scope).map(|_| ());
        self.apply(index, released);
      },
    }
  }

  fn apply(
    &mut self,
    index: usize,
    result: Result<(), OwnershipError>,
  ) {
    if let Err(error) = result {
      self.report(VerifyError::Ownership {
        method: self.name.clone(),
        index,
        error,
      });
    }
  }

  fn check_exit_state(
    &mut self,
    state: &OwnershipTracker,
    returned: Option<&str>,
  ) {
    for variable in state.leaked_values(returned) {
      self.report(VerifyError::LeakedValue {
        method: self.name.clone(),
        variable,
      });
    }

    for scope in state.open_scopes() {
      self.report(VerifyError::ScopeNotExited {
        method: self.name.clone(),
        scope: scope.to_string(),
      });
    }
  }
}

/// State carried from `from` to the label at `to`. Branching back to a label
/// already walked starts another loop iteration, in which the scopes the body
/// entered and exited since that label are entered again.
fn along_edge(
  at_label: &HashMap<usize, OwnershipTracker>,
  from: usize,
  to: usize,
  mut state: OwnershipTracker,
) -> OwnershipTracker {
  if to <= from {
    if let Some(head) = at_label.get(&to) {
      state.restart_scopes_since(head);
    }
  }
  state
}
