#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use kiln_backend::{ToolchainProbe, ToolchainStatus};
use kiln_ir::{CallDetails, CallMetaData, ConstructKind, EntryPoint, IrConstruct, MethodBuilder};

pub const INTEGER: &str = "kiln.lang::Integer";

/// Probe with a fixed answer that counts how often it was asked.
pub struct FakeProbe {
  status: ToolchainStatus,
  calls: AtomicUsize,
}

impl FakeProbe {
  pub fn new(status: ToolchainStatus) -> Self {
    Self {
      status,
      calls: AtomicUsize::new(0),
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl ToolchainProbe for FakeProbe {
  fn executable(&self) -> &str {
    "clang"
  }

  fn minimum_version(&self) -> u32 {
    15
  }

  fn probe(&self) -> ToolchainStatus {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.status.clone()
  }
}

fn integer_add() -> CallDetails {
  CallDetails {
    target_type: Some(INTEGER.to_string()),
    declaring_type: INTEGER.to_string(),
    method_name: "_add".to_string(),
    argument_types: vec![INTEGER.to_string()],
    return_type: Some(INTEGER.to_string()),
    metadata: CallMetaData {
      pure: true,
      complexity: 1,
      side_effects: Vec::new(),
    },
    trait_call: false,
  }
}

/// `app::Counter` with one field and `bump(step) = this.count + step`.
pub fn counter() -> IrConstruct {
  let mut b = MethodBuilder::new("app::Counter", "bump")
    .with_param("step", INTEGER)
    .with_return_type(INTEGER);
  let scope = b.enter_scope();
  b.reference("_ret", INTEGER);
  let count = b.load("this.count");
  let sum = b.call_owned(integer_add(), Some(&count), vec!["step".to_string()], &scope).unwrap();
  b.store("_ret", &sum);
  b.retain("_ret");
  b.exit_scope(&scope);
  b.ret(Some("_ret"));

  IrConstruct::new("app::Counter", ConstructKind::Class)
    .with_field("count", INTEGER)
    .with_method(b.finish().unwrap())
}

pub fn entries(names: &[&str]) -> Vec<EntryPoint> {
  names
    .iter()
    .map(|name| EntryPoint {
      name: name.to_string(),
      construct: format!("app::{}", name),
    })
    .collect()
}
