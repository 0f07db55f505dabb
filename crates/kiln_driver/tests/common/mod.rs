#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use kiln_backend::{ToolchainProbe, ToolchainStatus};
use kiln_config::{CompilerFlags, TargetArchitecture};
use kiln_ir::{ConstructKind, IrConstruct, IrProgram, MethodBuilder};

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

pub fn flags(
  target: TargetArchitecture,
  out: &Path,
) -> CompilerFlags {
  CompilerFlags::new_basic(false, Vec::new(), true, 0)
    .with_target(target)
    .with_output_dir(out)
    .with_dev_build(true)
}

/// Runnable program whose `main` allocates one string.
pub fn program_construct(name: &str) -> IrConstruct {
  let mut b = MethodBuilder::new(name, "main").as_static();
  let scope = b.enter_scope();
  let text = b.literal("\"hi\"", "kiln.lang::String");
  b.retain(&text);
  b.register(&text, &scope);
  b.exit_scope(&scope);
  b.ret(None);

  IrConstruct::new(name, ConstructKind::Program).with_method(b.finish().unwrap())
}

pub fn record(name: &str) -> IrConstruct {
  IrConstruct::new(name, ConstructKind::Record).with_field("text", "kiln.lang::String")
}

/// Jumps to a label that does not exist.
pub fn broken(name: &str) -> IrConstruct {
  let mut b = MethodBuilder::new(name, "run");
  b.jump("nowhere");
  IrConstruct::new(name, ConstructKind::Class).with_method(b.finish().unwrap())
}

/// Runnable program whose static `main` jumps to a label that does not exist.
pub fn broken_program(name: &str) -> IrConstruct {
  let mut b = MethodBuilder::new(name, "main").as_static();
  b.jump("nowhere");
  IrConstruct::new(name, ConstructKind::Program).with_method(b.finish().unwrap())
}

pub fn program(constructs: impl IntoIterator<Item = IrConstruct>) -> IrProgram {
  let mut program = IrProgram::new();
  for construct in constructs {
    program.add_construct(construct);
  }
  program
}
