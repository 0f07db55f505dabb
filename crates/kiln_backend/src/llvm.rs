//! Textual LLVM IR for the native targets.
//!
//! Every IR variable lives in an `alloca` slot and every read goes through a
//! fresh SSA value, which keeps lowering local to one instruction. Memory
//! management and field access are calls into the runtime library; the two
//! native targets differ only in the hook prefix and the entry symbol.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

use kiln_config::TargetArchitecture;
use kiln_ir::{
  Branch, Call, EntryPoint, InstrKind, IrConstruct, IrMethod, Memory, Scope, ScopeId,
  names::{PRIMITIVE_BOOLEAN, SUPER, THIS},
};

use crate::{CodegenBackend, CompilerFault};

pub const LLVM_EXTENSION: &str = "ll";

/// Runtime library the generated module links against.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LlvmRuntime {
  Cpp,
  Go,
}

impl LlvmRuntime {
  pub fn architecture(self) -> TargetArchitecture {
    match self {
      LlvmRuntime::Cpp => TargetArchitecture::LlvmCpp,
      LlvmRuntime::Go => TargetArchitecture::LlvmGo,
    }
  }

  pub fn hook_prefix(self) -> &'static str {
    match self {
      LlvmRuntime::Cpp => "kiln_cpp_",
      LlvmRuntime::Go => "kiln_go_",
    }
  }

  /// The Go runtime owns `main` and calls into the program through an exported symbol.
  pub fn entry_symbol(self) -> &'static str {
    match self {
      LlvmRuntime::Cpp => "main",
      LlvmRuntime::Go => "kiln_go_main",
    }
  }

  fn hook(
    self,
    name: &str,
  ) -> String {
    format!("@{}{}", self.hook_prefix(), name)
  }
}

pub struct LlvmBackend {
  runtime: LlvmRuntime,
}

impl LlvmBackend {
  pub fn new(runtime: LlvmRuntime) -> Self {
    Self { runtime }
  }

  pub fn runtime(&self) -> LlvmRuntime {
    self.runtime
  }
}

impl CodegenBackend for LlvmBackend {
  fn architecture(&self) -> TargetArchitecture {
    self.runtime.architecture()
  }

  fn file_extension(&self) -> &'static str {
    LLVM_EXTENSION
  }

  fn lower_construct(
    &self,
    construct: &IrConstruct,
  ) -> Result<String, CompilerFault> {
    let mut module = ModuleWriter::new(self.runtime, construct);

    let fields = match construct.fields.len() {
      0 => "{}".to_string(),
      n => format!("{{ {} }}", vec!["ptr"; n].join(", ")),
    };
    let _ = writeln!(module.head, "%{} = type {}", quote(&construct.name), fields);

    for method in &construct.methods {
      module.write_method(method)?;
    }
    Ok(module.finish())
  }

  fn lower_entry_point(
    &self,
    entries: &[EntryPoint],
  ) -> Result<String, CompilerFault> {
    if entries.is_empty() {
      return Err(CompilerFault::lowering(self.runtime.entry_symbol(), "no program entry points"));
    }

    let runtime = self.runtime;
    let mut out = String::new();
    let _ = writeln!(out, "; kiln {} entry", runtime.architecture());
    let _ = writeln!(out);

    let mut strings = StringTable::default();
    let names: Vec<String> = entries.iter().map(|e| strings.intern(&e.name)).collect();
    let table = names.iter().map(|n| format!("ptr {}", n)).collect::<Vec<_>>().join(", ");
    let _ = writeln!(out, "@programs = private constant [{} x ptr] [{}]", entries.len(), table);
    let _ = writeln!(out);

    let _ = writeln!(out, "define i32 @{}(i32 %argc, ptr %argv) {{", runtime.entry_symbol());
    let _ = writeln!(out, "entry:");
    let _ = writeln!(out, "  call void {}(i32 %argc, ptr %argv)", runtime.hook("runtime_init"));

    if let [only] = entries {
      let _ = writeln!(out, "  call void @{}()", quote(&format!("{}.main", only.construct)));
      let _ = writeln!(out, "  ret i32 0");
    } else {
      let _ = writeln!(
        out,
        "  %choice = call i32 {}(i32 %argc, ptr %argv, ptr @programs, i32 {})",
        runtime.hook("select_program"),
        entries.len()
      );
      let cases: Vec<String> = (0..entries.len()).map(|i| format!("i32 {}, label %run{}", i, i)).collect();
      let _ = writeln!(out, "  switch i32 %choice, label %usage [ {} ]", cases.join(" "));
      for (idx, entry) in entries.iter().enumerate() {
        let _ = writeln!(out, "run{}:", idx);
        let _ = writeln!(out, "  call void @{}()", quote(&format!("{}.main", entry.construct)));
        let _ = writeln!(out, "  ret i32 0");
      }
      let _ = writeln!(out, "usage:");
      let _ = writeln!(out, "  ret i32 2");
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);

    let _ = writeln!(out, "declare void {}(i32, ptr)", runtime.hook("runtime_init"));
    if entries.len() > 1 {
      let _ = writeln!(out, "declare i32 {}(i32, ptr, ptr, i32)", runtime.hook("select_program"));
    }
    for entry in entries {
      let _ = writeln!(out, "declare void @{}()", quote(&format!("{}.main", entry.construct)));
    }
    out.push_str(&strings.render());

    Ok(out)
  }
}

/// `"app::Counter.reset"`; LLVM needs quotes around anything beyond `[A-Za-z0-9_.$]`.
fn quote(symbol: &str) -> String {
  if symbol.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$')) {
    symbol.to_string()
  } else {
    format!("\"{}\"", symbol)
  }
}

fn llvm_type(ty: &str) -> &'static str {
  if ty == PRIMITIVE_BOOLEAN { "i1" } else { "ptr" }
}

fn zero_value(ty: &str) -> &'static str {
  if ty == "i1" { "false" } else { "null" }
}

/// Private C strings, emitted once at the end of the module.
#[derive(Default)]
struct StringTable {
  entries: Vec<String>,
  index: HashMap<String, usize>,
}

impl StringTable {
  fn intern(
    &mut self,
    text: &str,
  ) -> String {
    let next = self.entries.len();
    let idx = *self.index.entry(text.to_string()).or_insert_with(|| next);
    if idx == next {
      self.entries.push(text.to_string());
    }
    format!("@.str.{}", idx)
  }

  fn render(&self) -> String {
    let mut out = String::new();
    if !self.entries.is_empty() {
      let _ = writeln!(out);
    }
    for (idx, text) in self.entries.iter().enumerate() {
      let mut escaped = String::new();
      for byte in text.bytes() {
        if (byte.is_ascii_graphic() && byte != b'"' && byte != b'\\') || byte == b' ' {
          escaped.push(byte as char);
        } else {
          let _ = write!(escaped, "\\{:02X}", byte);
        }
      }
      let _ = writeln!(
        out,
        "@.str.{} = private unnamed_addr constant [{} x i8] c\"{}\\00\"",
        idx,
        text.len() + 1,
        escaped
      );
    }
    out
  }
}

struct ModuleWriter<'a> {
  runtime: LlvmRuntime,
  construct: &'a IrConstruct,
  head: String,
  functions: String,
  /// External symbol -> declaration line.
  declares: BTreeMap<String, String>,
  strings: StringTable,
}

impl<'a> ModuleWriter<'a> {
  fn new(
    runtime: LlvmRuntime,
    construct: &'a IrConstruct,
  ) -> Self {
    let mut head = String::new();
    let _ = writeln!(head, "; kiln {} listing for {}", runtime.architecture(), construct.name);
    let _ = writeln!(head);

    Self {
      runtime,
      construct,
      head,
      functions: String::new(),
      declares: BTreeMap::new(),
      strings: StringTable::default(),
    }
  }

  fn declare(
    &mut self,
    symbol: &str,
    ret: &str,
    params: &[&str],
  ) {
    self
      .declares
      .entry(symbol.to_string())
      .or_insert_with(|| format!("declare {} {}({})", ret, symbol, params.join(", ")));
  }

  fn defines(
    &self,
    declaring_type: &str,
    method_name: &str,
  ) -> bool {
    declaring_type == self.construct.name && self.construct.method(method_name).is_some()
  }

  fn write_method(
    &mut self,
    method: &IrMethod,
  ) -> Result<(), CompilerFault> {
    let mut body = FunctionWriter::new(self, method);
    for instr in &method.body {
      body.lower(&instr.kind)?;
    }
    let text = body.finish();

    let _ = writeln!(self.functions);
    self.functions.push_str(&text);
    Ok(())
  }

  fn finish(self) -> String {
    let mut out = self.head;
    out.push_str(&self.functions);
    if !self.declares.is_empty() {
      let _ = writeln!(out);
    }
    for line in self.declares.values() {
      let _ = writeln!(out, "{}", line);
    }
    out.push_str(&self.strings.render());
    out
  }
}

struct FunctionWriter<'m, 'a> {
  module: &'m mut ModuleWriter<'a>,
  method: &'m IrMethod,
  /// Slot type of every variable that has an `alloca`.
  slots: BTreeMap<String, &'static str>,
  slot_order: Vec<String>,
  scopes: Vec<ScopeId>,
  body: String,
  next_value: u32,
  next_block: u32,
  terminated: bool,
}

impl<'m, 'a> FunctionWriter<'m, 'a> {
  fn new(
    module: &'m mut ModuleWriter<'a>,
    method: &'m IrMethod,
  ) -> Self {
    let mut writer = Self {
      module,
      method,
      slots: BTreeMap::new(),
      slot_order: Vec::new(),
      scopes: Vec::new(),
      body: String::new(),
      next_value: 0,
      next_block: 0,
      terminated: false,
    };

    if !method.is_static {
      writer.slot(THIS, "ptr");
    }
    for param in &method.params {
      writer.slot(&param.name, llvm_type(&param.ty));
    }
    writer
  }

  fn slot(
    &mut self,
    variable: &str,
    ty: &'static str,
  ) -> &'static str {
    if let Some(existing) = self.slots.get(variable) {
      return *existing;
    }
    self.slots.insert(variable.to_string(), ty);
    self.slot_order.push(variable.to_string());
    ty
  }

  fn value(&mut self) -> String {
    self.next_value += 1;
    format!("%t{}", self.next_value)
  }

  fn block(
    &mut self,
    prefix: &str,
  ) -> String {
    self.next_block += 1;
    format!("{}.{}", prefix, self.next_block)
  }

  fn line(
    &mut self,
    text: impl AsRef<str>,
  ) {
    // Code after a terminator needs a block of its own, even if nothing jumps to it.
    if self.terminated {
      let dead = self.block("dead");
      let _ = writeln!(self.body, "{}:", dead);
      self.terminated = false;
    }
    let _ = writeln!(self.body, "  {}", text.as_ref());
  }

  fn terminate(
    &mut self,
    text: impl AsRef<str>,
  ) {
    self.line(text);
    self.terminated = true;
  }

  /// Read `variable` into a fresh SSA value.
  fn read(
    &mut self,
    variable: &str,
  ) -> (String, &'static str) {
    let source = if variable == SUPER { THIS } else { variable };
    let ty = self.slot(source, "ptr");
    let value = self.value();
    self.line(format!("{} = load {}, ptr %v.{}", value, ty, source));
    (value, ty)
  }

  fn write(
    &mut self,
    variable: &str,
    ty: &'static str,
    value: &str,
  ) {
    let ty = self.slot(variable, ty);
    self.line(format!("store {} {}, ptr %v.{}", ty, value, variable));
  }

  fn scope_slot(
    &mut self,
    scope: &ScopeId,
  ) -> String {
    if !self.scopes.contains(scope) {
      self.scopes.push(scope.clone());
    }
    format!("%scope.{}", scope)
  }

  fn hook(
    &mut self,
    name: &str,
    ret: &str,
    params: &[&str],
  ) -> String {
    let symbol = self.module.runtime.hook(name);
    self.module.declare(&symbol, ret, params);
    symbol
  }

  fn lower(
    &mut self,
    kind: &InstrKind,
  ) -> Result<(), CompilerFault> {
    match kind {
      InstrKind::Label(name) => {
        if !self.terminated {
          let _ = writeln!(self.body, "  br label %{}", name);
        }
        let _ = writeln!(self.body, "{}:", name);
        self.terminated = false;
      },
      InstrKind::Branch(branch) => self.lower_branch(branch),
      InstrKind::Call(call) => self.lower_call(call)?,
      InstrKind::Literal { dest, value, ty } => {
        let text = self.module.strings.intern(value);
        let factory = format!("@{}", quote(&format!("{}._of", ty)));
        self.module.declare(&factory, "ptr", &["ptr"]);
        let result = self.value();
        self.line(format!("{} = call ptr {}(ptr {})", result, factory, text));
        self.write(dest, "ptr", &result);
      },
      InstrKind::Memory(memory) => self.lower_memory(memory),
      InstrKind::Scope(scope) => self.lower_scope(scope),
    }
    Ok(())
  }

  fn lower_memory(
    &mut self,
    memory: &Memory,
  ) {
    match memory {
      Memory::Retain(variable) | Memory::Release(variable) => {
        let hook_name = if matches!(memory, Memory::Retain(_)) { "retain" } else { "release" };
        let hook = self.hook(hook_name, "void", &["ptr"]);
        let (value, ty) = self.read(variable);
        // Primitive booleans are not reference counted.
        if ty == "ptr" {
          self.line(format!("call void {}(ptr {})", hook, value));
        }
      },
      Memory::Store { dest, src } => {
        let (value, ty) = self.read(src);
        self.write(dest, ty, &value);
      },
      Memory::Reference { variable, ty } => {
        let ty = llvm_type(ty);
        self.write(variable, ty, zero_value(ty));
      },
      Memory::Load { dest, source } => match source.split_once('.') {
        Some((receiver, field)) => {
          let hook = self.hook("field", "ptr", &["ptr", "ptr"]);
          let name = self.module.strings.intern(field);
          let (object, _) = self.read(receiver);
          let result = self.value();
          self.line(format!("{} = call ptr {}(ptr {}, ptr {})", result, hook, object, name));
          self.write(dest, "ptr", &result);
        },
        None => {
          let (value, ty) = self.read(source);
          self.write(dest, ty, &value);
        },
      },
    }
  }

  fn lower_scope(
    &mut self,
    scope: &Scope,
  ) {
    match scope {
      Scope::Enter(id) => {
        let hook = self.hook("scope_enter", "ptr", &[]);
        let slot = self.scope_slot(id);
        let handle = self.value();
        self.line(format!("{} = call ptr {}()", handle, hook));
        self.line(format!("store ptr {}, ptr {}", handle, slot));
      },
      Scope::Register { variable, scope: id } => {
        let hook = self.hook("scope_register", "void", &["ptr", "ptr"]);
        let slot = self.scope_slot(id);
        let handle = self.value();
        self.line(format!("{} = load ptr, ptr {}", handle, slot));
        let (value, ty) = self.read(variable);
        if ty == "ptr" {
          self.line(format!("call void {}(ptr {}, ptr {})", hook, handle, value));
        }
      },
      Scope::Exit(id) => {
        let hook = self.hook("scope_exit", "void", &["ptr"]);
        let slot = self.scope_slot(id);
        let handle = self.value();
        self.line(format!("{} = load ptr, ptr {}", handle, slot));
        self.line(format!("call void {}(ptr {})", hook, handle));
      },
    }
  }

  fn lower_call(
    &mut self,
    call: &Call,
  ) -> Result<(), CompilerFault> {
    let details = &call.details;
    if details.argument_types.len() != call.arguments.len() {
      return Err(CompilerFault::lowering(
        &self.module.construct.name,
        format!("{} expects {} arguments, got {}", details.method_name, details.argument_types.len(), call.arguments.len()),
      ));
    }

    let ret = details.return_type.as_deref().map(llvm_type).unwrap_or("void");
    let symbol = format!("@{}", quote(&format!("{}.{}", details.declaring_type, details.method_name)));

    let mut param_types: Vec<&str> = Vec::new();
    let mut operands: Vec<String> = Vec::new();
    if let Some(receiver) = &call.receiver {
      let (value, ty) = self.read(receiver);
      param_types.push("ptr");
      operands.push(format!("{} {}", ty, value));
    }
    for (arg, arg_ty) in call.arguments.iter().zip(&details.argument_types) {
      let (value, _) = self.read(arg);
      let ty = llvm_type(arg_ty);
      param_types.push(ty);
      operands.push(format!("{} {}", ty, value));
    }

    let callee = if details.trait_call {
      // Trait calls go through the receiver's method table.
      let dispatch = self.hook("dispatch", "ptr", &["ptr", "ptr"]);
      let name = self.module.strings.intern(&format!("{}.{}", details.declaring_type, details.method_name));
      let receiver = operands.first().cloned().unwrap_or_else(|| "ptr null".to_string());
      let target = self.value();
      self.line(format!("{} = call ptr {}({}, ptr {})", target, dispatch, receiver, name));
      target
    } else {
      if !self.module.defines(&details.declaring_type, &details.method_name) {
        self.module.declare(&symbol, ret, &param_types);
      }
      symbol
    };

    let args = operands.join(", ");
    match &call.dest {
      Some(dest) if ret != "void" => {
        let result = self.value();
        self.line(format!("{} = call {} {}({})", result, ret, callee, args));
        self.write(dest, ret, &result);
      },
      _ => self.line(format!("call {} {}({})", ret, callee, args)),
    }
    Ok(())
  }

  fn lower_branch(
    &mut self,
    branch: &Branch,
  ) {
    match branch {
      Branch::Return { value: Some(v) } => {
        let (value, ty) = self.read(v);
        self.terminate(format!("ret {} {}", ty, value));
      },
      Branch::Return { value: None } => self.terminate("ret void"),
      Branch::Jump { target } => self.terminate(format!("br label %{}", target)),
      Branch::JumpIfTrue { condition, target } | Branch::JumpIfFalse { condition, target } => {
        let truth = self.truth(condition);
        let next = self.block("cont");
        let (taken, fallthrough) = match branch {
          Branch::JumpIfTrue { .. } => (target.as_str(), next.as_str()),
          _ => (next.as_str(), target.as_str()),
        };
        let text = format!("br i1 {}, label %{}, label %{}", truth, taken, fallthrough);
        self.terminate(text);
        let _ = writeln!(self.body, "{}:", next);
        self.terminated = false;
      },
    }
  }

  /// `i1` truth value of `condition`.
  fn truth(
    &mut self,
    condition: &str,
  ) -> String {
    let (value, ty) = self.read(condition);
    if ty == "i1" {
      return value;
    }
    let hook = self.hook("truth", "i1", &["ptr"]);
    let truth = self.value();
    self.line(format!("{} = call i1 {}(ptr {})", truth, hook, value));
    truth
  }

  fn finish(mut self) -> String {
    let method = self.method;
    if !self.terminated {
      if method.return_type.is_some() {
        self.terminate("unreachable");
      } else {
        self.terminate("ret void");
      }
    }

    let mut params: Vec<String> = Vec::new();
    if !method.is_static {
      params.push(format!("ptr %arg.{}", THIS));
    }
    for param in &method.params {
      params.push(format!("{} %arg.{}", llvm_type(&param.ty), param.name));
    }

    let ret = method.return_type.as_deref().map(llvm_type).unwrap_or("void");
    let symbol = quote(&format!("{}.{}", self.module.construct.name, method.name));

    let mut out = String::new();
    let _ = writeln!(out, "define {} @{}({}) {{", ret, symbol, params.join(", "));
    let _ = writeln!(out, "entry:");
    for variable in &self.slot_order {
      let _ = writeln!(out, "  %v.{} = alloca {}", variable, self.slots[variable]);
    }
    for scope in &self.scopes {
      let _ = writeln!(out, "  %scope.{} = alloca ptr", scope);
    }
    if !method.is_static {
      let _ = writeln!(out, "  store ptr %arg.{}, ptr %v.{}", THIS, THIS);
    }
    for param in &method.params {
      let _ = writeln!(out, "  store {} %arg.{}, ptr %v.{}", llvm_type(&param.ty), param.name, param.name);
    }
    out.push_str(&self.body);
    let _ = writeln!(out, "}}");
    out
  }
}
