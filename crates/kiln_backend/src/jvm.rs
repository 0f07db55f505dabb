//! Jasmin-style assembly listings for the JVM target.
//!
//! The JVM collects garbage itself, so retain, release and scope
//! instructions survive only as comments. Every IR variable gets a local
//! slot; `boolean` values use the int instructions, everything else is a
//! reference.

use std::collections::HashMap;
use std::fmt::Write;

use kiln_config::TargetArchitecture;
use kiln_ir::{
  Branch, Call, ConstructKind, EntryPoint, InstrKind, IrConstruct, IrMethod, Memory, Scope,
  names::{CONSTRUCTOR, PRIMITIVE_BOOLEAN, SUPER, THIS, TRUE_METHOD},
};

use crate::{CodegenBackend, CompilerFault};

pub const JVM_EXTENSION: &str = "jasm";
const ROOT_CLASS: &str = "java/lang/Object";
const ENTRY_CLASS: &str = "KilnEntry";

pub struct JvmBackend;

impl CodegenBackend for JvmBackend {
  fn architecture(&self) -> TargetArchitecture {
    TargetArchitecture::Jvm
  }

  fn file_extension(&self) -> &'static str {
    JVM_EXTENSION
  }

  fn lower_construct(
    &self,
    construct: &IrConstruct,
  ) -> Result<String, CompilerFault> {
    let mut out = String::new();
    let _ = writeln!(out, "; kiln {} listing for {}", TargetArchitecture::Jvm, construct.name);

    let header = match construct.kind {
      ConstructKind::Trait => ".interface public abstract",
      _ => ".class public",
    };
    let _ = writeln!(out, "{} {}", header, internal_name(&construct.name));
    let supertype = construct.supertype.as_deref().map(internal_name);
    let _ = writeln!(out, ".super {}", supertype.as_deref().unwrap_or(ROOT_CLASS));
    for implemented in &construct.traits {
      let _ = writeln!(out, ".implements {}", internal_name(implemented));
    }

    if !construct.fields.is_empty() {
      let _ = writeln!(out);
    }
    for field in &construct.fields {
      let _ = writeln!(out, ".field public {} {}", field.name, descriptor(&field.ty));
    }

    for method in &construct.methods {
      let _ = writeln!(out);
      out.push_str(&MethodWriter::new(construct, method).write()?);
    }

    Ok(out)
  }

  fn lower_entry_point(
    &self,
    entries: &[EntryPoint],
  ) -> Result<String, CompilerFault> {
    if entries.is_empty() {
      return Err(CompilerFault::lowering(ENTRY_CLASS, "no program entry points"));
    }

    let mut out = String::new();
    let _ = writeln!(out, "; kiln {} entry", TargetArchitecture::Jvm);
    let _ = writeln!(out, ".class public {}", ENTRY_CLASS);
    let _ = writeln!(out, ".super {}", ROOT_CLASS);
    let _ = writeln!(out);
    let _ = writeln!(out, ".method public static main([Ljava/lang/String;)V");
    let _ = writeln!(out, "  .limit stack 3");
    let _ = writeln!(out, "  .limit locals 1");

    if let [only] = entries {
      let _ = writeln!(out, "  invokestatic {}/main()V", internal_name(&only.construct));
      let _ = writeln!(out, "  return");
      let _ = writeln!(out, ".end method");
      return Ok(out);
    }

    let _ = writeln!(out, "  aload_0");
    let _ = writeln!(out, "  arraylength");
    let _ = writeln!(out, "  ifeq usage");
    for (idx, entry) in entries.iter().enumerate() {
      let _ = writeln!(out, "  aload_0");
      let _ = writeln!(out, "  iconst_0");
      let _ = writeln!(out, "  aaload");
      let _ = writeln!(out, "  ldc \"{}\"", escape(&entry.name));
      let _ = writeln!(out, "  invokevirtual java/lang/String/equals(Ljava/lang/Object;)Z");
      let _ = writeln!(out, "  ifne run_{}", idx);
    }

    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    let _ = writeln!(out, "usage:");
    let _ = writeln!(out, "  getstatic java/lang/System/err Ljava/io/PrintStream;");
    let _ = writeln!(out, "  ldc \"choose a program: {}\"", escape(&names.join(", ")));
    let _ = writeln!(out, "  invokevirtual java/io/PrintStream/println(Ljava/lang/String;)V");
    let _ = writeln!(out, "  return");

    for (idx, entry) in entries.iter().enumerate() {
      let _ = writeln!(out, "run_{}:", idx);
      let _ = writeln!(out, "  invokestatic {}/main()V", internal_name(&entry.construct));
      let _ = writeln!(out, "  return");
    }
    let _ = writeln!(out, ".end method");

    Ok(out)
  }
}

/// `app.models::User` -> `app/models/User`.
pub fn internal_name(name: &str) -> String {
  name.replace("::", "/").replace('.', "/")
}

/// Field and method descriptor for one IR type name.
pub fn descriptor(ty: &str) -> String {
  if ty == PRIMITIVE_BOOLEAN {
    "Z".to_string()
  } else {
    format!("L{};", internal_name(ty))
  }
}

fn escape(text: &str) -> String {
  text.replace('\\', "\\\\").replace('"', "\\\"")
}

struct MethodWriter<'a> {
  construct: &'a IrConstruct,
  method: &'a IrMethod,
  slots: HashMap<String, usize>,
  /// IR type of each variable, where known.
  types: HashMap<String, String>,
  body: String,
  max_stack: usize,
}

impl<'a> MethodWriter<'a> {
  fn new(
    construct: &'a IrConstruct,
    method: &'a IrMethod,
  ) -> Self {
    let mut writer = Self {
      construct,
      method,
      slots: HashMap::new(),
      types: HashMap::new(),
      body: String::new(),
      max_stack: 1,
    };

    if !method.is_static {
      writer.slot(THIS);
      writer.types.insert(THIS.to_string(), construct.name.clone());
    }
    for param in &method.params {
      writer.slot(&param.name);
      writer.types.insert(param.name.clone(), param.ty.clone());
    }
    writer
  }

  fn write(mut self) -> Result<String, CompilerFault> {
    let method = self.method;
    for instr in &method.body {
      self.lower(&instr.kind)?;
    }

    let mut out = String::new();
    let params: String = method.params.iter().map(|p| descriptor(&p.ty)).collect();
    let ret = method.return_type.as_deref().map(descriptor).unwrap_or_else(|| "V".to_string());
    let modifiers = if method.is_static { "public static" } else { "public" };

    let _ = writeln!(out, ".method {} {}({}){}", modifiers, method.name, params, ret);
    let _ = writeln!(out, "  .limit stack {}", self.max_stack);
    let _ = writeln!(out, "  .limit locals {}", self.slots.len().max(1));
    out.push_str(&self.body);
    let _ = writeln!(out, ".end method");
    Ok(out)
  }

  fn slot(
    &mut self,
    variable: &str,
  ) -> usize {
    let next = self.slots.len();
    *self.slots.entry(variable.to_string()).or_insert(next)
  }

  fn is_primitive(
    &self,
    variable: &str,
  ) -> bool {
    self.types.get(variable).is_some_and(|ty| ty == PRIMITIVE_BOOLEAN)
  }

  fn line(
    &mut self,
    text: impl AsRef<str>,
  ) {
    let _ = writeln!(self.body, "  {}", text.as_ref());
  }

  fn push_var(
    &mut self,
    variable: &str,
  ) {
    // `super` is `this` seen through the parent class.
    let source = if variable == SUPER { THIS } else { variable };
    let slot = self.slot(source);
    let op = if self.is_primitive(source) { "iload" } else { "aload" };
    self.line(format!("{} {}", op, slot));
  }

  fn pop_into(
    &mut self,
    variable: &str,
    ty: Option<&str>,
  ) {
    if let Some(ty) = ty {
      self.types.insert(variable.to_string(), ty.to_string());
    }
    let slot = self.slot(variable);
    let op = if self.is_primitive(variable) { "istore" } else { "astore" };
    self.line(format!("{} {}", op, slot));
  }

  fn lower(
    &mut self,
    kind: &InstrKind,
  ) -> Result<(), CompilerFault> {
    match kind {
      InstrKind::Label(name) => {
        let _ = writeln!(self.body, "{}:", name);
      },
      InstrKind::Branch(branch) => self.lower_branch(branch),
      InstrKind::Call(call) => self.lower_call(call)?,
      InstrKind::Literal { dest, value, ty } => {
        self.line(format!("ldc \"{}\"", escape(value)));
        self.line(format!("invokestatic {}/_of(Ljava/lang/String;){}", internal_name(ty), descriptor(ty)));
        self.pop_into(dest, Some(ty));
      },
      InstrKind::Memory(memory) => self.lower_memory(memory),
      InstrKind::Scope(scope) => {
        let text = match scope {
          Scope::Enter(s) => format!("; enter {}", s),
          Scope::Register { variable, scope } => format!("; register {} in {}", variable, scope),
          Scope::Exit(s) => format!("; exit {}", s),
        };
        self.line(text);
      },
    }
    Ok(())
  }

  fn lower_memory(
    &mut self,
    memory: &Memory,
  ) {
    match memory {
      Memory::Retain(v) => self.line(format!("; retain {}", v)),
      Memory::Release(v) => self.line(format!("; release {}", v)),
      Memory::Store { dest, src } => {
        let ty = self.types.get(src).cloned();
        self.push_var(src);
        self.pop_into(dest, ty.as_deref());
      },
      Memory::Reference { variable, ty } => {
        self.types.insert(variable.clone(), ty.clone());
        if ty == PRIMITIVE_BOOLEAN {
          self.line("iconst_0");
        } else {
          self.line("aconst_null");
        }
        self.pop_into(variable, None);
      },
      Memory::Load { dest, source } => match source.split_once('.') {
        Some((receiver, field)) => {
          let owner = self.types.get(receiver).cloned();
          let field_ty = owner
            .as_deref()
            .filter(|owner| *owner == self.construct.name)
            .and_then(|_| self.construct.fields.iter().find(|f| f.name == field))
            .map(|f| f.ty.clone());

          self.push_var(receiver);
          self.line(format!(
            "getfield {}/{} {}",
            owner.as_deref().map(internal_name).unwrap_or_else(|| ROOT_CLASS.to_string()),
            field,
            field_ty.as_deref().map(descriptor).unwrap_or_else(|| format!("L{};", ROOT_CLASS))
          ));
          self.pop_into(dest, field_ty.as_deref());
        },
        None => {
          let ty = self.types.get(source).cloned();
          self.push_var(source);
          self.pop_into(dest, ty.as_deref());
        },
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
        &self.construct.name,
        format!("{} expects {} arguments, got {}", details.method_name, details.argument_types.len(), call.arguments.len()),
      ));
    }

    let owner = internal_name(&details.declaring_type);
    let args: String = details.argument_types.iter().map(|t| descriptor(t)).collect();
    let ret = details.return_type.as_deref().map(descriptor).unwrap_or_else(|| "V".to_string());

    // `Type.<init>()` without a receiver allocates.
    if details.method_name == CONSTRUCTOR && call.receiver.is_none() {
      self.line(format!("new {}", owner));
      self.line("dup");
      for arg in &call.arguments {
        self.push_var(arg);
      }
      self.line(format!("invokespecial {}/<init>({})V", owner, args));
      self.max_stack = self.max_stack.max(2 + call.arguments.len());
      if let Some(dest) = &call.dest {
        self.pop_into(dest, details.return_type.as_deref());
      }
      return Ok(());
    }

    if let Some(receiver) = &call.receiver {
      self.push_var(receiver);
    }
    for arg in &call.arguments {
      self.push_var(arg);
    }

    let invoke = match call.receiver.as_deref() {
      None => format!("invokestatic {}/{}({}){}", owner, details.method_name, args, ret),
      Some(SUPER) => format!("invokespecial {}/{}({}){}", owner, details.method_name, args, ret),
      Some(_) if details.trait_call => format!(
        "invokeinterface {}/{}({}){} {}",
        owner,
        details.method_name,
        args,
        ret,
        call.arguments.len() + 1
      ),
      Some(_) => format!("invokevirtual {}/{}({}){}", owner, details.method_name, args, ret),
    };
    self.line(invoke);
    self.max_stack = self.max_stack.max(call.arguments.len() + usize::from(call.receiver.is_some()));

    match (&call.dest, &details.return_type) {
      (Some(dest), ty) => self.pop_into(dest, ty.as_deref()),
      (None, Some(_)) => self.line("pop"),
      (None, None) => {},
    }
    Ok(())
  }

  fn lower_branch(
    &mut self,
    branch: &Branch,
  ) {
    match branch {
      Branch::Return { value: Some(v) } => {
        self.push_var(v);
        let op = if self.is_primitive(v) { "ireturn" } else { "areturn" };
        self.line(op);
      },
      Branch::Return { value: None } => self.line("return"),
      Branch::Jump { target } => self.line(format!("goto {}", target)),
      Branch::JumpIfTrue { condition, target } => {
        self.push_truth(condition);
        self.line(format!("ifne {}", target));
      },
      Branch::JumpIfFalse { condition, target } => {
        self.push_truth(condition);
        self.line(format!("ifeq {}", target));
      },
    }
  }

  /// Leave the condition's primitive truth value on the stack.
  fn push_truth(
    &mut self,
    condition: &str,
  ) {
    self.push_var(condition);
    if !self.is_primitive(condition) {
      let owner = self.types.get(condition).map(|t| internal_name(t)).unwrap_or_else(|| ROOT_CLASS.to_string());
      self.line(format!("invokevirtual {}/{}()Z", owner, TRUE_METHOD));
    }
  }
}
