use std::fmt::{self, Write};

use crate::{Branch, Call, ConstructKind, Instr, InstrKind, IrConstruct, IrMethod, IrProgram, Memory, Scope};

impl fmt::Display for Instr {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match &self.kind {
      InstrKind::Label(name) => write!(f, "{}:", name),
      InstrKind::Branch(branch) => write!(f, "{}", branch),
      InstrKind::Call(call) => write!(f, "{}", call),
      InstrKind::Literal { dest, value, ty } => write!(f, "{} = literal {} : {}", dest, value, ty),
      InstrKind::Memory(memory) => match memory {
        Memory::Retain(v) => write!(f, "retain {}", v),
        Memory::Release(v) => write!(f, "release {}", v),
        Memory::Store { dest, src } => write!(f, "store {} <- {}", dest, src),
        Memory::Reference { variable, ty } => write!(f, "ref {} : {}", variable, ty),
        Memory::Load { dest, source } => write!(f, "{} = load {}", dest, source),
      },
      InstrKind::Scope(scope) => match scope {
        Scope::Enter(s) => write!(f, "enter {}", s),
        Scope::Register { variable, scope } => write!(f, "register {} in {}", variable, scope),
        Scope::Exit(s) => write!(f, "exit {}", s),
      },
    }
  }
}

impl fmt::Display for Branch {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Branch::Return { value: Some(v) } => write!(f, "return {}", v),
      Branch::Return { value: None } => write!(f, "return"),
      Branch::Jump { target } => write!(f, "jump {}", target),
      Branch::JumpIfTrue { condition, target } => write!(f, "jump_if_true {}, {}", condition, target),
      Branch::JumpIfFalse { condition, target } => write!(f, "jump_if_false {}, {}", condition, target),
    }
  }
}

impl fmt::Display for Call {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    if let Some(dest) = &self.dest {
      write!(f, "{} = ", dest)?;
    }

    f.write_str("call ")?;
    if self.details.trait_call {
      f.write_str("dyn ")?;
    }
    if let Some(receiver) = &self.receiver {
      write!(f, "{}->", receiver)?;
    }
    // Free functions outside any module have no declaring type.
    if !self.details.declaring_type.is_empty() {
      write!(f, "{}.", self.details.declaring_type)?;
    }
    write!(f, "{}({})", self.details.method_name, self.arguments.join(", "))?;

    if let Some(ret) = &self.details.return_type {
      write!(f, " : {}", ret)?;
    }
    Ok(())
  }
}

fn kind_keyword(kind: ConstructKind) -> &'static str {
  match kind {
    ConstructKind::Class => "class",
    ConstructKind::Record => "record",
    ConstructKind::Trait => "trait",
    ConstructKind::Function => "function",
    ConstructKind::Program => "program",
  }
}

/// Pretty printer for IR dumps.
pub struct IrPrinter {
  output: String,
  show_debug_info: bool,
}

impl IrPrinter {
  pub fn new() -> Self {
    Self {
      output: String::new(),
      show_debug_info: false,
    }
  }

  /// Append `; file:line:col` to instructions that carry a location.
  pub fn with_debug_info(mut self) -> Self {
    self.show_debug_info = true;
    self
  }

  pub fn print_program(
    mut self,
    program: &IrProgram,
  ) -> String {
    for module in &program.modules {
      let _ = writeln!(self.output, "// module {}", module.name);
      for construct in &module.constructs {
        self.write_construct(construct);
        let _ = writeln!(self.output);
      }
    }
    self.output
  }

  pub fn print_construct(
    mut self,
    construct: &IrConstruct,
  ) -> String {
    self.write_construct(construct);
    self.output
  }

  pub fn print_method(
    mut self,
    method: &IrMethod,
  ) -> String {
    self.write_method(method, 0);
    self.output
  }

  fn write_construct(
    &mut self,
    construct: &IrConstruct,
  ) {
    let _ = write!(self.output, "{} {}", kind_keyword(construct.kind), construct.name);
    if let Some(supertype) = &construct.supertype {
      let _ = write!(self.output, " extends {}", supertype);
    }
    if !construct.traits.is_empty() {
      let _ = write!(self.output, " implements {}", construct.traits.join(", "));
    }
    let _ = writeln!(self.output, " {{");

    for field in &construct.fields {
      let _ = writeln!(self.output, "  field {}: {}", field.name, field.ty);
    }

    for (idx, method) in construct.methods.iter().enumerate() {
      if idx > 0 || !construct.fields.is_empty() {
        let _ = writeln!(self.output);
      }
      self.write_method(method, 2);
    }

    let _ = writeln!(self.output, "}}");
  }

  fn write_method(
    &mut self,
    method: &IrMethod,
    indent: usize,
  ) {
    let params: Vec<String> = method.params.iter().map(|p| format!("{}: {}", p.name, p.ty)).collect();
    let prefix = if method.is_static { "static method" } else { "method" };

    let _ = write!(self.output, "{:indent$}{} {}({})", "", prefix, method.name, params.join(", "), indent = indent);
    if let Some(ret) = &method.return_type {
      let _ = write!(self.output, ": {}", ret);
    }
    let _ = writeln!(self.output, " {{");

    for instr in &method.body {
      // Labels sit one level left of the instructions they name.
      let depth = if instr.label_name().is_some() { indent } else { indent + 2 };
      let _ = write!(self.output, "{:depth$}{}", "", instr, depth = depth);

      if self.show_debug_info {
        if let Some(info) = &instr.debug_info {
          let _ = write!(self.output, "  ; {}:{}:{}", info.source_file, info.line, info.column);
        }
      }
      let _ = writeln!(self.output);
    }

    let _ = writeln!(self.output, "{:indent$}}}", "", indent = indent);
  }
}

impl Default for IrPrinter {
  fn default() -> Self {
    Self::new()
  }
}

pub fn print_program(program: &IrProgram) -> String {
  IrPrinter::new().print_program(program)
}

pub fn print_construct(construct: &IrConstruct) -> String {
  IrPrinter::new().print_construct(construct)
}
