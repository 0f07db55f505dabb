use serde::{Deserialize, Serialize};

use crate::Instr;

/// Method a program construct must define to be runnable.
pub const ENTRY_METHOD: &str = "main";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstructKind {
  Class,
  Record,
  Trait,
  Function,
  /// Runnable program; one of the entries the generated main can select.
  Program,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrParam {
  pub name: String,
  pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrField {
  pub name: String,
  pub ty: String,
}

/// One instruction stream. Frozen once it leaves the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrMethod {
  pub name: String,
  #[serde(default)]
  pub params: Vec<IrParam>,
  #[serde(default)]
  pub return_type: Option<String>,
  /// No implicit `this`.
  #[serde(default)]
  pub is_static: bool,
  pub body: Vec<Instr>,
}

impl IrMethod {
  /// `static main()` with no parameters and no result.
  pub fn is_entry_signature(&self) -> bool {
    self.is_static && self.params.is_empty() && self.return_type.is_none()
  }

  pub fn is_parameter(
    &self,
    name: &str,
  ) -> bool {
    self.params.iter().any(|p| p.name == name)
  }
}

/// One compilable unit, lowered to one output artifact per architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrConstruct {
  /// Fully qualified, `module.path::Name`.
  pub name: String,
  pub kind: ConstructKind,
  #[serde(default)]
  pub supertype: Option<String>,
  #[serde(default)]
  pub traits: Vec<String>,
  #[serde(default)]
  pub fields: Vec<IrField>,
  #[serde(default)]
  pub methods: Vec<IrMethod>,
}

impl IrConstruct {
  pub fn new(
    name: impl Into<String>,
    kind: ConstructKind,
  ) -> Self {
    Self {
      name: name.into(),
      kind,
      supertype: None,
      traits: Vec::new(),
      fields: Vec::new(),
      methods: Vec::new(),
    }
  }

  pub fn with_field(
    mut self,
    name: impl Into<String>,
    ty: impl Into<String>,
  ) -> Self {
    self.fields.push(IrField {
      name: name.into(),
      ty: ty.into(),
    });
    self
  }

  pub fn with_method(
    mut self,
    method: IrMethod,
  ) -> Self {
    self.methods.push(method);
    self
  }

  /// `app.models` for `app.models::User`; empty for names without a module.
  pub fn module_path(&self) -> &str {
    self.name.rsplit_once("::").map(|(module, _)| module).unwrap_or("")
  }

  pub fn simple_name(&self) -> &str {
    self.name.rsplit_once("::").map(|(_, name)| name).unwrap_or(&self.name)
  }

  pub fn method(
    &self,
    name: &str,
  ) -> Option<&IrMethod> {
    self.methods.iter().find(|m| m.name == name)
  }

  pub fn is_entry(&self) -> bool {
    self.kind == ConstructKind::Program && self.method(ENTRY_METHOD).is_some_and(IrMethod::is_entry_signature)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrModule {
  pub name: String,
  #[serde(default)]
  pub constructs: Vec<IrConstruct>,
}

/// A runnable program the generated entry artifact can dispatch to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryPoint {
  /// Name used to pick the program at run time.
  pub name: String,
  pub construct: String,
}

/// The whole compiled unit handed to code generation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IrProgram {
  #[serde(default)]
  pub modules: Vec<IrModule>,
}

impl IrProgram {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_construct(
    &mut self,
    construct: IrConstruct,
  ) {
    let module = construct.module_path().to_string();
    match self.modules.iter_mut().find(|m| m.name == module) {
      Some(existing) => existing.constructs.push(construct),
      None => self.modules.push(IrModule {
        name: module,
        constructs: vec![construct],
      }),
    }
  }

  pub fn constructs(&self) -> impl Iterator<Item = &IrConstruct> {
    self.modules.iter().flat_map(|m| m.constructs.iter())
  }

  pub fn construct(
    &self,
    name: &str,
  ) -> Option<&IrConstruct> {
    self.constructs().find(|c| c.name == name)
  }

  pub fn construct_count(&self) -> usize {
    self.modules.iter().map(|m| m.constructs.len()).sum()
  }

  /// Every runnable program, in module order.
  pub fn entry_points(&self) -> Vec<EntryPoint> {
    self
      .constructs()
      .filter(|c| c.is_entry())
      .map(|c| EntryPoint {
        name: c.simple_name().to_string(),
        construct: c.name.clone(),
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn main_method() -> IrMethod {
    IrMethod {
      name: ENTRY_METHOD.to_string(),
      params: Vec::new(),
      return_type: None,
      is_static: true,
      body: Vec::new(),
    }
  }

  #[test]
  fn names_split_on_the_last_separator() {
    let construct = IrConstruct::new("app.models::User", ConstructKind::Class);
    assert_eq!(construct.module_path(), "app.models");
    assert_eq!(construct.simple_name(), "User");

    let bare = IrConstruct::new("Main", ConstructKind::Program);
    assert_eq!(bare.module_path(), "");
    assert_eq!(bare.simple_name(), "Main");
  }

  #[test]
  fn constructs_are_grouped_by_module() {
    let mut program = IrProgram::new();
    program.add_construct(IrConstruct::new("app::A", ConstructKind::Class));
    program.add_construct(IrConstruct::new("lib::B", ConstructKind::Class));
    program.add_construct(IrConstruct::new("app::C", ConstructKind::Class));

    assert_eq!(program.modules.len(), 2);
    assert_eq!(program.construct_count(), 3);
    assert!(program.construct("app::C").is_some());
  }

  #[test]
  fn only_programs_with_main_are_entries() {
    let mut program = IrProgram::new();
    program.add_construct(IrConstruct::new("app::Hello", ConstructKind::Program).with_method(main_method()));
    program.add_construct(IrConstruct::new("app::Draft", ConstructKind::Program));
    program.add_construct(IrConstruct::new("app::Tool", ConstructKind::Class).with_method(main_method()));

    let entries = program.entry_points();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "Hello");
    assert_eq!(entries[0].construct, "app::Hello");
  }

  #[test]
  fn main_must_be_static_without_parameters_or_result() {
    let instance = IrMethod {
      is_static: false,
      ..main_method()
    };
    let with_args = IrMethod {
      params: vec![IrParam {
        name: "args".to_string(),
        ty: "kiln.lang::String".to_string(),
      }],
      ..main_method()
    };
    let returning = IrMethod {
      return_type: Some("kiln.lang::Integer".to_string()),
      ..main_method()
    };

    for main in [instance, with_args, returning] {
      let construct = IrConstruct::new("app::Hello", ConstructKind::Program).with_method(main);
      assert!(!construct.is_entry());
    }
    assert!(IrConstruct::new("app::Hello", ConstructKind::Program).with_method(main_method()).is_entry());
  }
}
