use std::collections::HashSet;

use crate::{
  Branch, Call, CallDetails, DebugInfo, Instr, InstrKind, IrFault, IrMethod, IrParam, Memory, Scope, ScopeId,
  names::{SCOPE_PREFIX, TEMP_PREFIX},
  verify::verify_method,
};

/// Builder for one method body.
///
/// The stream is append-only. Temporaries, labels and scopes get names that
/// are unique within the method. Branches may target a label before it is
/// placed as long as the label was reserved first; `finish` rejects any
/// reservation that never got placed.
pub struct MethodBuilder {
  owner: String,
  name: String,
  params: Vec<IrParam>,
  return_type: Option<String>,
  is_static: bool,

  body: Vec<Instr>,

  /// Applied to every instruction emitted from now on.
  debug_info: Option<DebugInfo>,

  temp_counter: u32,
  label_counter: u32,
  scope_counter: u32,

  reserved: Vec<String>,
  placed: HashSet<String>,
  duplicates: Vec<String>,
}

impl MethodBuilder {
  pub fn new(
    owner: impl Into<String>,
    name: impl Into<String>,
  ) -> Self {
    Self {
      owner: owner.into(),
      name: name.into(),
      params: Vec::new(),
      return_type: None,
      is_static: false,
      body: Vec::new(),
      debug_info: None,
      temp_counter: 0,
      label_counter: 0,
      scope_counter: 0,
      reserved: Vec::new(),
      placed: HashSet::new(),
      duplicates: Vec::new(),
    }
  }

  pub fn with_param(
    mut self,
    name: impl Into<String>,
    ty: impl Into<String>,
  ) -> Self {
    self.params.push(IrParam {
      name: name.into(),
      ty: ty.into(),
    });
    self
  }

  pub fn with_return_type(
    mut self,
    ty: impl Into<String>,
  ) -> Self {
    self.return_type = Some(ty.into());
    self
  }

  pub fn as_static(mut self) -> Self {
    self.is_static = true;
    self
  }

  /// `Owner.method`, used in fault messages.
  pub fn qualified_name(&self) -> String {
    format!("{}.{}", self.owner, self.name)
  }

  pub fn return_type(&self) -> Option<&str> {
    self.return_type.as_deref()
  }

  pub fn set_debug_info(
    &mut self,
    debug_info: Option<DebugInfo>,
  ) {
    self.debug_info = debug_info;
  }

  pub fn debug_info(&self) -> Option<&DebugInfo> {
    self.debug_info.as_ref()
  }

  pub fn instructions(&self) -> &[Instr] {
    &self.body
  }

  // -- Names --

  pub fn new_temp(&mut self) -> String {
    self.temp_counter += 1;
    format!("{}{}", TEMP_PREFIX, self.temp_counter)
  }

  /// Reserve a unique label so branches can target it before it is placed.
  pub fn reserve_label(
    &mut self,
    prefix: &str,
  ) -> String {
    self.label_counter += 1;
    let label = format!("{}_{}", prefix, self.label_counter);
    self.reserved.push(label.clone());
    label
  }

  pub fn new_scope(&mut self) -> ScopeId {
    self.scope_counter += 1;
    ScopeId::new(format!("{}{}", SCOPE_PREFIX, self.scope_counter))
  }

  // -- Emission --

  pub fn emit(
    &mut self,
    kind: InstrKind,
  ) {
    self.body.push(Instr::new(kind).with_debug_info(self.debug_info.clone()));
  }

  /// Append instructions built elsewhere, keeping their own debug info.
  pub fn append(
    &mut self,
    instrs: impl IntoIterator<Item = Instr>,
  ) {
    self.body.extend(instrs);
  }

  pub fn place_label(
    &mut self,
    label: &str,
  ) {
    if !self.placed.insert(label.to_string()) {
      self.duplicates.push(label.to_string());
    }
    self.emit(InstrKind::Label(label.to_string()));
  }

  /// Open a fresh scope and return its id.
  pub fn enter_scope(&mut self) -> ScopeId {
    let scope = self.new_scope();
    self.emit(InstrKind::Scope(Scope::Enter(scope.clone())));
    scope
  }

  pub fn exit_scope(
    &mut self,
    scope: &ScopeId,
  ) {
    self.emit(InstrKind::Scope(Scope::Exit(scope.clone())));
  }

  pub fn register(
    &mut self,
    variable: &str,
    scope: &ScopeId,
  ) {
    self.emit(InstrKind::Scope(Scope::Register {
      variable: variable.to_string(),
      scope: scope.clone(),
    }));
  }

  pub fn retain(
    &mut self,
    variable: &str,
  ) {
    self.emit(InstrKind::Memory(Memory::Retain(variable.to_string())));
  }

  pub fn release(
    &mut self,
    variable: &str,
  ) {
    self.emit(InstrKind::Memory(Memory::Release(variable.to_string())));
  }

  pub fn store(
    &mut self,
    dest: &str,
    src: &str,
  ) {
    self.emit(InstrKind::Memory(Memory::Store {
      dest: dest.to_string(),
      src: src.to_string(),
    }));
  }

  pub fn reference(
    &mut self,
    variable: &str,
    ty: &str,
  ) {
    self.emit(InstrKind::Memory(Memory::Reference {
      variable: variable.to_string(),
      ty: ty.to_string(),
    }));
  }

  /// Load `source` (a variable or `receiver.field`) into a new temporary.
  pub fn load(
    &mut self,
    source: &str,
  ) -> String {
    let dest = self.new_temp();
    self.emit(InstrKind::Memory(Memory::Load {
      dest: dest.clone(),
      source: source.to_string(),
    }));
    dest
  }

  /// Literal into a new temporary.
  pub fn literal(
    &mut self,
    value: &str,
    ty: &str,
  ) -> String {
    let dest = self.new_temp();
    self.emit(InstrKind::Literal {
      dest: dest.clone(),
      value: value.to_string(),
      ty: ty.to_string(),
    });
    dest
  }

  /// Call whose result, if any, lands in a new temporary.
  pub fn call(
    &mut self,
    details: CallDetails,
    receiver: Option<&str>,
    arguments: Vec<String>,
  ) -> Option<String> {
    let dest = details.return_type.is_some().then(|| self.new_temp());
    self.emit(InstrKind::Call(Call {
      details,
      receiver: receiver.map(str::to_string),
      arguments,
      dest: dest.clone(),
    }));
    dest
  }

  /// Call, then retain the result and hand it to `scope`.
  pub fn call_owned(
    &mut self,
    details: CallDetails,
    receiver: Option<&str>,
    arguments: Vec<String>,
    scope: &ScopeId,
  ) -> Option<String> {
    let dest = self.call(details, receiver, arguments)?;
    self.retain(&dest);
    self.register(&dest, scope);
    Some(dest)
  }

  pub fn ret(
    &mut self,
    value: Option<&str>,
  ) {
    self.emit(InstrKind::Branch(Branch::Return {
      value: value.map(str::to_string),
    }));
  }

  pub fn jump(
    &mut self,
    target: &str,
  ) {
    self.emit(InstrKind::Branch(Branch::Jump {
      target: target.to_string(),
    }));
  }

  pub fn jump_if_true(
    &mut self,
    condition: &str,
    target: &str,
  ) {
    self.emit(InstrKind::Branch(Branch::JumpIfTrue {
      condition: condition.to_string(),
      target: target.to_string(),
    }));
  }

  pub fn jump_if_false(
    &mut self,
    condition: &str,
    target: &str,
  ) {
    self.emit(InstrKind::Branch(Branch::JumpIfFalse {
      condition: condition.to_string(),
      target: target.to_string(),
    }));
  }

  /// Freeze the body. Fails on labels placed twice or reserved and never placed.
  pub fn finish(self) -> Result<IrMethod, IrFault> {
    let method = self.qualified_name();

    if let Some(label) = self.duplicates.first() {
      return Err(IrFault::DuplicateLabel {
        method,
        label: label.clone(),
      });
    }

    if let Some(label) = self.reserved.iter().find(|l| !self.placed.contains(*l)) {
      return Err(IrFault::UnplacedLabel {
        method,
        label: label.clone(),
      });
    }

    Ok(IrMethod {
      name: self.name,
      params: self.params,
      return_type: self.return_type,
      is_static: self.is_static,
      body: self.body,
    })
  }

  /// [`finish`](Self::finish), then run the verifier over the frozen body.
  pub fn finish_verified(self) -> Result<IrMethod, IrFault> {
    let owner = self.owner.clone();
    let method = self.finish()?;

    verify_method(&owner, &method).map_err(|errors| IrFault::Verification {
      construct: owner,
      errors,
    })?;
    Ok(method)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names_are_unique_per_method() {
    let mut b = MethodBuilder::new("app::Point", "norm");

    assert_eq!(b.new_temp(), "_temp1");
    assert_eq!(b.new_temp(), "_temp2");
    assert_eq!(b.reserve_label("loop"), "loop_1");
    assert_eq!(b.reserve_label("loop"), "loop_2");
    assert_eq!(b.enter_scope(), ScopeId::new("s1"));
  }

  #[test]
  fn forward_branches_need_the_label_placed() {
    let mut b = MethodBuilder::new("app::Point", "norm");
    let end = b.reserve_label("end");
    b.jump(&end);

    let fault = b.finish().unwrap_err();
    assert_eq!(
      fault,
      IrFault::UnplacedLabel {
        method: "app::Point.norm".to_string(),
        label: "end_1".to_string(),
      }
    );
  }

  #[test]
  fn placing_a_label_twice_is_a_fault() {
    let mut b = MethodBuilder::new("app::Point", "norm");
    let end = b.reserve_label("end");
    b.place_label(&end);
    b.place_label(&end);

    assert!(matches!(b.finish(), Err(IrFault::DuplicateLabel { .. })));
  }

  #[test]
  fn debug_info_sticks_until_changed() {
    let mut b = MethodBuilder::new("app::Point", "norm");
    b.set_debug_info(Some(DebugInfo::new("point.kn", 4, 2)));
    b.retain("x");
    b.set_debug_info(None);
    b.retain("y");

    let body = b.finish().unwrap().body;
    assert_eq!(body[0].debug_info, Some(DebugInfo::new("point.kn", 4, 2)));
    assert_eq!(body[1].debug_info, None);
  }

  #[test]
  fn finish_verified_rejects_leaking_bodies() {
    let mut b = MethodBuilder::new("app::Point", "norm");
    let one = b.literal("1", "kiln.lang::Integer");
    b.retain(&one);
    b.ret(None);

    match b.finish_verified() {
      Err(IrFault::Verification { construct, errors }) => {
        assert_eq!(construct, "app::Point");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "app::Point.norm: '_temp1' is retained but never released");
      },
      other => panic!("expected a verification fault, got {:?}", other),
    }
  }

  #[test]
  fn finish_verified_passes_well_formed_bodies() {
    let mut b = MethodBuilder::new("app::Point", "norm");
    let scope = b.enter_scope();
    let one = b.literal("1", "kiln.lang::Integer");
    b.retain(&one);
    b.register(&one, &scope);
    b.exit_scope(&scope);
    b.ret(None);

    assert!(b.finish_verified().is_ok());
  }
}
