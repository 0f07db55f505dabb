//! Canonical instruction sequences for behaviour no source code spells out.
//!
//! Every return block ends with `exit <scope>` then `return <var>`. The
//! constructing patterns retain the fresh value, hand it to the scope, store
//! it into the return variable and retain that variable a second time: the
//! scope and the caller each own one reference.
//!
//! Generated bodies go through the verifier before they are handed out.

mod compare;
mod equality;
mod hash;
mod is_set;

use kiln_type::{
  CoreTypeNames, Field, SymbolGraph, TypeId,
  operators::{COMPARE_OPERATOR, EQUALS_OPERATOR, HASH_CODE_OPERATOR, IS_SET_OPERATOR, NOT_EQUALS_OPERATOR},
};

pub use compare::generate_compare;
pub use equality::{generate_equals, generate_not_equals};
pub use hash::{FIELD_STATUS_LIMIT, generate_field_set_status, generate_hash_code};
pub use is_set::generate_is_set;

use crate::{
  Call, CallDetails, CallMetaData, DebugInfo, InstrKind, IrFault, IrMethod, MethodBuilder, ScopeId,
  names::{CONSTRUCTOR, FALSE_FACTORY, IS_SET, OTHER, PRIMITIVE_BOOLEAN, RETURN_VAR, TRUE_FACTORY, TRUE_METHOD},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnPattern {
  /// `Boolean._ofTrue()` / `Boolean._ofFalse()`.
  Boolean(bool),
  /// Literal of the declared return type.
  IntegerLiteral(String),
  /// Default constructor of the return type.
  Unset,
  /// Return variable already holds the result.
  Value,
}

/// Where a return block goes and what it returns.
#[derive(Debug, Clone)]
pub struct ReturnBlock<'a> {
  /// Must already be reserved in the builder if anything branches to it.
  pub label: &'a str,
  pub scope: &'a ScopeId,
  pub return_var: &'a str,
  pub return_type: &'a str,
  pub debug_info: Option<DebugInfo>,
}

pub fn emit_return_block(
  builder: &mut MethodBuilder,
  core: &CoreTypeNames,
  block: &ReturnBlock<'_>,
  pattern: &ReturnPattern,
) {
  let previous = builder.debug_info().cloned();
  builder.set_debug_info(block.debug_info.clone());

  builder.place_label(block.label);

  let produced = match pattern {
    ReturnPattern::Boolean(value) => {
      let factory = if *value { TRUE_FACTORY } else { FALSE_FACTORY };
      Some(emit_factory_call(builder, None, &core.boolean, factory))
    },
    ReturnPattern::IntegerLiteral(value) => Some(builder.literal(value, block.return_type)),
    ReturnPattern::Unset => Some(emit_factory_call(
      builder,
      Some(block.return_type),
      block.return_type,
      CONSTRUCTOR,
    )),
    ReturnPattern::Value => None,
  };

  if let Some(temp) = produced {
    builder.retain(&temp);
    builder.register(&temp, block.scope);
    builder.store(block.return_var, &temp);
    builder.retain(block.return_var);
  }

  builder.exit_scope(block.scope);
  builder.ret(Some(block.return_var));

  builder.set_debug_info(previous);
}

/// No-argument call producing an instance of `declaring_type`.
fn emit_factory_call(
  builder: &mut MethodBuilder,
  target_type: Option<&str>,
  declaring_type: &str,
  method_name: &str,
) -> String {
  let dest = builder.new_temp();
  builder.emit(InstrKind::Call(Call {
    details: CallDetails {
      target_type: target_type.map(str::to_string),
      declaring_type: declaring_type.to_string(),
      method_name: method_name.to_string(),
      argument_types: Vec::new(),
      return_type: Some(declaring_type.to_string()),
      metadata: CallMetaData::default(),
      trait_call: false,
    },
    receiver: None,
    arguments: Vec::new(),
    dest: Some(dest.clone()),
  }));
  dest
}

/// Synthesize the body of `operator` for the aggregate `ty`.
pub fn generate_operator(
  graph: &SymbolGraph,
  ty: TypeId,
  operator: &str,
  debug_info: Option<DebugInfo>,
) -> Result<IrMethod, IrFault> {
  match operator {
    IS_SET_OPERATOR => generate_is_set(graph, ty, debug_info),
    EQUALS_OPERATOR => generate_equals(graph, ty, debug_info),
    NOT_EQUALS_OPERATOR => generate_not_equals(graph, ty, debug_info),
    COMPARE_OPERATOR => generate_compare(graph, ty, debug_info),
    HASH_CODE_OPERATOR => generate_hash_code(graph, ty, debug_info),
    _ => Err(IrFault::NotSynthesizable {
      ty: graph.type_name(ty).to_string(),
      operator: operator.to_string(),
    }),
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Returns {
  Boolean,
  Integer,
}

/// One synthetic body under construction. `begin` opens the method scope and
/// declares `_ret`; every owned temporary is registered to that scope.
struct Synthesis<'g> {
  graph: &'g SymbolGraph,
  core: &'g CoreTypeNames,
  ty: TypeId,
  builder: MethodBuilder,
  scope: ScopeId,
  return_type: String,
  debug_info: Option<DebugInfo>,
}

impl<'g> Synthesis<'g> {
  fn begin(
    graph: &'g SymbolGraph,
    ty: TypeId,
    method_name: &str,
    binary: bool,
    returns: Returns,
    debug_info: Option<DebugInfo>,
  ) -> Result<Self, IrFault> {
    let core = graph.core_types();
    require_type(graph, &core.boolean)?;
    let return_type = match returns {
      Returns::Boolean => core.boolean.clone(),
      Returns::Integer => {
        require_type(graph, &core.integer)?;
        core.integer.clone()
      },
    };

    let name = graph.type_name(ty);
    let mut builder = MethodBuilder::new(name, method_name).with_return_type(&return_type);
    if binary {
      builder = builder.with_param(OTHER, name);
    }
    builder.set_debug_info(debug_info.clone());

    let scope = builder.enter_scope();
    builder.reference(RETURN_VAR, &return_type);

    Ok(Self {
      graph,
      core,
      ty,
      builder,
      scope,
      return_type,
      debug_info,
    })
  }

  fn name(&self) -> &'g str {
    let graph = self.graph;
    graph.type_name(self.ty)
  }

  fn fields(&self) -> &'g [Field] {
    let graph = self.graph;
    &graph.ty(self.ty).fields
  }

  /// Name of the type declaring `symbol` for `ty`, which may be an ancestor.
  fn operator_owner(
    &self,
    ty: TypeId,
    symbol: &str,
  ) -> Option<&'g str> {
    let graph = self.graph;
    let method = graph.resolve_operator(ty, symbol)?;
    let owner = graph.method(method).owner.unwrap_or(ty);
    Some(graph.type_name(owner))
  }

  fn require_operator(
    &self,
    ty: TypeId,
    symbol: &str,
  ) -> Result<&'g str, IrFault> {
    self.operator_owner(ty, symbol).ok_or_else(|| IrFault::MissingOperator {
      ty: self.graph.type_name(ty).to_string(),
      operator: symbol.to_string(),
    })
  }

  /// Supertype name and the type declaring `symbol` for it.
  fn supertype_with(
    &self,
    symbol: &str,
  ) -> Option<(&'g str, &'g str)> {
    let supertype = self.graph.ty(self.ty).supertype?;
    let declaring = self.operator_owner(supertype, symbol)?;
    Some((self.graph.type_name(supertype), declaring))
  }

  /// `receiver.method(argument)` into a fresh temporary.
  fn call(
    &mut self,
    receiver: &str,
    (target_type, declaring_type): (&str, &str),
    method_name: &str,
    argument: Option<(&str, &str)>,
    return_type: &str,
  ) -> String {
    let (arguments, argument_types) = match argument {
      Some((value, ty)) => (vec![value.to_string()], vec![ty.to_string()]),
      None => (Vec::new(), Vec::new()),
    };

    let dest = self.builder.new_temp();
    self.builder.emit(InstrKind::Call(Call {
      details: CallDetails {
        target_type: Some(target_type.to_string()),
        declaring_type: declaring_type.to_string(),
        method_name: method_name.to_string(),
        argument_types,
        return_type: Some(return_type.to_string()),
        metadata: CallMetaData {
          pure: true,
          ..CallMetaData::default()
        },
        trait_call: false,
      },
      receiver: Some(receiver.to_string()),
      arguments,
      dest: Some(dest.clone()),
    }));
    dest
  }

  /// [`call`](Self::call) with the result owned by the method scope.
  fn owned_call(
    &mut self,
    receiver: &str,
    target: (&str, &str),
    method_name: &str,
    argument: Option<(&str, &str)>,
    return_type: &str,
  ) -> String {
    let dest = self.call(receiver, target, method_name, argument, return_type);
    self.own(&dest);
    dest
  }

  fn owned_literal(
    &mut self,
    value: &str,
    ty: &str,
  ) -> String {
    let dest = self.builder.literal(value, ty);
    self.own(&dest);
    dest
  }

  fn own(
    &mut self,
    value: &str,
  ) {
    self.builder.retain(value);
    self.builder.register(value, &self.scope);
  }

  /// Primitive truth of a `Boolean` object. Lives on the stack, nothing to retain.
  fn truth(
    &mut self,
    boolean: &str,
  ) -> String {
    let core = self.core;
    self.call(boolean, (&core.boolean, &core.boolean), TRUE_METHOD, None, PRIMITIVE_BOOLEAN)
  }

  /// `receiver._isSet()` owned by the scope, then its primitive truth.
  fn is_set_test(
    &mut self,
    receiver: &str,
    target: (&str, &str),
  ) -> String {
    let core = self.core;
    let is_set = self.owned_call(receiver, target, IS_SET, None, &core.boolean);
    self.truth(&is_set)
  }

  fn guard_is_set(
    &mut self,
    receiver: &str,
    target: (&str, &str),
    unset: &str,
  ) {
    let truth = self.is_set_test(receiver, target);
    self.builder.jump_if_false(&truth, unset);
  }

  /// Branch to `unset` unless `receiver`, an instance of the aggregate, is set.
  fn guard_operand(
    &mut self,
    receiver: &str,
    unset: &str,
  ) {
    let name = self.name();
    let declaring = self.operator_owner(self.ty, IS_SET_OPERATOR).unwrap_or(name);
    self.guard_is_set(receiver, (name, declaring), unset);
  }

  fn load_field(
    &mut self,
    receiver: &str,
    field: &str,
  ) -> String {
    self.builder.load(&format!("{}.{}", receiver, field))
  }

  /// `_ret = value`, with the caller's reference taken.
  fn set_return(
    &mut self,
    value: &str,
  ) {
    self.builder.store(RETURN_VAR, value);
    self.builder.retain(RETURN_VAR);
  }

  /// Drop the caller's reference to the current `_ret`, then [`set_return`](Self::set_return).
  fn replace_return(
    &mut self,
    value: &str,
  ) {
    self.builder.release(RETURN_VAR);
    self.set_return(value);
  }

  fn exit_and_return(&mut self) {
    self.builder.exit_scope(&self.scope);
    self.builder.ret(Some(RETURN_VAR));
  }

  fn return_block(
    &mut self,
    label: &str,
    pattern: ReturnPattern,
  ) {
    let block = ReturnBlock {
      label,
      scope: &self.scope,
      return_var: RETURN_VAR,
      return_type: &self.return_type,
      debug_info: self.debug_info.clone(),
    };
    emit_return_block(&mut self.builder, self.core, &block, &pattern);
  }

  fn finish(self) -> Result<IrMethod, IrFault> {
    self.builder.finish_verified()
  }
}

fn require_type(
  graph: &SymbolGraph,
  name: &str,
) -> Result<(), IrFault> {
  match graph.type_by_name(name) {
    Some(_) => Ok(()),
    None => Err(IrFault::MissingType { name: name.to_string() }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{Memory, Scope, names::RETURN_TRUE_LABEL};

  fn boolean_block(value: bool) -> Vec<InstrKind> {
    let core = CoreTypeNames::default();
    let mut builder = MethodBuilder::new("app::Flag", "check").with_return_type(&core.boolean);
    let scope = ScopeId::new("s1");
    let label = builder.reserve_label(RETURN_TRUE_LABEL);

    let block = ReturnBlock {
      label: &label,
      scope: &scope,
      return_var: RETURN_VAR,
      return_type: &core.boolean,
      debug_info: None,
    };
    emit_return_block(&mut builder, &core, &block, &ReturnPattern::Boolean(value));

    builder.instructions().iter().map(|i| i.kind.clone()).collect()
  }

  #[test]
  fn boolean_return_follows_the_canonical_order() {
    let kinds = boolean_block(true);
    let s1 = ScopeId::new("s1");

    assert_eq!(kinds.len(), 8);
    assert_eq!(kinds[0], InstrKind::Label("return_true_1".to_string()));
    match &kinds[1] {
      InstrKind::Call(call) => {
        assert_eq!(call.details.method_name, TRUE_FACTORY);
        assert!(call.details.is_static());
        assert_eq!(call.dest.as_deref(), Some("_temp1"));
      },
      other => panic!("expected factory call, got {:?}", other),
    }
    assert_eq!(kinds[2], InstrKind::Memory(Memory::Retain("_temp1".to_string())));
    assert_eq!(
      kinds[3],
      InstrKind::Scope(Scope::Register {
        variable: "_temp1".to_string(),
        scope: s1.clone(),
      })
    );
    assert_eq!(
      kinds[4],
      InstrKind::Memory(Memory::Store {
        dest: RETURN_VAR.to_string(),
        src: "_temp1".to_string(),
      })
    );
    assert_eq!(kinds[5], InstrKind::Memory(Memory::Retain(RETURN_VAR.to_string())));
    assert_eq!(kinds[6], InstrKind::Scope(Scope::Exit(s1)));
    assert_eq!(
      kinds[7],
      InstrKind::Branch(crate::Branch::Return {
        value: Some(RETURN_VAR.to_string()),
      })
    );
  }

  #[test]
  fn value_return_only_exits_and_returns() {
    let core = CoreTypeNames::default();
    let mut builder = MethodBuilder::new("app::Flag", "get");
    let scope = ScopeId::new("s1");

    let block = ReturnBlock {
      label: "done",
      scope: &scope,
      return_var: "result",
      return_type: &core.integer,
      debug_info: None,
    };
    emit_return_block(&mut builder, &core, &block, &ReturnPattern::Value);

    let printed: Vec<String> = builder.instructions().iter().map(|i| i.to_string()).collect();
    assert_eq!(printed, vec!["done:", "exit s1", "return result"]);
  }

  #[test]
  fn integer_and_unset_returns_construct_the_declared_type() {
    let core = CoreTypeNames::default();
    let mut builder = MethodBuilder::new("app::Counter", "zero");
    let scope = ScopeId::new("s1");
    let block = ReturnBlock {
      label: "zero",
      scope: &scope,
      return_var: RETURN_VAR,
      return_type: &core.integer,
      debug_info: None,
    };
    emit_return_block(&mut builder, &core, &block, &ReturnPattern::IntegerLiteral("0".to_string()));
    emit_return_block(
      &mut builder,
      &core,
      &ReturnBlock { label: "unset", ..block },
      &ReturnPattern::Unset,
    );

    let printed: Vec<String> = builder.instructions().iter().map(|i| i.to_string()).collect();
    assert_eq!(printed[1], "_temp1 = literal 0 : kiln.lang::Integer");
    assert_eq!(printed[9], "_temp2 = call kiln.lang::Integer.<init>() : kiln.lang::Integer");
    assert_eq!(printed[15], "return _ret");
  }

  #[test]
  fn debug_info_is_restored_after_the_block() {
    let core = CoreTypeNames::default();
    let mut builder = MethodBuilder::new("app::Flag", "check");
    let outer = Some(DebugInfo::new("flag.kn", 10, 1));
    builder.set_debug_info(outer.clone());

    let scope = ScopeId::new("s1");
    let block = ReturnBlock {
      label: "done",
      scope: &scope,
      return_var: RETURN_VAR,
      return_type: &core.boolean,
      debug_info: Some(DebugInfo::new("flag.kn", 12, 5)),
    };
    emit_return_block(&mut builder, &core, &block, &ReturnPattern::Value);

    assert_eq!(builder.instructions()[0].debug_info, Some(DebugInfo::new("flag.kn", 12, 5)));
    assert_eq!(builder.debug_info(), outer.as_ref());
  }
}
