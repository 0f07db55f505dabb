use kiln_type::{SymbolGraph, TypeId, operators::EQUALS_OPERATOR};

use super::{ReturnPattern, Returns, Synthesis};
use crate::{
  DebugInfo, IrFault, IrMethod,
  names::{EQ, NEQ, OTHER, RETURN_FALSE_LABEL, RETURN_TRUE_LABEL, RETURN_UNSET_LABEL, SUPER, THIS},
};

/// `_eq(other)` for an aggregate.
///
/// Either operand unset yields an unset `Boolean`. Otherwise the supertype
/// (when it has `==`) and then every field are compared in declaration order,
/// stopping at the first difference. A field comparison that comes back unset
/// makes the whole result unset.
pub fn generate_equals(
  graph: &SymbolGraph,
  ty: TypeId,
  debug_info: Option<DebugInfo>,
) -> Result<IrMethod, IrFault> {
  let mut synthesis = Synthesis::begin(graph, ty, EQ, true, Returns::Boolean, debug_info)?;
  let core = synthesis.core;
  let boolean = core.boolean.as_str();

  let unset = synthesis.builder.reserve_label(RETURN_UNSET_LABEL);
  let not_equal = synthesis.builder.reserve_label(RETURN_FALSE_LABEL);
  let equal = synthesis.builder.reserve_label(RETURN_TRUE_LABEL);

  synthesis.guard_operand(THIS, &unset);
  synthesis.guard_operand(OTHER, &unset);

  if let Some((super_name, declaring)) = synthesis.supertype_with(EQUALS_OPERATOR) {
    let same = synthesis.owned_call(SUPER, (super_name, declaring), EQ, Some((OTHER, super_name)), boolean);
    require_true(&mut synthesis, &same, &unset, &not_equal);
  }

  for field in synthesis.fields() {
    let declaring = synthesis.require_operator(field.ty, EQUALS_OPERATOR)?;
    let field_type = graph.type_name(field.ty);

    let mine = synthesis.load_field(THIS, &field.name);
    let theirs = synthesis.load_field(OTHER, &field.name);
    let same = synthesis.owned_call(&mine, (field_type, declaring), EQ, Some((&theirs, field_type)), boolean);
    require_true(&mut synthesis, &same, &unset, &not_equal);
  }

  synthesis.builder.jump(&equal);
  synthesis.return_block(&unset, ReturnPattern::Unset);
  synthesis.return_block(&not_equal, ReturnPattern::Boolean(false));
  synthesis.return_block(&equal, ReturnPattern::Boolean(true));

  synthesis.finish()
}

/// `_neq(other)` as the negation of the type's own `==`, unset when that is.
pub fn generate_not_equals(
  graph: &SymbolGraph,
  ty: TypeId,
  debug_info: Option<DebugInfo>,
) -> Result<IrMethod, IrFault> {
  let mut synthesis = Synthesis::begin(graph, ty, NEQ, true, Returns::Boolean, debug_info)?;
  let core = synthesis.core;
  let boolean = core.boolean.as_str();
  let name = synthesis.name();
  let declaring = synthesis.require_operator(ty, EQUALS_OPERATOR)?;

  let unset = synthesis.builder.reserve_label(RETURN_UNSET_LABEL);
  let different = synthesis.builder.reserve_label(RETURN_FALSE_LABEL);
  let same = synthesis.builder.reserve_label(RETURN_TRUE_LABEL);

  let equal = synthesis.owned_call(THIS, (name, declaring), EQ, Some((OTHER, name)), boolean);
  synthesis.guard_is_set(&equal, (boolean, boolean), &unset);
  let truth = synthesis.truth(&equal);
  synthesis.builder.jump_if_true(&truth, &different);
  synthesis.builder.jump(&same);

  synthesis.return_block(&unset, ReturnPattern::Unset);
  synthesis.return_block(&different, ReturnPattern::Boolean(false));
  synthesis.return_block(&same, ReturnPattern::Boolean(true));

  synthesis.finish()
}

/// Branch to `unset` when `result` is unset, to `not_equal` when it is false.
fn require_true(
  synthesis: &mut Synthesis<'_>,
  result: &str,
  unset: &str,
  not_equal: &str,
) {
  let core = synthesis.core;
  let boolean = core.boolean.as_str();
  synthesis.guard_is_set(result, (boolean, boolean), unset);
  let truth = synthesis.truth(result);
  synthesis.builder.jump_if_false(&truth, not_equal);
}
