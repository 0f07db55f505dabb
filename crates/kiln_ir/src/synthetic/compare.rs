use kiln_type::{SymbolGraph, TypeId, operators::COMPARE_OPERATOR};

use super::{ReturnPattern, Returns, Synthesis};
use crate::{
  DebugInfo, IrFault, IrMethod,
  names::{CMP, CONTINUE_CMP_LABEL, EQ, OTHER, RETURN_UNSET_LABEL, RETURN_ZERO_LABEL, SUPER, THIS},
};

/// `_cmp(other)` for an aggregate: the first non-zero comparison of the
/// supertype (when it has `<=>`) and then the fields, in declaration order.
///
/// Either operand unset, or any comparison coming back unset, yields an
/// unset `Integer`. All equal yields `0`.
pub fn generate_compare(
  graph: &SymbolGraph,
  ty: TypeId,
  debug_info: Option<DebugInfo>,
) -> Result<IrMethod, IrFault> {
  let mut synthesis = Synthesis::begin(graph, ty, CMP, true, Returns::Integer, debug_info)?;
  let core = synthesis.core;
  let integer = core.integer.as_str();

  let unset = synthesis.builder.reserve_label(RETURN_UNSET_LABEL);
  let all_equal = synthesis.builder.reserve_label(RETURN_ZERO_LABEL);

  synthesis.guard_operand(THIS, &unset);
  synthesis.guard_operand(OTHER, &unset);

  if let Some((super_name, declaring)) = synthesis.supertype_with(COMPARE_OPERATOR) {
    let order = synthesis.owned_call(SUPER, (super_name, declaring), CMP, Some((OTHER, super_name)), integer);
    return_if_decided(&mut synthesis, &order, &unset);
  }

  for field in synthesis.fields() {
    let declaring = synthesis.require_operator(field.ty, COMPARE_OPERATOR)?;
    let field_type = graph.type_name(field.ty);

    let mine = synthesis.load_field(THIS, &field.name);
    let theirs = synthesis.load_field(OTHER, &field.name);
    let order = synthesis.owned_call(&mine, (field_type, declaring), CMP, Some((&theirs, field_type)), integer);
    return_if_decided(&mut synthesis, &order, &unset);
  }

  synthesis.builder.jump(&all_equal);
  synthesis.return_block(&unset, ReturnPattern::Unset);
  synthesis.return_block(&all_equal, ReturnPattern::IntegerLiteral("0".to_string()));

  synthesis.finish()
}

/// Return `order` unless it is zero; branch to `unset` when it is unset.
fn return_if_decided(
  synthesis: &mut Synthesis<'_>,
  order: &str,
  unset: &str,
) {
  let core = synthesis.core;
  let (boolean, integer) = (core.boolean.as_str(), core.integer.as_str());

  synthesis.guard_is_set(order, (integer, integer), unset);

  let zero = synthesis.owned_literal("0", integer);
  let is_zero = synthesis.owned_call(order, (integer, integer), EQ, Some((&zero, integer)), boolean);
  let truth = synthesis.truth(&is_zero);

  let next = synthesis.builder.reserve_label(CONTINUE_CMP_LABEL);
  synthesis.builder.jump_if_true(&truth, &next);
  synthesis.set_return(order);
  synthesis.exit_and_return();
  synthesis.builder.place_label(&next);
}
