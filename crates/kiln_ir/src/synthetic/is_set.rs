use kiln_type::{SymbolGraph, TypeId, operators::IS_SET_OPERATOR};

use super::{ReturnPattern, Returns, Synthesis};
use crate::{
  DebugInfo, IrFault, IrMethod,
  names::{IS_SET, RETURN_FALSE_LABEL, RETURN_TRUE_LABEL, SUPER, THIS},
};

/// `_isSet()` for an aggregate: true as soon as the supertype or any field
/// that has a `?` operator is set.
///
/// Fields whose type has no `?` operator are skipped. Every instruction
/// carries `debug_info`.
pub fn generate_is_set(
  graph: &SymbolGraph,
  ty: TypeId,
  debug_info: Option<DebugInfo>,
) -> Result<IrMethod, IrFault> {
  let mut synthesis = Synthesis::begin(graph, ty, IS_SET, false, Returns::Boolean, debug_info)?;

  let return_false = synthesis.builder.reserve_label(RETURN_FALSE_LABEL);
  let return_true = synthesis.builder.reserve_label(RETURN_TRUE_LABEL);

  if let Some(target) = synthesis.supertype_with(IS_SET_OPERATOR) {
    let truth = synthesis.is_set_test(SUPER, target);
    synthesis.builder.jump_if_true(&truth, &return_true);
  }

  for field in synthesis.fields() {
    let Some(declaring) = synthesis.operator_owner(field.ty, IS_SET_OPERATOR) else {
      continue;
    };
    let value = synthesis.load_field(THIS, &field.name);
    let truth = synthesis.is_set_test(&value, (graph.type_name(field.ty), declaring));
    synthesis.builder.jump_if_true(&truth, &return_true);
  }

  synthesis.builder.jump(&return_false);
  synthesis.return_block(&return_false, ReturnPattern::Boolean(false));
  synthesis.return_block(&return_true, ReturnPattern::Boolean(true));

  synthesis.finish()
}
