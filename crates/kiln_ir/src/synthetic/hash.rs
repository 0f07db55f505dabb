use kiln_type::{
  SymbolGraph, TypeId,
  operators::{HASH_CODE_OPERATOR, IS_SET_OPERATOR},
};

use super::{ReturnPattern, Returns, Synthesis};
use crate::{
  DebugInfo, IrFault, IrMethod,
  names::{
    ADD, FIELD_SET_STATUS, FIELD_SKIP_LABEL, HASH_MULTIPLIER, HASH_SKIP_LABEL, HASHCODE, MUL, OR, RETURN_HASH_LABEL,
    RETURN_UNSET_LABEL, RETURN_VAR, THIS,
  },
};

/// Most fields `_fieldSetStatus` can describe in one `Integer` bit mask.
pub const FIELD_STATUS_LIMIT: usize = 63;

/// `_fieldSetStatus()`: bit `n` is set when field `n` is set.
///
/// A field whose type has no `?` operator keeps its bit position and leaves
/// the bit clear.
pub fn generate_field_set_status(
  graph: &SymbolGraph,
  ty: TypeId,
  debug_info: Option<DebugInfo>,
) -> Result<IrMethod, IrFault> {
  let fields = &graph.ty(ty).fields;
  if fields.len() > FIELD_STATUS_LIMIT {
    return Err(IrFault::TooManyFields {
      ty: graph.type_name(ty).to_string(),
      limit: FIELD_STATUS_LIMIT,
    });
  }

  let mut synthesis = Synthesis::begin(graph, ty, FIELD_SET_STATUS, false, Returns::Integer, debug_info)?;
  let core = synthesis.core;
  let integer = core.integer.as_str();

  let none = synthesis.owned_literal("0", integer);
  synthesis.set_return(&none);

  for (bit, field) in fields.iter().enumerate() {
    let Some(declaring) = synthesis.operator_owner(field.ty, IS_SET_OPERATOR) else {
      continue;
    };

    let skip = synthesis.builder.reserve_label(FIELD_SKIP_LABEL);
    let value = synthesis.load_field(THIS, &field.name);
    let truth = synthesis.is_set_test(&value, (graph.type_name(field.ty), declaring));
    synthesis.builder.jump_if_false(&truth, &skip);

    let mask = synthesis.owned_literal(&(1u64 << bit).to_string(), integer);
    let merged = synthesis.owned_call(RETURN_VAR, (integer, integer), OR, Some((&mask, integer)), integer);
    synthesis.replace_return(&merged);

    synthesis.builder.place_label(&skip);
  }

  synthesis.exit_and_return();
  synthesis.finish()
}

/// `_hashcode()` for an aggregate, unset when the instance is.
///
/// Starts from `_fieldSetStatus()` and folds in each set field as
/// `hash * 31 + field hash`. Fields whose type has no `?` operator always
/// contribute.
pub fn generate_hash_code(
  graph: &SymbolGraph,
  ty: TypeId,
  debug_info: Option<DebugInfo>,
) -> Result<IrMethod, IrFault> {
  let mut synthesis = Synthesis::begin(graph, ty, HASHCODE, false, Returns::Integer, debug_info)?;
  let core = synthesis.core;
  let integer = core.integer.as_str();
  let name = synthesis.name();

  let unset = synthesis.builder.reserve_label(RETURN_UNSET_LABEL);
  let done = synthesis.builder.reserve_label(RETURN_HASH_LABEL);

  synthesis.guard_operand(THIS, &unset);

  let status = synthesis.owned_call(THIS, (name, name), FIELD_SET_STATUS, None, integer);
  synthesis.set_return(&status);

  for field in synthesis.fields() {
    let hash_owner = synthesis.require_operator(field.ty, HASH_CODE_OPERATOR)?;
    let field_type = graph.type_name(field.ty);

    let value = synthesis.load_field(THIS, &field.name);
    let skip = match synthesis.operator_owner(field.ty, IS_SET_OPERATOR) {
      Some(declaring) => {
        let skip = synthesis.builder.reserve_label(HASH_SKIP_LABEL);
        let truth = synthesis.is_set_test(&value, (field_type, declaring));
        synthesis.builder.jump_if_false(&truth, &skip);
        Some(skip)
      },
      None => None,
    };

    let field_hash = synthesis.owned_call(&value, (field_type, hash_owner), HASHCODE, None, integer);
    let multiplier = synthesis.owned_literal(HASH_MULTIPLIER, integer);
    let scaled = synthesis.owned_call(RETURN_VAR, (integer, integer), MUL, Some((&multiplier, integer)), integer);
    let combined = synthesis.owned_call(&scaled, (integer, integer), ADD, Some((&field_hash, integer)), integer);
    synthesis.replace_return(&combined);

    if let Some(skip) = skip {
      synthesis.builder.place_label(&skip);
    }
  }

  synthesis.builder.jump(&done);
  synthesis.return_block(&unset, ReturnPattern::Unset);
  synthesis.return_block(&done, ReturnPattern::Value);

  synthesis.finish()
}
