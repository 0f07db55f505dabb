use kiln_ir::{Call, CallDetails, CallMetaData, Instr, InstrKind, Memory, MethodBuilder, Scope};
use kiln_type::{MethodId, SymbolGraph, TypeId, operators::PROMOTE_OPERATOR, symbol::operator_map};

use crate::{CallContext, CallFault, MethodResolutionResult};

/// Arguments to pass after promotion, plus the instructions that produce them.
#[derive(Debug, Clone, PartialEq)]
pub struct PromotionResult {
  /// Same length and order as the call site's arguments.
  pub arguments: Vec<String>,
  pub instructions: Vec<Instr>,
}

impl PromotionResult {
  fn unchanged(context: &CallContext) -> Self {
    Self {
      arguments: context.argument_variables.clone(),
      instructions: Vec::new(),
    }
  }
}

/// Promote every argument that is not directly assignable to its parameter.
///
/// Each promotion is `tmp = arg._promote()`, retained and registered to the
/// call's scope. Only one promotion per argument: the promoted type must be
/// directly assignable or the call is a fault. Temporaries come from
/// `builder`; the instructions are returned, not emitted.
pub fn build_promotions(
  graph: &SymbolGraph,
  builder: &mut MethodBuilder,
  context: &CallContext,
  resolution: &MethodResolutionResult,
) -> Result<PromotionResult, CallFault> {
  if resolution.is_perfect_match() || !resolution.promotion_required {
    return Ok(PromotionResult::unchanged(context));
  }

  let method = graph.method(resolution.method);
  if method.params.len() != context.arity() || context.argument_variables.len() != context.arity() {
    return Err(CallFault::ArityMismatch {
      method: method.name.clone(),
      expected: method.params.len(),
      found: context.arity(),
    });
  }

  let mut result = PromotionResult {
    arguments: Vec::with_capacity(context.arity()),
    instructions: Vec::new(),
  };

  for (index, (param, (&arg_type, variable))) in method
    .params
    .iter()
    .zip(context.argument_types.iter().zip(&context.argument_variables))
    .enumerate()
  {
    if graph.direct_cost(arg_type, param.ty).is_assignable() {
      result.arguments.push(variable.clone());
      continue;
    }

    let promoted = graph
      .promotion_method(arg_type)
      .filter(|&promote| promotes_into(graph, promote, param.ty))
      .ok_or_else(|| CallFault::CannotPromote {
        method: method.name.clone(),
        index,
        from: graph.type_name(arg_type).to_string(),
        to: graph.type_name(param.ty).to_string(),
      })?;

    let temp = builder.new_temp();
    result
      .instructions
      .extend(promote_call(graph, context, promoted, arg_type, variable, &temp));
    result.arguments.push(temp);
  }

  Ok(result)
}

fn promotes_into(
  graph: &SymbolGraph,
  promote: MethodId,
  param: TypeId,
) -> bool {
  graph
    .method(promote)
    .return_type
    .is_some_and(|promoted| graph.direct_cost(promoted, param).is_assignable())
}

/// `dest = variable._promote()`, then retain and register it.
fn promote_call(
  graph: &SymbolGraph,
  context: &CallContext,
  promote: MethodId,
  arg_type: TypeId,
  variable: &str,
  dest: &str,
) -> [Instr; 3] {
  let symbol = graph.method(promote);
  let details = operator_map().by_symbol(PROMOTE_OPERATOR);
  let pure = details.map_or(true, |d| d.pure);

  let call = Call {
    details: CallDetails {
      target_type: Some(graph.type_name(arg_type).to_string()),
      declaring_type: graph.type_name(symbol.owner.unwrap_or(arg_type)).to_string(),
      method_name: symbol.name.clone(),
      argument_types: Vec::new(),
      return_type: symbol.return_type.map(|ty| graph.type_name(ty).to_string()),
      metadata: CallMetaData {
        pure,
        complexity: 0,
        side_effects: details.map(|d| d.side_effects()).unwrap_or_default(),
      },
      trait_call: false,
    },
    receiver: Some(variable.to_string()),
    arguments: Vec::new(),
    dest: Some(dest.to_string()),
  };

  let at = context.debug_info.clone();
  [
    Instr::new(InstrKind::Call(call)).with_debug_info(at.clone()),
    Instr::new(InstrKind::Memory(Memory::Retain(dest.to_string()))).with_debug_info(at.clone()),
    Instr::new(InstrKind::Scope(Scope::Register {
      variable: dest.to_string(),
      scope: context.scope_id.clone(),
    }))
    .with_debug_info(at),
  ]
}
