use kiln_ir::{CallDetails, CallMetaData};
use kiln_type::{MethodId, SymbolGraph, symbol::operator_map};

use crate::CallContext;

/// Purity, complexity and side effects of calling `method`.
///
/// Operator methods take their facts from the operator table so that every
/// `_add` reports the same thing regardless of which type declares it.
pub fn extract_metadata(
  graph: &SymbolGraph,
  method: MethodId,
) -> CallMetaData {
  let symbol = graph.method(method);
  let operator = symbol
    .operator
    .as_deref()
    .and_then(|op| operator_map().by_symbol(op))
    .or_else(|| operator_map().by_method(&symbol.name));

  let (pure, side_effects) = match operator {
    Some(details) => (details.pure, details.side_effects()),
    None if symbol.pure => (true, Vec::new()),
    None => (false, vec!["mutates-receiver".to_string()]),
  };

  CallMetaData {
    pure,
    complexity: if pure { 1 } else { 0 },
    side_effects,
  }
}

/// Dispatch information for a call to `method` from `context`.
///
/// Argument types are the callee's parameter types: by the time the call is
/// emitted every argument has been promoted to match them.
pub fn build_call_details(
  graph: &SymbolGraph,
  context: &CallContext,
  method: MethodId,
) -> CallDetails {
  let symbol = graph.method(method);

  let (target_type, declaring_type, method_name) = match (context.target_type, symbol.owner) {
    (Some(target), Some(owner)) => (
      Some(graph.type_name(target).to_string()),
      graph.type_name(owner).to_string(),
      symbol.name.clone(),
    ),
    _ => {
      // Free functions dispatch statically on their module.
      let (module, name) = symbol.name.rsplit_once("::").unwrap_or(("", symbol.name.as_str()));
      (None, module.to_string(), name.to_string())
    },
  };

  let trait_call = context.target_type.is_some_and(|target| graph.ty(target).is_trait());

  CallDetails {
    target_type,
    declaring_type,
    method_name,
    argument_types: symbol.params.iter().map(|p| graph.type_name(p.ty).to_string()).collect(),
    return_type: symbol.return_type.map(|ty| graph.type_name(ty).to_string()),
    metadata: extract_metadata(graph, method),
    trait_call,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use kiln_ir::ScopeId;
  use kiln_type::{MethodSymbol, TypeKind, TypeSymbol};

  #[test]
  fn operator_metadata_comes_from_the_operator_table() {
    let mut graph = SymbolGraph::new();
    let integer = graph.add_type(TypeSymbol::new("kiln.lang::Integer", TypeKind::Builtin));
    let add = graph.add_method(integer, MethodSymbol::for_operator("+").param("rhs", integer).returns(integer));
    let inc = graph.add_method(integer, MethodSymbol::for_operator("+=").param("rhs", integer));
    let log = graph.add_method(integer, MethodSymbol::new("log").impure());

    assert_eq!(
      extract_metadata(&graph, add),
      CallMetaData {
        pure: true,
        complexity: 1,
        side_effects: Vec::new(),
      }
    );
    assert!(!extract_metadata(&graph, inc).pure);
    assert_eq!(extract_metadata(&graph, inc).side_effects.len(), 2);
    assert_eq!(extract_metadata(&graph, log).side_effects, vec!["mutates-receiver".to_string()]);
  }

  #[test]
  fn calls_through_a_trait_are_dynamic() {
    let mut graph = SymbolGraph::new();
    let text = graph.add_type(TypeSymbol::new("kiln.lang::String", TypeKind::Builtin));
    let shape = graph.add_type(TypeSymbol::new("app::Shape", TypeKind::Trait));
    let name = graph.add_method(shape, MethodSymbol::new("name").returns(text));

    let context = CallContext::method(shape, "s", "name", ScopeId::new("s1"));
    let details = build_call_details(&graph, &context, name);

    assert!(details.trait_call);
    assert_eq!(details.target_type.as_deref(), Some("app::Shape"));
    assert_eq!(details.return_type.as_deref(), Some("kiln.lang::String"));
  }

  #[test]
  fn free_functions_are_static() {
    let mut graph = SymbolGraph::new();
    let integer = graph.add_type(TypeSymbol::new("kiln.lang::Integer", TypeKind::Builtin));
    let double = graph.add_function(MethodSymbol::new("app.math::double").param("x", integer).returns(integer));

    let context = CallContext::function("app.math::double", ScopeId::new("s1")).with_argument("n", integer);
    let details = build_call_details(&graph, &context, double);

    assert!(details.is_static());
    assert_eq!(details.declaring_type, "app.math");
    assert_eq!(details.method_name, "double");
    assert_eq!(details.argument_types, vec!["kiln.lang::Integer".to_string()]);
  }
}
