use kiln_type::{Cost, MatchCost, MethodId, SymbolGraph, TypeId};

use crate::CallContext;

/// The method a call binds to and how well it matched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodResolutionResult {
  pub method: MethodId,
  /// Sum of the per-argument costs.
  pub cost: Cost,
  /// At least one argument needs a `#^` promotion.
  pub promotion_required: bool,
}

impl MethodResolutionResult {
  pub fn is_perfect_match(&self) -> bool {
    self.cost.is_perfect()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
  Resolved(MethodResolutionResult),
  /// Every candidate tying at the lowest cost, in candidate order.
  Ambiguous(Vec<MethodId>),
  /// No candidate accepts the argument types.
  Unresolved,
}

impl Resolution {
  pub fn is_invalid(&self) -> bool {
    matches!(self, Resolution::Unresolved)
  }

  pub fn resolved(&self) -> Option<&MethodResolutionResult> {
    match self {
      Resolution::Resolved(result) => Some(result),
      _ => None,
    }
  }
}

/// Cost-based overload resolution over a read-only symbol graph.
pub struct CallResolver<'g> {
  graph: &'g SymbolGraph,
}

impl<'g> CallResolver<'g> {
  pub fn new(graph: &'g SymbolGraph) -> Self {
    Self { graph }
  }

  pub fn graph(&self) -> &'g SymbolGraph {
    self.graph
  }

  /// Methods (or free functions) with the call's name and arity.
  pub fn candidates(
    &self,
    context: &CallContext,
  ) -> Vec<MethodId> {
    let name = context.lookup_name();
    match context.target_type {
      Some(target) => self.graph.candidate_methods(target, name, context.arity()),
      None => self.graph.candidate_functions(name, context.arity()),
    }
  }

  pub fn resolve(
    &self,
    context: &CallContext,
  ) -> Resolution {
    let candidates = self.candidates(context);

    // Nothing to score: name and arity decide alone.
    if context.arity() == 0 {
      return match candidates.as_slice() {
        [] => Resolution::Unresolved,
        [only] => Resolution::Resolved(MethodResolutionResult {
          method: *only,
          cost: Cost::PERFECT,
          promotion_required: false,
        }),
        _ => Resolution::Ambiguous(candidates),
      };
    }

    let mut scored: Vec<MethodResolutionResult> = candidates
      .iter()
      .filter_map(|&method| self.score(method, &context.argument_types))
      .collect();

    if scored.is_empty() {
      return Resolution::Unresolved;
    }

    // Stable: equal costs keep candidate order.
    scored.sort_by(|a, b| a.cost.cmp(&b.cost));

    let best = scored[0];
    let tied: Vec<MethodId> = scored.iter().filter(|r| r.cost.ties_with(&best.cost)).map(|r| r.method).collect();

    if tied.len() > 1 {
      return Resolution::Ambiguous(tied);
    }

    Resolution::Resolved(best)
  }

  /// Total cost of calling `method` with `argument_types`.
  pub fn match_cost(
    &self,
    method: MethodId,
    argument_types: &[TypeId],
  ) -> MatchCost {
    let params = &self.graph.method(method).params;
    if params.len() != argument_types.len() {
      return MatchCost::NotAssignable;
    }

    params
      .iter()
      .zip(argument_types)
      .fold(MatchCost::perfect(), |total, (param, &arg)| {
        total.combine(self.graph.assignable_cost(arg, param.ty))
      })
  }

  fn score(
    &self,
    method: MethodId,
    argument_types: &[TypeId],
  ) -> Option<MethodResolutionResult> {
    let cost = self.match_cost(method, argument_types).cost()?;
    let params = &self.graph.method(method).params;
    let promotion_required = params
      .iter()
      .zip(argument_types)
      .any(|(param, &arg)| !self.graph.direct_cost(arg, param.ty).is_assignable());

    Some(MethodResolutionResult {
      method,
      cost,
      promotion_required,
    })
  }

  /// `Owner.name(Param, ...) -> Return`, for diagnostics.
  pub fn signature(
    &self,
    method: MethodId,
  ) -> String {
    let symbol = self.graph.method(method);
    let params: Vec<&str> = symbol.params.iter().map(|p| self.graph.type_name(p.ty)).collect();

    let mut signature = match symbol.owner {
      Some(owner) => format!("{}.{}({})", self.graph.type_name(owner), symbol.name, params.join(", ")),
      None => format!("{}({})", symbol.name, params.join(", ")),
    };
    if let Some(ret) = symbol.return_type {
      signature.push_str(" -> ");
      signature.push_str(self.graph.type_name(ret));
    }
    signature
  }
}
