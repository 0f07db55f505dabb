use std::collections::HashMap;
use std::sync::OnceLock;

use crate::{
  Id, Store,
  cost::{Cost, MatchCost, PROMOTION_COST, SUPERTYPE_STEP_COST, TRAIT_STEP_COST},
  operators::{OperatorMap, PROMOTE_OPERATOR},
};

pub type TypeId = Id<TypeSymbol>;
pub type MethodId = Id<MethodSymbol>;

static OPERATORS: OnceLock<OperatorMap> = OnceLock::new();

/// Shared, lazily built operator table.
pub fn operator_map() -> &'static OperatorMap {
  OPERATORS.get_or_init(OperatorMap::new)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolCategory {
  Type,
  Function,
  Method,
  Variable,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
  Class,
  Record,
  Trait,
  Builtin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
  pub name: String,
  pub ty: TypeId,
}

impl Field {
  pub fn category(&self) -> SymbolCategory {
    SymbolCategory::Variable
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
  pub name: String,
  pub ty: TypeId,
}

/// A resolved aggregate type. Immutable once the graph is handed to lowering.
#[derive(Debug, Clone)]
pub struct TypeSymbol {
  /// Fully qualified name, `module.path::Name`.
  pub name: String,
  pub kind: TypeKind,
  pub supertype: Option<TypeId>,
  pub traits: Vec<TypeId>,
  pub fields: Vec<Field>,
  methods: Vec<MethodId>,
  operators: HashMap<String, MethodId>,
}

impl TypeSymbol {
  pub fn new(
    name: impl Into<String>,
    kind: TypeKind,
  ) -> Self {
    Self {
      name: name.into(),
      kind,
      supertype: None,
      traits: Vec::new(),
      fields: Vec::new(),
      methods: Vec::new(),
      operators: HashMap::new(),
    }
  }

  pub fn with_supertype(
    mut self,
    supertype: TypeId,
  ) -> Self {
    self.supertype = Some(supertype);
    self
  }

  pub fn with_trait(
    mut self,
    trait_id: TypeId,
  ) -> Self {
    self.traits.push(trait_id);
    self
  }

  pub fn with_field(
    mut self,
    name: impl Into<String>,
    ty: TypeId,
  ) -> Self {
    self.fields.push(Field { name: name.into(), ty });
    self
  }

  pub fn category(&self) -> SymbolCategory {
    SymbolCategory::Type
  }

  pub fn is_trait(&self) -> bool {
    self.kind == TypeKind::Trait
  }

  /// Methods declared directly on this type, in declaration order.
  pub fn methods(&self) -> &[MethodId] {
    &self.methods
  }

  /// Operator implemented directly on this type (no supertype lookup).
  pub fn operator(
    &self,
    symbol: &str,
  ) -> Option<MethodId> {
    self.operators.get(symbol).copied()
  }
}

/// A method, operator or free function.
#[derive(Debug, Clone)]
pub struct MethodSymbol {
  pub name: String,
  /// `None` for free functions.
  pub owner: Option<TypeId>,
  pub params: Vec<Parameter>,
  /// `None` means the call produces no value.
  pub return_type: Option<TypeId>,
  /// Source operator symbol when this method implements one.
  pub operator: Option<String>,
  pub pure: bool,
  pub is_constructor: bool,
}

impl MethodSymbol {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      owner: None,
      params: Vec::new(),
      return_type: None,
      operator: None,
      pure: true,
      is_constructor: false,
    }
  }

  /// Method implementing `symbol`, named after the operator table entry.
  pub fn for_operator(symbol: &str) -> Self {
    let details = operator_map().by_symbol(symbol);
    let name = details.map(|d| d.method_name.to_string()).unwrap_or_else(|| symbol.to_string());
    let mut method = Self::new(name);
    method.operator = Some(symbol.to_string());
    method.pure = details.map(|d| d.pure).unwrap_or(true);
    method
  }

  pub fn constructor(name: impl Into<String>) -> Self {
    let mut method = Self::new(name);
    method.is_constructor = true;
    method
  }

  pub fn param(
    mut self,
    name: impl Into<String>,
    ty: TypeId,
  ) -> Self {
    self.params.push(Parameter { name: name.into(), ty });
    self
  }

  pub fn returns(
    mut self,
    ty: TypeId,
  ) -> Self {
    self.return_type = Some(ty);
    self
  }

  pub fn impure(mut self) -> Self {
    self.pure = false;
    self
  }

  pub fn arity(&self) -> usize {
    self.params.len()
  }

  pub fn category(&self) -> SymbolCategory {
    if self.owner.is_some() {
      SymbolCategory::Method
    } else {
      SymbolCategory::Function
    }
  }

  pub fn same_parameter_types(
    &self,
    other: &MethodSymbol,
  ) -> bool {
    self.params.len() == other.params.len() && self.params.iter().zip(&other.params).all(|(a, b)| a.ty == b.ty)
  }
}

/// Fully qualified names of the core types synthetic IR refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreTypeNames {
  pub boolean: String,
  pub integer: String,
  pub string: String,
}

impl Default for CoreTypeNames {
  fn default() -> Self {
    Self {
      boolean: "kiln.lang::Boolean".to_string(),
      integer: "kiln.lang::Integer".to_string(),
      string: "kiln.lang::String".to_string(),
    }
  }
}

/// Read-only view of the resolved program: types, methods, operators and costs.
///
/// Populated once by symbol resolution, then shared (typically behind an `Arc`)
/// across the lowering threads.
#[derive(Debug, Clone, Default)]
pub struct SymbolGraph {
  types: Store<TypeSymbol>,
  methods: Store<MethodSymbol>,
  by_name: HashMap<String, TypeId>,
  functions: Vec<MethodId>,
  core: CoreTypeNames,
}

impl SymbolGraph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_core_types(core: CoreTypeNames) -> Self {
    Self {
      core,
      ..Self::default()
    }
  }

  pub fn core_types(&self) -> &CoreTypeNames {
    &self.core
  }

  // -- Population --

  pub fn add_type(
    &mut self,
    symbol: TypeSymbol,
  ) -> TypeId {
    let name = symbol.name.clone();
    let id = self.types.alloc(symbol);
    self.by_name.insert(name, id);
    id
  }

  pub fn add_method(
    &mut self,
    owner: TypeId,
    mut method: MethodSymbol,
  ) -> MethodId {
    method.owner = Some(owner);
    let operator = method.operator.clone();
    let id = self.methods.alloc(method);

    let ty = self.types.get_mut(&owner);
    ty.methods.push(id);
    if let Some(symbol) = operator {
      ty.operators.insert(symbol, id);
    }

    id
  }

  pub fn add_function(
    &mut self,
    mut function: MethodSymbol,
  ) -> MethodId {
    function.owner = None;
    let id = self.methods.alloc(function);
    self.functions.push(id);
    id
  }

  // -- Lookup --

  pub fn ty(
    &self,
    id: TypeId,
  ) -> &TypeSymbol {
    self.types.get(&id)
  }

  pub fn method(
    &self,
    id: MethodId,
  ) -> &MethodSymbol {
    self.methods.get(&id)
  }

  pub fn type_name(
    &self,
    id: TypeId,
  ) -> &str {
    &self.ty(id).name
  }

  pub fn type_by_name(
    &self,
    name: &str,
  ) -> Option<TypeId> {
    self.by_name.get(name).copied()
  }

  pub fn functions(&self) -> &[MethodId] {
    &self.functions
  }

  pub fn types(&self) -> impl Iterator<Item = (TypeId, &TypeSymbol)> {
    self.types.iter()
  }

  /// `ty` and every supertype/trait reachable from it, each with the cheapest
  /// subtype cost to get there. `ty` itself comes first; the rest are ordered
  /// by cost, then by discovery.
  pub fn ancestors(
    &self,
    ty: TypeId,
  ) -> Vec<(TypeId, Cost)> {
    let mut best: HashMap<TypeId, f64> = HashMap::new();
    let mut order: Vec<TypeId> = Vec::new();
    let mut worklist: Vec<(TypeId, f64)> = vec![(ty, 0.0)];

    while let Some((current, cost)) = worklist.pop() {
      match best.get(&current) {
        Some(&known) if known <= cost => continue,
        Some(_) => {},
        None => order.push(current),
      }
      best.insert(current, cost);

      let symbol = self.ty(current);
      for &trait_id in symbol.traits.iter().rev() {
        worklist.push((trait_id, cost + TRAIT_STEP_COST));
      }
      if let Some(supertype) = symbol.supertype {
        worklist.push((supertype, cost + SUPERTYPE_STEP_COST));
      }
    }

    let mut result: Vec<(usize, TypeId, Cost)> = order
      .into_iter()
      .enumerate()
      .map(|(idx, id)| (idx, id, Cost::subtype(best[&id])))
      .collect();
    result.sort_by(|a, b| a.2.cmp(&b.2).then(a.0.cmp(&b.0)));
    result.into_iter().map(|(_, id, cost)| (id, cost)).collect()
  }

  /// Cost of passing `from` where `to` is expected without any conversion.
  pub fn direct_cost(
    &self,
    from: TypeId,
    to: TypeId,
  ) -> MatchCost {
    if from == to {
      return MatchCost::perfect();
    }

    self
      .ancestors(from)
      .into_iter()
      .find(|(id, _)| *id == to)
      .map(|(_, cost)| MatchCost::Assignable(cost))
      .unwrap_or(MatchCost::NotAssignable)
  }

  /// Cost of passing `from` where `to` is expected, allowing one promotion.
  ///
  /// Not symmetric: `Integer -> Float` may promote while `Float -> Integer`
  /// has no path.
  pub fn assignable_cost(
    &self,
    from: TypeId,
    to: TypeId,
  ) -> MatchCost {
    let direct = self.direct_cost(from, to);
    if direct.is_assignable() {
      return direct;
    }

    match self.promoted_type(from) {
      Some(promoted) => match self.direct_cost(promoted, to) {
        MatchCost::Assignable(cost) => MatchCost::Assignable(Cost::new(PROMOTION_COST) + cost),
        MatchCost::NotAssignable => MatchCost::NotAssignable,
      },
      None => MatchCost::NotAssignable,
    }
  }

  /// Operator method for `symbol` on `ty` or the nearest ancestor providing it.
  pub fn resolve_operator(
    &self,
    ty: TypeId,
    symbol: &str,
  ) -> Option<MethodId> {
    self.ancestors(ty).into_iter().find_map(|(id, _)| self.ty(id).operator(symbol))
  }

  pub fn promotion_method(
    &self,
    ty: TypeId,
  ) -> Option<MethodId> {
    self.resolve_operator(ty, PROMOTE_OPERATOR)
  }

  pub fn promoted_type(
    &self,
    ty: TypeId,
  ) -> Option<TypeId> {
    self.promotion_method(ty).and_then(|id| self.method(id).return_type)
  }

  /// Methods callable as `name` with `arity` arguments on `ty`, most derived first.
  ///
  /// An inherited method overridden with the same parameter types lower in the
  /// hierarchy is hidden by the override.
  pub fn candidate_methods(
    &self,
    ty: TypeId,
    name: &str,
    arity: usize,
  ) -> Vec<MethodId> {
    let mut found: Vec<MethodId> = Vec::new();

    for (ancestor, _) in self.ancestors(ty) {
      for &method_id in self.ty(ancestor).methods() {
        let method = self.method(method_id);
        if method.name != name || method.arity() != arity {
          continue;
        }

        let overridden = found.iter().any(|&existing| self.method(existing).same_parameter_types(method));
        if !overridden {
          found.push(method_id);
        }
      }
    }

    found
  }

  /// Free functions named `name` taking `arity` arguments, in declaration order.
  pub fn candidate_functions(
    &self,
    name: &str,
    arity: usize,
  ) -> Vec<MethodId> {
    self
      .functions
      .iter()
      .copied()
      .filter(|&id| {
        let function = self.method(id);
        function.name == name && function.arity() == arity
      })
      .collect()
  }

  /// Zero argument constructor, when the type declares one.
  pub fn default_constructor(
    &self,
    ty: TypeId,
  ) -> Option<MethodId> {
    self.ty(ty).methods().iter().copied().find(|&id| {
      let method = self.method(id);
      method.is_constructor && method.params.is_empty()
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Numbers {
    graph: SymbolGraph,
    integer: TypeId,
    float: TypeId,
    text: TypeId,
  }

  fn numbers() -> Numbers {
    let mut graph = SymbolGraph::new();
    let float = graph.add_type(TypeSymbol::new("kiln.lang::Float", TypeKind::Builtin));
    let integer = graph.add_type(TypeSymbol::new("kiln.lang::Integer", TypeKind::Builtin));
    let text = graph.add_type(TypeSymbol::new("kiln.lang::String", TypeKind::Builtin));
    graph.add_method(integer, MethodSymbol::for_operator("#^").returns(float));

    Numbers {
      graph,
      integer,
      float,
      text,
    }
  }

  #[test]
  fn identical_types_cost_nothing() {
    let n = numbers();
    assert_eq!(n.graph.assignable_cost(n.integer, n.integer), MatchCost::perfect());
  }

  #[test]
  fn promotion_is_not_symmetric() {
    let n = numbers();

    let up = n.graph.assignable_cost(n.integer, n.float);
    assert!(up.cost().unwrap().involves_promotion());
    assert_eq!(n.graph.assignable_cost(n.float, n.integer), MatchCost::NotAssignable);
  }

  #[test]
  fn missing_operator_means_not_assignable() {
    let n = numbers();
    assert_eq!(n.graph.assignable_cost(n.text, n.float), MatchCost::NotAssignable);
    assert!(n.graph.resolve_operator(n.text, "#^").is_none());
  }

  #[test]
  fn supertype_is_cheaper_than_trait() {
    let mut graph = SymbolGraph::new();
    let shape = graph.add_type(TypeSymbol::new("geo::Shape", TypeKind::Class));
    let drawable = graph.add_type(TypeSymbol::new("geo::Drawable", TypeKind::Trait));
    let square = graph.add_type(
      TypeSymbol::new("geo::Square", TypeKind::Class)
        .with_supertype(shape)
        .with_trait(drawable),
    );

    let to_super = graph.direct_cost(square, shape).cost().unwrap();
    let to_trait = graph.direct_cost(square, drawable).cost().unwrap();
    assert!(to_super < to_trait);
    assert_eq!(graph.direct_cost(shape, square), MatchCost::NotAssignable);
  }

  #[test]
  fn overrides_hide_inherited_methods() {
    let mut graph = SymbolGraph::new();
    let base = graph.add_type(TypeSymbol::new("app::Base", TypeKind::Class));
    let derived = graph.add_type(TypeSymbol::new("app::Derived", TypeKind::Class).with_supertype(base));
    graph.add_method(base, MethodSymbol::new("run").param("n", base));
    let overriding = graph.add_method(derived, MethodSymbol::new("run").param("n", base));

    assert_eq!(graph.candidate_methods(derived, "run", 1), vec![overriding]);
  }

  #[test]
  fn operators_are_found_on_supertypes() {
    let mut graph = SymbolGraph::new();
    let boolean = graph.add_type(TypeSymbol::new("kiln.lang::Boolean", TypeKind::Builtin));
    let base = graph.add_type(TypeSymbol::new("app::Base", TypeKind::Class));
    let derived = graph.add_type(TypeSymbol::new("app::Derived", TypeKind::Class).with_supertype(base));
    let is_set = graph.add_method(base, MethodSymbol::for_operator("?").returns(boolean));

    assert_eq!(graph.resolve_operator(derived, "?"), Some(is_set));
    assert_eq!(graph.method(is_set).name, "_isSet");
  }
}
