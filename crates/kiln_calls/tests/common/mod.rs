#![allow(dead_code)]

use kiln_config::CompilerFlags;
use kiln_diagnostics::DiagnosticCollector;
use kiln_ir::{MethodBuilder, ScopeId};
use kiln_type::{MethodSymbol, SymbolGraph, TypeId, TypeKind, TypeSymbol};

/// Core types: `Integer` promotes to `Float`, nothing else promotes.
pub struct Core {
  pub graph: SymbolGraph,
  pub boolean: TypeId,
  pub integer: TypeId,
  pub float: TypeId,
  pub string: TypeId,
}

pub fn core() -> Core {
  let mut graph = SymbolGraph::new();

  let boolean = graph.add_type(TypeSymbol::new("kiln.lang::Boolean", TypeKind::Builtin));
  let integer = graph.add_type(TypeSymbol::new("kiln.lang::Integer", TypeKind::Builtin));
  let float = graph.add_type(TypeSymbol::new("kiln.lang::Float", TypeKind::Builtin));
  let string = graph.add_type(TypeSymbol::new("kiln.lang::String", TypeKind::Builtin));

  graph.add_method(integer, MethodSymbol::for_operator("#^").returns(float));
  graph.add_method(integer, MethodSymbol::for_operator("==").param("other", integer).returns(boolean));
  graph.add_method(float, MethodSymbol::for_operator("==").param("other", float).returns(boolean));

  Core {
    graph,
    boolean,
    integer,
    float,
    string,
  }
}

pub fn flags() -> CompilerFlags {
  CompilerFlags {
    quiet: true,
    ..CompilerFlags::default()
  }
}

/// Builder for `app::Main.main` with scope `s1` already entered.
pub fn main_builder() -> (MethodBuilder, ScopeId) {
  let mut builder = MethodBuilder::new("app::Main", "main").as_static();
  let scope = builder.enter_scope();
  (builder, scope)
}

/// Instructions after the opening `enter`, one per line.
pub fn emitted(builder: &MethodBuilder) -> String {
  builder
    .instructions()
    .iter()
    .skip(1)
    .map(|i| i.to_string())
    .collect::<Vec<_>>()
    .join("\n")
}

pub fn codes(diagnostics: &DiagnosticCollector) -> Vec<String> {
  diagnostics.iter().map(|d| d.error_code.clone()).collect()
}
