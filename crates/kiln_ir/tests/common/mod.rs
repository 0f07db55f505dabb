#![allow(dead_code)]

use kiln_ir::{IrMethod, display::IrPrinter, verify_method};
use kiln_type::{MethodSymbol, SymbolGraph, TypeId, TypeKind, TypeSymbol};

pub struct Shapes {
  pub graph: SymbolGraph,
  pub boolean: TypeId,
  pub integer: TypeId,
  pub shape: TypeId,
  pub point: TypeId,
}

/// `app::Point extends app::Shape` with two `Integer` fields and one `app::Tag`
/// field that has no `?` operator.
pub fn shapes() -> Shapes {
  let mut graph = SymbolGraph::new();

  let boolean = graph.add_type(TypeSymbol::new("kiln.lang::Boolean", TypeKind::Builtin));
  let integer = graph.add_type(TypeSymbol::new("kiln.lang::Integer", TypeKind::Builtin));
  graph.add_method(boolean, MethodSymbol::for_operator("?").returns(boolean));
  graph.add_method(integer, MethodSymbol::for_operator("?").returns(boolean));

  let tag = graph.add_type(TypeSymbol::new("app::Tag", TypeKind::Record));

  let shape = graph.add_type(TypeSymbol::new("app::Shape", TypeKind::Class));
  graph.add_method(shape, MethodSymbol::for_operator("?").returns(boolean));

  let point = graph.add_type(
    TypeSymbol::new("app::Point", TypeKind::Class)
      .with_supertype(shape)
      .with_field("x", integer)
      .with_field("tag", tag)
      .with_field("y", integer),
  );

  Shapes {
    graph,
    boolean,
    integer,
    shape,
    point,
  }
}

pub struct Ledger {
  pub graph: SymbolGraph,
  pub integer: TypeId,
  pub money: TypeId,
  pub coin: TypeId,
  pub tag: TypeId,
  pub pair: TypeId,
}

/// `app::Money` declares `?`, `==` and `<=>` over one `Integer` field and
/// `app::Coin extends app::Money` adds a `year`. `app::Pair` holds two
/// `Integer` fields around an `app::Tag`, which has no operators at all.
pub fn ledger() -> Ledger {
  let mut graph = SymbolGraph::new();

  let boolean = graph.add_type(TypeSymbol::new("kiln.lang::Boolean", TypeKind::Builtin));
  let integer = graph.add_type(TypeSymbol::new("kiln.lang::Integer", TypeKind::Builtin));
  graph.add_method(boolean, MethodSymbol::for_operator("?").returns(boolean));
  for symbol in ["?", "=="] {
    graph.add_method(integer, MethodSymbol::for_operator(symbol).returns(boolean));
  }
  for symbol in ["<=>", "#?"] {
    graph.add_method(integer, MethodSymbol::for_operator(symbol).returns(integer));
  }

  let tag = graph.add_type(TypeSymbol::new("app::Tag", TypeKind::Record));

  let money = graph.add_type(TypeSymbol::new("app::Money", TypeKind::Record).with_field("amount", integer));
  for symbol in ["?", "=="] {
    graph.add_method(money, MethodSymbol::for_operator(symbol).returns(boolean));
  }
  graph.add_method(money, MethodSymbol::for_operator("<=>").returns(integer));

  let coin = graph.add_type(
    TypeSymbol::new("app::Coin", TypeKind::Class)
      .with_supertype(money)
      .with_field("year", integer),
  );

  let pair = graph.add_type(
    TypeSymbol::new("app::Pair", TypeKind::Record)
      .with_field("left", integer)
      .with_field("tag", tag)
      .with_field("right", integer),
  );

  Ledger {
    graph,
    integer,
    money,
    coin,
    tag,
    pair,
  }
}

pub fn format_method(method: &IrMethod) -> String {
  IrPrinter::new().print_method(method)
}

pub fn assert_verifies(
  owner: &str,
  method: &IrMethod,
) {
  if let Err(errors) = verify_method(owner, method) {
    panic!("verification failed:\n{}\nerrors: {:?}", format_method(method), errors);
  }
}
