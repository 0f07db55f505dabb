mod common;

use insta::assert_snapshot;
use kiln_ir::{DebugInfo, InstrKind, IrFault, synthetic::generate_is_set};
use kiln_type::{CoreTypeNames, SymbolGraph, TypeKind, TypeSymbol};

#[test]
fn is_set_checks_supertype_then_testable_fields() {
  let shapes = common::shapes();
  let method = generate_is_set(&shapes.graph, shapes.point, None).unwrap();

  common::assert_verifies("app::Point", &method);

  assert_snapshot!(common::format_method(&method), @r"
  method _isSet(): kiln.lang::Boolean {
    enter s1
    ref _ret : kiln.lang::Boolean
    _temp1 = call super->app::Shape._isSet() : kiln.lang::Boolean
    retain _temp1
    register _temp1 in s1
    _temp2 = call _temp1->kiln.lang::Boolean._true() : boolean
    jump_if_true _temp2, return_true_2
    _temp3 = load this.x
    _temp4 = call _temp3->kiln.lang::Integer._isSet() : kiln.lang::Boolean
    retain _temp4
    register _temp4 in s1
    _temp5 = call _temp4->kiln.lang::Boolean._true() : boolean
    jump_if_true _temp5, return_true_2
    _temp6 = load this.y
    _temp7 = call _temp6->kiln.lang::Integer._isSet() : kiln.lang::Boolean
    retain _temp7
    register _temp7 in s1
    _temp8 = call _temp7->kiln.lang::Boolean._true() : boolean
    jump_if_true _temp8, return_true_2
    jump return_false_1
  return_false_1:
    _temp9 = call kiln.lang::Boolean._ofFalse() : kiln.lang::Boolean
    retain _temp9
    register _temp9 in s1
    store _ret <- _temp9
    retain _ret
    exit s1
    return _ret
  return_true_2:
    _temp10 = call kiln.lang::Boolean._ofTrue() : kiln.lang::Boolean
    retain _temp10
    register _temp10 in s1
    store _ret <- _temp10
    retain _ret
    exit s1
    return _ret
  }
  ");
}

#[test]
fn is_set_without_supertype_or_testable_fields_is_always_false() {
  let mut shapes = common::shapes();
  let empty = shapes.graph.add_type(TypeSymbol::new("app::Empty", TypeKind::Record));

  let method = generate_is_set(&shapes.graph, empty, None).unwrap();
  common::assert_verifies("app::Empty", &method);

  let calls = method.body.iter().filter(|i| matches!(i.kind, InstrKind::Call(_))).count();
  assert_eq!(calls, 2, "only the two factory calls remain");
  assert_eq!(method.body[2].to_string(), "jump return_false_1");
}

#[test]
fn inherited_is_set_is_called_on_its_declaring_type() {
  let mut shapes = common::shapes();
  let circle = shapes.graph.add_type(
    TypeSymbol::new("app::Circle", TypeKind::Class)
      .with_supertype(shapes.shape)
      .with_field("radius", shapes.integer),
  );
  let ring = shapes.graph.add_type(
    TypeSymbol::new("app::Ring", TypeKind::Record)
      .with_field("outer", circle),
  );

  let method = generate_is_set(&shapes.graph, ring, None).unwrap();
  common::assert_verifies("app::Ring", &method);

  let printed = common::format_method(&method);
  assert!(printed.contains("_temp2 = call _temp1->app::Shape._isSet() : kiln.lang::Boolean"));
}

#[test]
fn every_generated_instruction_carries_the_declaration_site() {
  let shapes = common::shapes();
  let site = DebugInfo::new("point.kn", 3, 1);

  let method = generate_is_set(&shapes.graph, shapes.point, Some(site.clone())).unwrap();

  assert!(method.body.iter().all(|i| i.debug_info.as_ref() == Some(&site)));
}

#[test]
fn missing_boolean_type_is_a_fault() {
  let mut graph = SymbolGraph::with_core_types(CoreTypeNames::default());
  let lonely = graph.add_type(TypeSymbol::new("app::Lonely", TypeKind::Record));

  assert_eq!(
    generate_is_set(&graph, lonely, None),
    Err(IrFault::MissingType {
      name: "kiln.lang::Boolean".to_string(),
    })
  );
}
