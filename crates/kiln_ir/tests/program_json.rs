use kiln_ir::{ConstructKind, EntryPoint, IrProgram, display::print_program, verify_construct};

const HELLO: &str = r#"{
  "modules": [
    {
      "name": "app",
      "constructs": [
        {
          "name": "app::Hello",
          "kind": "Program",
          "methods": [
            {
              "name": "main",
              "is_static": true,
              "body": [
                { "kind": { "Scope": { "Enter": "s1" } } },
                { "kind": { "Literal": { "dest": "_temp1", "value": "\"hi\"", "ty": "kiln.lang::String" } },
                  "debug_info": { "source_file": "hello.kn", "line": 2, "column": 3 } },
                { "kind": { "Memory": { "Retain": "_temp1" } } },
                { "kind": { "Scope": { "Register": { "variable": "_temp1", "scope": "s1" } } } },
                { "kind": { "Scope": { "Exit": "s1" } } },
                { "kind": { "Branch": { "Return": { "value": null } } } }
              ]
            }
          ]
        },
        { "name": "app::Greeting", "kind": "Record", "fields": [{ "name": "text", "ty": "kiln.lang::String" }] }
      ]
    }
  ]
}"#;

#[test]
fn program_loads_from_json() {
  let program: IrProgram = serde_json::from_str(HELLO).unwrap();

  assert_eq!(program.construct_count(), 2);
  assert_eq!(program.construct("app::Greeting").map(|c| c.kind), Some(ConstructKind::Record));
  assert_eq!(
    program.entry_points(),
    vec![EntryPoint {
      name: "Hello".to_string(),
      construct: "app::Hello".to_string(),
    }]
  );

  for construct in program.constructs() {
    assert_eq!(verify_construct(construct), Ok(()));
  }
}

#[test]
fn printed_program_lists_every_module() {
  let program: IrProgram = serde_json::from_str(HELLO).unwrap();

  insta::assert_snapshot!(print_program(&program), @r#"
  // module app
  program app::Hello {
    static method main() {
      enter s1
      _temp1 = literal "hi" : kiln.lang::String
      retain _temp1
      register _temp1 in s1
      exit s1
      return
    }
  }

  record app::Greeting {
    field text: kiln.lang::String
  }
  "#);
}
