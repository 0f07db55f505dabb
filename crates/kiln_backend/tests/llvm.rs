mod common;

use common::{counter, entries};
use insta::assert_snapshot;
use kiln_backend::{CodegenBackend, LlvmBackend, LlvmRuntime};
use kiln_ir::{ConstructKind, IrConstruct, MethodBuilder};

#[test]
fn class_with_field_and_method() {
  let text = LlvmBackend::new(LlvmRuntime::Cpp).lower_construct(&counter()).unwrap();

  assert_snapshot!(text, @r#"
  ; kiln llvm-cpp listing for app::Counter

  %"app::Counter" = type { ptr }

  define ptr @"app::Counter.bump"(ptr %arg.this, ptr %arg.step) {
  entry:
    %v.this = alloca ptr
    %v.step = alloca ptr
    %v._ret = alloca ptr
    %v._temp1 = alloca ptr
    %v._temp2 = alloca ptr
    %scope.s1 = alloca ptr
    store ptr %arg.this, ptr %v.this
    store ptr %arg.step, ptr %v.step
    %t1 = call ptr @kiln_cpp_scope_enter()
    store ptr %t1, ptr %scope.s1
    store ptr null, ptr %v._ret
    %t2 = load ptr, ptr %v.this
    %t3 = call ptr @kiln_cpp_field(ptr %t2, ptr @.str.0)
    store ptr %t3, ptr %v._temp1
    %t4 = load ptr, ptr %v._temp1
    %t5 = load ptr, ptr %v.step
    %t6 = call ptr @"kiln.lang::Integer._add"(ptr %t4, ptr %t5)
    store ptr %t6, ptr %v._temp2
    %t7 = load ptr, ptr %v._temp2
    call void @kiln_cpp_retain(ptr %t7)
    %t8 = load ptr, ptr %scope.s1
    %t9 = load ptr, ptr %v._temp2
    call void @kiln_cpp_scope_register(ptr %t8, ptr %t9)
    %t10 = load ptr, ptr %v._temp2
    store ptr %t10, ptr %v._ret
    %t11 = load ptr, ptr %v._ret
    call void @kiln_cpp_retain(ptr %t11)
    %t12 = load ptr, ptr %scope.s1
    call void @kiln_cpp_scope_exit(ptr %t12)
    %t13 = load ptr, ptr %v._ret
    ret ptr %t13
  }

  declare ptr @"kiln.lang::Integer._add"(ptr, ptr)
  declare ptr @kiln_cpp_field(ptr, ptr)
  declare void @kiln_cpp_retain(ptr)
  declare ptr @kiln_cpp_scope_enter()
  declare void @kiln_cpp_scope_exit(ptr)
  declare void @kiln_cpp_scope_register(ptr, ptr)

  @.str.0 = private unnamed_addr constant [6 x i8] c"count\00"
  "#);
}

#[test]
fn conditional_branches_split_blocks() {
  let mut b = MethodBuilder::new("app::Gate", "pick").as_static().with_param("flag", "boolean");
  let skip = b.reserve_label("skip");
  b.jump_if_false("flag", &skip);
  b.ret(None);
  b.place_label(&skip);
  b.ret(None);

  let gate = IrConstruct::new("app::Gate", ConstructKind::Class).with_method(b.finish().unwrap());
  let text = LlvmBackend::new(LlvmRuntime::Go).lower_construct(&gate).unwrap();

  assert_snapshot!(text, @r#"
  ; kiln llvm-go listing for app::Gate

  %"app::Gate" = type {}

  define void @"app::Gate.pick"(i1 %arg.flag) {
  entry:
    %v.flag = alloca i1
    store i1 %arg.flag, ptr %v.flag
    %t1 = load i1, ptr %v.flag
    br i1 %t1, label %cont.1, label %skip_1
  cont.1:
    ret void
  skip_1:
    ret void
  }
  "#);
}

#[test]
fn falling_into_a_label_and_code_after_return() {
  let mut b = MethodBuilder::new("app::Gate", "spin").with_param("flag", "kiln.lang::Boolean");
  let top = b.reserve_label("top");
  b.place_label(&top);
  b.jump_if_true("flag", &top);
  b.ret(None);
  b.retain("flag");

  let gate = IrConstruct::new("app::Gate", ConstructKind::Class).with_method(b.finish().unwrap());
  let text = LlvmBackend::new(LlvmRuntime::Cpp).lower_construct(&gate).unwrap();

  assert!(text.contains("  store ptr %arg.flag, ptr %v.flag\n  br label %top_1\ntop_1:\n"));
  assert!(text.contains("%t2 = call i1 @kiln_cpp_truth(ptr %t1)\n  br i1 %t2, label %top_1, label %cont.1\n"));
  assert!(text.contains("  ret void\ndead.2:\n  %t3 = load ptr, ptr %v.flag\n"));
  // Falling off the end of a void method returns.
  assert!(text.ends_with("  call void @kiln_cpp_retain(ptr %t3)\n  ret void\n}\n\ndeclare void @kiln_cpp_retain(ptr)\ndeclare i1 @kiln_cpp_truth(ptr)\n"));
}

#[test]
fn go_entry_exports_its_own_symbol() {
  let text = LlvmBackend::new(LlvmRuntime::Go).lower_entry_point(&entries(&["Hello", "World"])).unwrap();

  assert_snapshot!(text, @r#"
  ; kiln llvm-go entry

  @programs = private constant [2 x ptr] [ptr @.str.0, ptr @.str.1]

  define i32 @kiln_go_main(i32 %argc, ptr %argv) {
  entry:
    call void @kiln_go_runtime_init(i32 %argc, ptr %argv)
    %choice = call i32 @kiln_go_select_program(i32 %argc, ptr %argv, ptr @programs, i32 2)
    switch i32 %choice, label %usage [ i32 0, label %run0 i32 1, label %run1 ]
  run0:
    call void @"app::Hello.main"()
    ret i32 0
  run1:
    call void @"app::World.main"()
    ret i32 0
  usage:
    ret i32 2
  }

  declare void @kiln_go_runtime_init(i32, ptr)
  declare i32 @kiln_go_select_program(i32, ptr, ptr, i32)
  declare void @"app::Hello.main"()
  declare void @"app::World.main"()

  @.str.0 = private unnamed_addr constant [6 x i8] c"Hello\00"
  @.str.1 = private unnamed_addr constant [6 x i8] c"World\00"
  "#);
}

#[test]
fn cpp_entry_is_main() {
  let text = LlvmBackend::new(LlvmRuntime::Cpp).lower_entry_point(&entries(&["Hello"])).unwrap();

  assert!(text.contains("define i32 @main(i32 %argc, ptr %argv) {\nentry:\n  call void @kiln_cpp_runtime_init(i32 %argc, ptr %argv)\n  call void @\"app::Hello.main\"()\n  ret i32 0\n}\n"));
  assert!(!text.contains("select_program"));
}
