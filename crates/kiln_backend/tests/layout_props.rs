use std::path::Path;

use kiln_backend::{construct_name, relative_path};
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
  "[a-z_][a-z0-9_]{0,7}"
}

fn type_name() -> impl Strategy<Value = String> {
  "[A-Z][A-Za-z0-9]{0,7}"
}

proptest! {
  #[test]
  fn paths_map_back_to_names(
    module in prop::collection::vec(segment(), 0..4),
    simple in type_name(),
  ) {
    let name = if module.is_empty() {
      simple.clone()
    } else {
      format!("{}::{}", module.join("."), simple)
    };

    let path = relative_path(&name, "ll").unwrap();
    prop_assert_eq!(path.components().count(), module.len() + 1);
    prop_assert_eq!(construct_name(&path, "ll"), Some(name));
  }

  #[test]
  fn distinct_names_never_share_a_path(
    a in prop::collection::vec(segment(), 1..3),
    b in prop::collection::vec(segment(), 1..3),
    simple in type_name(),
  ) {
    let left = format!("{}::{}", a.join("."), simple);
    let right = format!("{}::{}", b.join("."), simple);
    prop_assume!(left != right);

    prop_assert_ne!(relative_path(&left, "jasm").unwrap(), relative_path(&right, "jasm").unwrap());
  }
}

#[test]
fn foreign_paths_are_not_construct_names() {
  assert_eq!(construct_name(Path::new("app/User.jasm"), "ll"), None);
  assert_eq!(construct_name(Path::new("../User.ll"), "ll"), None);
  assert_eq!(construct_name(Path::new("app/kiln-entry.ll"), "ll"), None);
}
