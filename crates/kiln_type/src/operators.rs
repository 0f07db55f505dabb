use std::collections::HashMap;

pub const PROMOTE_OPERATOR: &str = "#^";
pub const IS_SET_OPERATOR: &str = "?";
pub const EQUALS_OPERATOR: &str = "==";
pub const NOT_EQUALS_OPERATOR: &str = "<>";
pub const COMPARE_OPERATOR: &str = "<=>";
pub const HASH_CODE_OPERATOR: &str = "#?";

/// Static facts about one source-level operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorDetails {
  pub symbol: &'static str,
  pub method_name: &'static str,
  pub pure: bool,
  pub requires_argument: bool,
  pub has_return: bool,
}

impl OperatorDetails {
  /// Side effects a call through this operator may have, for call metadata.
  pub fn side_effects(&self) -> Vec<String> {
    if self.pure {
      Vec::new()
    } else if self.has_return {
      vec!["mutates-receiver".to_string()]
    } else {
      vec!["mutates-receiver".to_string(), "no-result".to_string()]
    }
  }
}

/// Bidirectional operator table: symbol <-> implementing method name.
#[derive(Debug, Clone)]
pub struct OperatorMap {
  forward: HashMap<&'static str, OperatorDetails>,
  backward: HashMap<&'static str, OperatorDetails>,
}

impl OperatorMap {
  pub fn new() -> Self {
    let mut map = Self {
      forward: HashMap::new(),
      backward: HashMap::new(),
    };

    // comparison
    map.add("<", "_lt", true, true, true);
    map.add("<=", "_lteq", true, true, true);
    map.add(">", "_gt", true, true, true);
    map.add(">=", "_gteq", true, true, true);
    map.add(EQUALS_OPERATOR, "_eq", true, true, true);
    map.add(NOT_EQUALS_OPERATOR, "_neq", true, true, true);
    map.add(COMPARE_OPERATOR, "_cmp", true, true, true);
    map.add("<~>", "_fuzzy", true, true, true);

    // arithmetic
    map.add("+", "_add", true, true, true);
    map.add("-", "_sub", true, true, true);
    map.add("*", "_mul", true, true, true);
    map.add("/", "_div", true, true, true);
    map.add("^", "_pow", true, true, true);
    map.add("mod", "_mod", true, true, true);
    map.add("rem", "_rem", true, true, true);
    map.add("~", "_negate", true, false, true);
    map.add("abs", "_abs", true, false, true);
    map.add("sqrt", "_sqrt", true, false, true);
    map.add("<<", "_shftl", true, true, true);
    map.add(">>", "_shftr", true, true, true);

    // mutating
    map.add("++", "_inc", false, false, true);
    map.add("--", "_dec", false, false, true);
    map.add("+=", "_addAss", false, true, false);
    map.add("-=", "_subAss", false, true, false);
    map.add("*=", "_mulAss", false, true, false);
    map.add("/=", "_divAss", false, true, false);
    map.add(":=:", "_copy", false, true, false);
    map.add(":^:", "_replace", false, true, false);
    map.add(":~:", "_merge", false, true, false);
    map.add("|", "_pipe", false, true, false);

    // logical
    map.add("and", "_and", true, true, true);
    map.add("or", "_or", true, true, true);
    map.add("xor", "_xor", true, true, true);

    // conversion and introspection
    map.add(PROMOTE_OPERATOR, "_promote", true, false, true);
    map.add(IS_SET_OPERATOR, "_isSet", true, false, true);
    map.add("$", "_string", true, false, true);
    map.add("$$", "_json", true, false, true);
    map.add(HASH_CODE_OPERATOR, "_hashcode", true, false, true);
    map.add("#<", "_prefix", true, false, true);
    map.add("#>", "_suffix", true, false, true);
    map.add("length", "_len", true, false, true);
    map.add("empty", "_empty", true, false, true);
    map.add("contains", "_contains", true, true, true);
    map.add("matches", "_matches", true, true, true);
    map.add("close", "_close", true, false, false);

    map
  }

  fn add(
    &mut self,
    symbol: &'static str,
    method_name: &'static str,
    pure: bool,
    requires_argument: bool,
    has_return: bool,
  ) {
    let details = OperatorDetails {
      symbol,
      method_name,
      pure,
      requires_argument,
      has_return,
    };
    self.forward.insert(symbol, details.clone());
    self.backward.insert(method_name, details);
  }

  pub fn by_symbol(
    &self,
    symbol: &str,
  ) -> Option<&OperatorDetails> {
    self.forward.get(symbol)
  }

  pub fn by_method(
    &self,
    method_name: &str,
  ) -> Option<&OperatorDetails> {
    self.backward.get(method_name)
  }

  /// Map an operator symbol to its method name, or pass a plain method name through.
  pub fn method_name_for<'a>(
    &self,
    name: &'a str,
  ) -> &'a str {
    match self.forward.get(name) {
      Some(details) => details.method_name,
      None => name,
    }
  }

  pub fn is_operator_method(
    &self,
    method_name: &str,
  ) -> bool {
    self.backward.contains_key(method_name)
  }
}

impl Default for OperatorMap {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn forward_and_backward_agree() {
    let map = OperatorMap::new();

    let eq = map.by_symbol("==").unwrap();
    assert_eq!(eq.method_name, "_eq");
    assert_eq!(map.by_method("_eq").unwrap().symbol, "==");
  }

  #[test]
  fn plain_names_pass_through() {
    let map = OperatorMap::new();

    assert_eq!(map.method_name_for("#^"), "_promote");
    assert_eq!(map.method_name_for("add"), "add");
  }

  #[test]
  fn impure_operators_report_side_effects() {
    let map = OperatorMap::new();

    assert!(map.by_symbol("+").unwrap().side_effects().is_empty());
    assert_eq!(map.by_symbol("+=").unwrap().side_effects().len(), 2);
  }
}
