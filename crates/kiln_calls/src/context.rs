use kiln_ir::{DebugInfo, ScopeId};
use kiln_type::{TypeId, symbol::operator_map};

/// One call site, as seen by IR generation.
#[derive(Debug, Clone, PartialEq)]
pub struct CallContext {
  /// Static receiver type; `None` for free function calls.
  pub target_type: Option<TypeId>,
  /// Variable holding the receiver. `None` for calls dispatched on the type alone.
  pub target_variable: Option<String>,
  /// Method name or operator symbol as written (`add`, `==`, `#^`).
  pub method_name: String,
  pub argument_types: Vec<TypeId>,
  pub argument_variables: Vec<String>,
  /// Scope that owns the call's result and any promoted temporaries.
  pub scope_id: ScopeId,
  pub debug_info: Option<DebugInfo>,
}

impl CallContext {
  pub fn method(
    target_type: TypeId,
    target_variable: impl Into<String>,
    method_name: impl Into<String>,
    scope_id: ScopeId,
  ) -> Self {
    Self {
      target_type: Some(target_type),
      target_variable: Some(target_variable.into()),
      method_name: method_name.into(),
      argument_types: Vec::new(),
      argument_variables: Vec::new(),
      scope_id,
      debug_info: None,
    }
  }

  pub fn function(
    name: impl Into<String>,
    scope_id: ScopeId,
  ) -> Self {
    Self {
      target_type: None,
      target_variable: None,
      method_name: name.into(),
      argument_types: Vec::new(),
      argument_variables: Vec::new(),
      scope_id,
      debug_info: None,
    }
  }

  pub fn with_argument(
    mut self,
    variable: impl Into<String>,
    ty: TypeId,
  ) -> Self {
    self.argument_variables.push(variable.into());
    self.argument_types.push(ty);
    self
  }

  pub fn with_debug_info(
    mut self,
    debug_info: Option<DebugInfo>,
  ) -> Self {
    self.debug_info = debug_info;
    self
  }

  pub fn arity(&self) -> usize {
    self.argument_types.len()
  }

  /// Name to look up on the target: operator symbols become their method names.
  pub fn lookup_name(&self) -> &str {
    operator_map().method_name_for(&self.method_name)
  }

  pub fn is_operator(&self) -> bool {
    operator_map().by_symbol(&self.method_name).is_some()
  }
}
