//! Retain/register/release bookkeeping for one path through a method body.
//!
//! Each scope keeps the ordered list of values registered to it; exiting the
//! scope releases that list back to front, like dropping a stack of guards.

use std::collections::BTreeMap;
use std::fmt;

use crate::ScopeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueState {
  /// Freshly produced by a call or literal; nothing owns it yet.
  Unretained,
  Retained,
  Registered(ScopeId),
  Released,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScopeState {
  Open,
  Exited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipError {
  UnknownScope(ScopeId),
  ScopeEnteredTwice(ScopeId),
  ScopeExitedTwice(ScopeId),
  RegisterIntoClosedScope { variable: String, scope: ScopeId },
  RegisterWithoutRetain(String),
  DoubleRegistration { variable: String, first: ScopeId, second: ScopeId },
  ReleaseWithoutRetain(String),
  /// Explicit release of a value its scope will release again on exit.
  ReleaseOfRegistered { variable: String, scope: ScopeId },
  DoubleRelease(String),
  UseAfterRelease(String),
}

impl fmt::Display for OwnershipError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      OwnershipError::UnknownScope(scope) => write!(f, "scope '{}' was never entered", scope),
      OwnershipError::ScopeEnteredTwice(scope) => write!(f, "scope '{}' entered twice", scope),
      OwnershipError::ScopeExitedTwice(scope) => write!(f, "scope '{}' exited twice", scope),
      OwnershipError::RegisterIntoClosedScope { variable, scope } => {
        write!(f, "'{}' registered to scope '{}' after it exited", variable, scope)
      },
      OwnershipError::RegisterWithoutRetain(variable) => write!(f, "'{}' registered before being retained", variable),
      OwnershipError::DoubleRegistration { variable, first, second } => {
        write!(f, "'{}' registered to '{}' and again to '{}'", variable, first, second)
      },
      OwnershipError::ReleaseWithoutRetain(variable) => write!(f, "'{}' released without being retained", variable),
      OwnershipError::ReleaseOfRegistered { variable, scope } => {
        write!(f, "'{}' released explicitly while registered to '{}'", variable, scope)
      },
      OwnershipError::DoubleRelease(variable) => write!(f, "'{}' released twice", variable),
      OwnershipError::UseAfterRelease(variable) => write!(f, "'{}' used after release", variable),
    }
  }
}

/// Result of merging the state of another incoming path.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct JoinOutcome {
  pub changed: bool,
  pub conflict: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipTracker {
  values: BTreeMap<String, ValueState>,
  scopes: BTreeMap<ScopeId, ScopeState>,
  registered: BTreeMap<ScopeId, Vec<String>>,
}

impl OwnershipTracker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(
    &self,
    variable: &str,
  ) -> Option<&ValueState> {
    self.values.get(variable)
  }

  pub fn scope_state(
    &self,
    scope: &ScopeId,
  ) -> Option<ScopeState> {
    self.scopes.get(scope).copied()
  }

  /// Values registered to `scope`, in registration order.
  pub fn registered_to(
    &self,
    scope: &ScopeId,
  ) -> &[String] {
    self.registered.get(scope).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn produce(
    &mut self,
    variable: &str,
  ) {
    self.values.insert(variable.to_string(), ValueState::Unretained);
  }

  pub fn enter(
    &mut self,
    scope: &ScopeId,
  ) -> Result<(), OwnershipError> {
    if self.scopes.contains_key(scope) {
      return Err(OwnershipError::ScopeEnteredTwice(scope.clone()));
    }

    self.scopes.insert(scope.clone(), ScopeState::Open);
    Ok(())
  }

  pub fn check_use(
    &self,
    variable: &str,
  ) -> Result<(), OwnershipError> {
    match self.values.get(variable) {
      Some(ValueState::Released) => Err(OwnershipError::UseAfterRelease(variable.to_string())),
      _ => Ok(()),
    }
  }

  /// Variables never produced in this body (parameters, `this`) start tracking here.
  pub fn retain(
    &mut self,
    variable: &str,
  ) -> Result<(), OwnershipError> {
    match self.values.get(variable) {
      None | Some(ValueState::Unretained) => {
        self.values.insert(variable.to_string(), ValueState::Retained);
        Ok(())
      },
      Some(ValueState::Retained | ValueState::Registered(_)) => Ok(()),
      Some(ValueState::Released) => Err(OwnershipError::UseAfterRelease(variable.to_string())),
    }
  }

  pub fn register(
    &mut self,
    variable: &str,
    scope: &ScopeId,
  ) -> Result<(), OwnershipError> {
    match self.scopes.get(scope) {
      None => return Err(OwnershipError::UnknownScope(scope.clone())),
      Some(ScopeState::Exited) => {
        return Err(OwnershipError::RegisterIntoClosedScope {
          variable: variable.to_string(),
          scope: scope.clone(),
        });
      },
      Some(ScopeState::Open) => {},
    }

    match self.values.get(variable) {
      None | Some(ValueState::Unretained) => Err(OwnershipError::RegisterWithoutRetain(variable.to_string())),
      Some(ValueState::Registered(first)) => Err(OwnershipError::DoubleRegistration {
        variable: variable.to_string(),
        first: first.clone(),
        second: scope.clone(),
      }),
      Some(ValueState::Released) => Err(OwnershipError::UseAfterRelease(variable.to_string())),
      Some(ValueState::Retained) => {
        self.values.insert(variable.to_string(), ValueState::Registered(scope.clone()));
        self.registered.entry(scope.clone()).or_default().push(variable.to_string());
        Ok(())
      },
    }
  }

  pub fn release(
    &mut self,
    variable: &str,
  ) -> Result<(), OwnershipError> {
    match self.values.get(variable) {
      Some(ValueState::Retained) => {
        self.values.insert(variable.to_string(), ValueState::Released);
        Ok(())
      },
      None | Some(ValueState::Unretained) => Err(OwnershipError::ReleaseWithoutRetain(variable.to_string())),
      Some(ValueState::Registered(scope)) => Err(OwnershipError::ReleaseOfRegistered {
        variable: variable.to_string(),
        scope: scope.clone(),
      }),
      Some(ValueState::Released) => Err(OwnershipError::DoubleRelease(variable.to_string())),
    }
  }

  /// `dest` now refers to `src`'s value. A registered destination stays with
  /// its scope; anything else starts over as unretained.
  pub fn store(
    &mut self,
    dest: &str,
    src: &str,
  ) -> Result<(), OwnershipError> {
    self.check_use(src)?;

    if !matches!(self.values.get(dest), Some(ValueState::Registered(_))) {
      self.values.insert(dest.to_string(), ValueState::Unretained);
    }
    Ok(())
  }

  /// Close `scope`, releasing its values last-registered first.
  /// Returns the released values in release order.
  pub fn exit(
    &mut self,
    scope: &ScopeId,
  ) -> Result<Vec<String>, OwnershipError> {
    match self.scopes.get(scope) {
      None => return Err(OwnershipError::UnknownScope(scope.clone())),
      Some(ScopeState::Exited) => return Err(OwnershipError::ScopeExitedTwice(scope.clone())),
      Some(ScopeState::Open) => {},
    }
    self.scopes.insert(scope.clone(), ScopeState::Exited);

    let mut released = self.registered.get(scope).cloned().unwrap_or_default();
    released.reverse();

    for variable in &released {
      if self.values.get(variable) == Some(&ValueState::Registered(scope.clone())) {
        self.values.insert(variable.clone(), ValueState::Released);
      }
    }

    Ok(released)
  }

  /// Values still retained but owned by no scope. `returned` is handed to the caller.
  pub fn leaked_values(
    &self,
    returned: Option<&str>,
  ) -> Vec<String> {
    self
      .values
      .iter()
      .filter(|(name, state)| **state == ValueState::Retained && Some(name.as_str()) != returned)
      .map(|(name, _)| name.clone())
      .collect()
  }

  pub fn open_scopes(&self) -> Vec<ScopeId> {
    self
      .scopes
      .iter()
      .filter(|(_, state)| **state == ScopeState::Open)
      .map(|(scope, _)| scope.clone())
      .collect()
  }

  /// Forget scopes entered and exited since `earlier`, so the next loop
  /// iteration enters them afresh.
  pub fn restart_scopes_since(
    &mut self,
    earlier: &OwnershipTracker,
  ) {
    let finished: Vec<ScopeId> = self
      .scopes
      .iter()
      .filter(|(scope, state)| **state == ScopeState::Exited && !earlier.scopes.contains_key(*scope))
      .map(|(scope, _)| scope.clone())
      .collect();

    for scope in finished {
      self.scopes.remove(&scope);
      self.registered.remove(&scope);
    }
  }

  /// Merge the state reaching the same point along another path.
  ///
  /// Values and registrations only seen on one path are unioned in, since
  /// runtime scopes release whatever was actually registered. A value or
  /// scope in different states on the two paths is a conflict.
  pub fn join(
    &mut self,
    other: &OwnershipTracker,
  ) -> JoinOutcome {
    let mut outcome = JoinOutcome::default();

    for (name, state) in &other.values {
      match self.values.get(name) {
        None => {
          self.values.insert(name.clone(), state.clone());
          outcome.changed = true;
        },
        Some(existing) if existing != state => outcome.conflict = true,
        Some(_) => {},
      }
    }

    for (scope, state) in &other.scopes {
      match self.scopes.get(scope) {
        None => {
          self.scopes.insert(scope.clone(), *state);
          outcome.changed = true;
        },
        Some(existing) if existing != state => outcome.conflict = true,
        Some(_) => {},
      }
    }
    if self.scopes.keys().any(|scope| !other.scopes.contains_key(scope)) {
      outcome.conflict = true;
    }

    for (scope, values) in &other.registered {
      let mine = self.registered.entry(scope.clone()).or_default();
      for value in values {
        if !mine.contains(value) {
          mine.push(value.clone());
          outcome.changed = true;
        }
      }
    }

    outcome
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn s(name: &str) -> ScopeId {
    ScopeId::new(name)
  }

  #[test]
  fn exit_releases_in_reverse_registration_order() {
    let mut t = OwnershipTracker::new();
    t.enter(&s("s1")).unwrap();
    for v in ["a", "b", "c"] {
      t.produce(v);
      t.retain(v).unwrap();
      t.register(v, &s("s1")).unwrap();
    }

    assert_eq!(t.exit(&s("s1")).unwrap(), vec!["c", "b", "a"]);
    assert_eq!(t.state("a"), Some(&ValueState::Released));
    assert_eq!(t.check_use("b"), Err(OwnershipError::UseAfterRelease("b".to_string())));
  }

  #[test]
  fn a_value_belongs_to_one_scope() {
    let mut t = OwnershipTracker::new();
    t.enter(&s("s1")).unwrap();
    t.enter(&s("s2")).unwrap();
    t.produce("v");
    t.retain("v").unwrap();
    t.register("v", &s("s1")).unwrap();

    assert_eq!(
      t.register("v", &s("s2")),
      Err(OwnershipError::DoubleRegistration {
        variable: "v".to_string(),
        first: s("s1"),
        second: s("s2"),
      })
    );
  }

  #[test]
  fn scopes_exit_once() {
    let mut t = OwnershipTracker::new();
    t.enter(&s("s1")).unwrap();
    t.exit(&s("s1")).unwrap();

    assert_eq!(t.exit(&s("s1")), Err(OwnershipError::ScopeExitedTwice(s("s1"))));
    assert_eq!(t.exit(&s("s9")), Err(OwnershipError::UnknownScope(s("s9"))));
  }

  #[test]
  fn registration_requires_a_retain() {
    let mut t = OwnershipTracker::new();
    t.enter(&s("s1")).unwrap();
    t.produce("v");

    assert_eq!(t.register("v", &s("s1")), Err(OwnershipError::RegisterWithoutRetain("v".to_string())));
  }

  #[test]
  fn retained_but_unregistered_values_leak() {
    let mut t = OwnershipTracker::new();
    t.produce("v");
    t.retain("v").unwrap();
    t.produce("_ret");
    t.retain("_ret").unwrap();

    assert_eq!(t.leaked_values(Some("_ret")), vec!["v".to_string()]);
  }

  #[test]
  fn joining_differently_exited_scopes_conflicts() {
    let mut a = OwnershipTracker::new();
    a.enter(&s("s1")).unwrap();
    let mut b = a.clone();
    b.exit(&s("s1")).unwrap();

    assert!(a.join(&b).conflict);
  }

  #[test]
  fn restarting_forgets_only_scopes_finished_since() {
    let mut head = OwnershipTracker::new();
    head.enter(&s("s1")).unwrap();

    let mut state = head.clone();
    state.enter(&s("s2")).unwrap();
    state.produce("v");
    state.retain("v").unwrap();
    state.register("v", &s("s2")).unwrap();
    state.exit(&s("s2")).unwrap();
    state.enter(&s("s3")).unwrap();

    state.restart_scopes_since(&head);

    assert_eq!(state.scope_state(&s("s1")), Some(ScopeState::Open));
    assert_eq!(state.scope_state(&s("s2")), None);
    assert!(state.registered_to(&s("s2")).is_empty());
    assert_eq!(state.scope_state(&s("s3")), Some(ScopeState::Open), "still open, so re-entering it is an error");
    assert_eq!(state.state("v"), Some(&ValueState::Released));
    assert!(state.enter(&s("s2")).is_ok());
  }
}
