//! Numeric match costs used by overload resolution.
//!
//! Lower is better. The scale is:
//!
//! ```text
//!   0.00            identical types
//!   0.01 per step   assignable through a supertype chain
//!   0.02 per step   assignable through a trait
//!   < 0.50          cap for any subtype path
//!   1.00 + direct   assignable only after a single `#^` promotion
//!   NotAssignable   no path at all
//! ```
//!
//! So an exact match always beats a subtype match, which always beats a
//! promotion, which always beats no match.

use std::fmt;
use std::ops::Add;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

pub const PERFECT_COST: f64 = 0.0;
pub const SUPERTYPE_STEP_COST: f64 = 0.01;
pub const TRAIT_STEP_COST: f64 = 0.02;
pub const MAX_SUBTYPE_COST: f64 = 0.49;
pub const PROMOTION_COST: f64 = 1.0;

/// Two totals closer than this are treated as the same cost.
pub const AMBIGUITY_TOLERANCE: f64 = 0.001;

/// A valid (assignable) cost. Never negative.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Cost(OrderedFloat<f64>);

impl Cost {
  pub const PERFECT: Cost = Cost(OrderedFloat(PERFECT_COST));

  pub fn new(value: f64) -> Self {
    debug_assert!(value >= 0.0, "cost must not be negative");
    Self(OrderedFloat(value.max(0.0)))
  }

  pub fn subtype(value: f64) -> Self {
    Self::new(value.min(MAX_SUBTYPE_COST))
  }

  pub fn value(&self) -> f64 {
    self.0.into_inner()
  }

  pub fn is_perfect(&self) -> bool {
    self.value() == PERFECT_COST
  }

  /// Whether reaching this cost needed a promotion rather than plain subtyping.
  pub fn involves_promotion(&self) -> bool {
    self.value() >= PROMOTION_COST
  }

  pub fn ties_with(
    &self,
    other: &Cost,
  ) -> bool {
    (self.value() - other.value()).abs() < AMBIGUITY_TOLERANCE
  }
}

impl Add for Cost {
  type Output = Cost;

  fn add(
    self,
    rhs: Cost,
  ) -> Cost {
    Cost::new(self.value() + rhs.value())
  }
}

impl fmt::Display for Cost {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{:.2}", self.value())
  }
}

/// Outcome of asking whether one type can be passed where another is expected.
///
/// Variant order matters: every `Assignable` sorts before `NotAssignable`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchCost {
  Assignable(Cost),
  NotAssignable,
}

impl MatchCost {
  pub fn perfect() -> Self {
    MatchCost::Assignable(Cost::PERFECT)
  }

  pub fn is_assignable(&self) -> bool {
    matches!(self, MatchCost::Assignable(_))
  }

  pub fn cost(&self) -> Option<Cost> {
    match self {
      MatchCost::Assignable(cost) => Some(*cost),
      MatchCost::NotAssignable => None,
    }
  }

  /// Sum two argument costs; any unassignable argument poisons the total.
  pub fn combine(
    self,
    other: MatchCost,
  ) -> MatchCost {
    match (self, other) {
      (MatchCost::Assignable(a), MatchCost::Assignable(b)) => MatchCost::Assignable(a + b),
      _ => MatchCost::NotAssignable,
    }
  }
}

impl fmt::Display for MatchCost {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      MatchCost::Assignable(cost) => write!(f, "{}", cost),
      MatchCost::NotAssignable => write!(f, "not assignable"),
    }
  }
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  #[test]
  fn ordering_is_exact_then_subtype_then_promotion_then_nothing() {
    let exact = MatchCost::perfect();
    let subtype = MatchCost::Assignable(Cost::subtype(SUPERTYPE_STEP_COST * 3.0));
    let promoted = MatchCost::Assignable(Cost::new(PROMOTION_COST));
    let none = MatchCost::NotAssignable;

    assert!(exact < subtype);
    assert!(subtype < promoted);
    assert!(promoted < none);
  }

  #[test]
  fn subtype_cost_is_capped_below_promotion() {
    let deep = Cost::subtype(SUPERTYPE_STEP_COST * 500.0);
    assert!(!deep.involves_promotion());
    assert!(deep < Cost::new(PROMOTION_COST));
  }

  #[test]
  fn combine_poisons_on_unassignable() {
    let total = MatchCost::perfect().combine(MatchCost::NotAssignable);
    assert_eq!(total, MatchCost::NotAssignable);

    let total = MatchCost::Assignable(Cost::new(0.01)).combine(MatchCost::Assignable(Cost::new(1.0)));
    assert!(total.cost().unwrap().ties_with(&Cost::new(1.01)));
  }

  proptest! {
    #[test]
    fn any_subtype_path_beats_any_promotion(
      supers in 0u32..200,
      traits in 0u32..200,
      promoted in 0u32..50,
    ) {
      let path = SUPERTYPE_STEP_COST * supers as f64 + TRAIT_STEP_COST * traits as f64;
      let subtype = MatchCost::Assignable(Cost::subtype(path));
      let promotion = MatchCost::Assignable(
        Cost::new(PROMOTION_COST) + Cost::subtype(SUPERTYPE_STEP_COST * promoted as f64),
      );

      prop_assert!(subtype < promotion);
      prop_assert!(promotion < MatchCost::NotAssignable);
    }
  }
}
