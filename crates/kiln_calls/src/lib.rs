//! Call resolution and call emission.
//!
//! A call site is described by a [`CallContext`]. [`CallResolver`] picks the
//! cheapest matching method, [`promotion`] inserts `#^` conversions for the
//! arguments that need them, [`details`] fills in the [`kiln_ir::CallDetails`]
//! and [`emit`] ties it all together on a [`kiln_ir::MethodBuilder`].

pub mod context;
pub mod details;
pub mod emit;
pub mod promotion;
pub mod resolve;

use std::fmt;

pub use context::CallContext;
pub use details::{build_call_details, extract_metadata};
pub use emit::{CallEmitter, CallOutcome, emit_call};
pub use promotion::{PromotionResult, build_promotions};
pub use resolve::{CallResolver, MethodResolutionResult, Resolution};

/// Internal faults while lowering a call that resolution already accepted.
///
/// These mean the resolver and the promotion pass disagree about the symbol
/// graph; they are never caused by user code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFault {
  /// Argument `index` has no direct or single-promotion path to its parameter.
  CannotPromote { method: String, index: usize, from: String, to: String },
  ArityMismatch { method: String, expected: usize, found: usize },
}

impl fmt::Display for CallFault {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      CallFault::CannotPromote { method, index, from, to } => {
        write!(f, "{}: argument {} of type '{}' cannot be promoted to '{}'", method, index, from, to)
      },
      CallFault::ArityMismatch {
        method,
        expected,
        found,
      } => write!(f, "{}: expected {} arguments, call site has {}", method, expected, found),
    }
  }
}

impl std::error::Error for CallFault {}
