//! Stderr logging for the kiln pipeline.
//!
//! Phase progress uses colored arrows (`phase_log!`, `phase_ok!`, `phase_warn!`),
//! per-component debug output is gated on `--debug-trace` (`trace_dbg!`) and
//! general chatter on the verbosity level (`log_dbg!`, `log_trc!`).
//!
//! Nothing here writes to stdout, which stays free for dumps.

use std::time::{Duration, Instant};

use kiln_config::{CompilerFlags, DebugTrace};

#[doc(hidden)]
pub use colored;

pub fn effective_verbose(flags: &CompilerFlags) -> u8 {
  if flags.quiet {
    0
  } else if flags.debug {
    flags.verbose.max(2)
  } else {
    flags.verbose
  }
}

pub fn log_phase(flags: &CompilerFlags) -> bool {
  !flags.quiet
}

pub fn log_info(flags: &CompilerFlags) -> bool {
  effective_verbose(flags) >= 1
}

pub fn log_debug(flags: &CompilerFlags) -> bool {
  effective_verbose(flags) >= 2
}

pub fn log_trace(flags: &CompilerFlags) -> bool {
  effective_verbose(flags) >= 3
}

pub fn debug_trace_enabled(
  flags: &CompilerFlags,
  trace: DebugTrace,
) -> bool {
  if flags.quiet {
    return false;
  }

  flags.debug || flags.debug_trace.contains(&trace)
}

pub fn trace_name(trace: DebugTrace) -> &'static str {
  match trace {
    DebugTrace::Resolve => "resolve",
    DebugTrace::Ir => "ir",
    DebugTrace::Ownership => "ownership",
    DebugTrace::Codegen => "codegen",
    DebugTrace::Toolchain => "toolchain",
    DebugTrace::Driver => "driver",
  }
}

/// Wall-clock timer for one pipeline phase, reported through `phase_ok!` when verbose.
pub struct PhaseTimer {
  name: &'static str,
  started: Instant,
}

impl PhaseTimer {
  pub fn start(name: &'static str) -> Self {
    Self {
      name,
      started: Instant::now(),
    }
  }

  pub fn elapsed(&self) -> Duration {
    self.started.elapsed()
  }

  pub fn finish(
    self,
    flags: &CompilerFlags,
  ) -> Duration {
    let elapsed = self.elapsed();
    if log_info(flags) {
      crate::phase_ok!(flags, "{} finished in {:.2?}", self.name, elapsed);
    }
    elapsed
  }
}

/// Phase progress line, indented four columns unless told otherwise.
///
/// ```ignore
/// phase_log!(&flags, "Lowering {} constructs", count);
/// phase_log!(&flags, indent = 8, "module {}", name);
/// ```
#[macro_export]
macro_rules! phase_log {
  ($flags:expr, indent = $indent:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    if $crate::log_phase($flags) {
      use $crate::colored::Colorize;
      eprintln!(
        "{:indent$}{} {}",
        "",
        "-->".bright_green().bold(),
        format!($fmt $(, $arg)*),
        indent = $indent
      );
    }
  }};

  ($flags:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    $crate::phase_log!($flags, indent = 4, $fmt $(, $arg)*);
  }};
}

/// ```ignore
/// phase_ok!(&flags, "Generated {} files", written);
/// ```
#[macro_export]
macro_rules! phase_ok {
  ($flags:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    if $crate::log_phase($flags) {
      use $crate::colored::Colorize;
      eprintln!("{} {}", "-->".bright_green().bold(), format!($fmt $(, $arg)*));
    }
  }};
}

/// ```ignore
/// phase_warn!(&flags, "target {} is unavailable", target);
/// ```
#[macro_export]
macro_rules! phase_warn {
  ($flags:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    if $crate::log_phase($flags) {
      use $crate::colored::Colorize;
      eprintln!("{} {}", "-->".bright_yellow().bold(), format!($fmt $(, $arg)*));
    }
  }};
}

/// Component trace, printed as `debug[component]: message`.
///
/// ```ignore
/// trace_dbg!(&flags, DebugTrace::Resolve, "{} candidates for {}", count, name);
/// // debug[resolve]: 2 candidates for add
/// ```
#[macro_export]
macro_rules! trace_dbg {
  ($flags:expr, $trace:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    if $crate::debug_trace_enabled($flags, $trace) {
      use $crate::colored::Colorize;
      eprintln!(
        "{}: {}",
        format!("debug[{}]", $crate::trace_name($trace)).dimmed(),
        format!($fmt $(, $arg)*)
      );
    }
  }};
}

/// Verbosity 2 and up.
#[macro_export]
macro_rules! log_dbg {
  ($flags:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    if $crate::log_debug($flags) {
      eprintln!("debug: {}", format!($fmt $(, $arg)*));
    }
  }};
}

/// Verbosity 3 and up.
#[macro_export]
macro_rules! log_trc {
  ($flags:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    if $crate::log_trace($flags) {
      eprintln!("trace: {}", format!($fmt $(, $arg)*));
    }
  }};
}
