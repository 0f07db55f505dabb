use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use kiln_backend::{
  CompilerFault, NodeVisitor, OutputLayout, Target, ToolchainProbe, locate_main_entry_visitor, locate_node_visitor,
  locate_target, locate_target_with,
};
use kiln_config::{CompilerFlags, DebugTrace};
use kiln_ir::{EntryPoint, IrConstruct, IrProgram, verify_construct};
use kiln_log::{PhaseTimer, log_dbg, phase_log, phase_ok, phase_warn, trace_dbg};

use crate::{CodegenReport, FailedConstruct, FailureReason};

/// Lower every construct of `program` for `flags.target` and write the entry artifact.
///
/// The program stays locked for the whole phase. Constructs that fail IR
/// verification or lowering are listed in the report; faults that make the
/// phase itself impossible (unsupported architecture, entry artifact write)
/// are returned as errors.
pub fn generate_code(
  program: &Mutex<IrProgram>,
  flags: &CompilerFlags,
) -> Result<CodegenReport, CompilerFault> {
  let target = locate_target(flags.target)?;
  run(program, flags, &target)
}

/// Like [`generate_code`], probing native toolchains with `probe`.
pub fn generate_code_with(
  program: &Mutex<IrProgram>,
  flags: &CompilerFlags,
  probe: Arc<dyn ToolchainProbe>,
) -> Result<CodegenReport, CompilerFault> {
  let target = locate_target_with(flags.target, probe)?;
  run(program, flags, &target)
}

fn run(
  program: &Mutex<IrProgram>,
  flags: &CompilerFlags,
  target: &Target,
) -> Result<CodegenReport, CompilerFault> {
  let architecture = target.architecture();
  let mut report = CodegenReport::new(architecture);

  if let Some(status) = target.toolchain_status() {
    trace_dbg!(flags, DebugTrace::Toolchain, "{}: {:?}", architecture, status);
  }

  if let Some(message) = target.unavailable_diagnostic() {
    phase_warn!(flags, "Skipping {}: {}", architecture, message);
    report.diagnostics.report(message);
    report.skipped = true;
    return Ok(report);
  }

  let timer = PhaseTimer::start("code generation");
  let layout = OutputLayout::from_flags(flags);
  let visitor = locate_node_visitor(architecture, &layout)?;
  let entry_visitor = locate_main_entry_visitor(architecture, &layout)?;

  let program = program
    .lock()
    .map_err(|_| CompilerFault::lowering("program", "a previous phase panicked while holding the program"))?;

  phase_log!(
    flags,
    "Generating {} code for {} constructs into {}",
    architecture,
    program.construct_count(),
    visitor.locator().dir().display()
  );

  let mut ready: Vec<&IrConstruct> = Vec::new();
  for construct in program.constructs() {
    match verify_construct(construct) {
      Ok(()) => ready.push(construct),
      Err(errors) => {
        trace_dbg!(flags, DebugTrace::Ir, "{} failed verification", construct.name);
        report.failed.push(FailedConstruct {
          name: construct.name.clone(),
          reason: FailureReason::Verification(errors),
        });
      },
    }
  }

  let mut lowered: HashSet<&str> = HashSet::new();
  for (construct, outcome) in lower_all(&visitor, &ready, flags) {
    match outcome {
      Ok(path) => {
        lowered.insert(construct.name.as_str());
        report.written.push(path);
      },
      Err(reason) => report.failed.push(FailedConstruct {
        name: construct.name.clone(),
        reason,
      }),
    }
  }

  // The entry may only dispatch to programs that were actually written.
  let (entries, dropped): (Vec<EntryPoint>, Vec<EntryPoint>) =
    program.entry_points().into_iter().partition(|e| lowered.contains(e.construct.as_str()));
  for entry in &dropped {
    log_dbg!(flags, "program {} failed, leaving it out of the entry", entry.construct);
  }

  if entries.is_empty() {
    log_dbg!(flags, "no program entry points, skipping {}", entry_visitor.entry_file_name());
  } else {
    trace_dbg!(flags, DebugTrace::Driver, "entry artifact for {} programs", entries.len());
    report.entry = Some(entry_visitor.visit(&entries)?);
  }

  if report.failed.is_empty() {
    phase_ok!(flags, "Wrote {} {} artifacts", report.written.len(), architecture);
  } else {
    phase_warn!(
      flags,
      "Wrote {} {} artifacts, {} constructs failed",
      report.written.len(),
      architecture,
      report.failed.len()
    );
  }
  timer.finish(flags);

  Ok(report)
}

type Lowered<'p> = (&'p IrConstruct, Result<PathBuf, FailureReason>);

/// Lower `constructs` on scoped worker threads. Results come back in input order.
fn lower_all<'p>(
  visitor: &NodeVisitor,
  constructs: &[&'p IrConstruct],
  flags: &CompilerFlags,
) -> Vec<Lowered<'p>> {
  if constructs.is_empty() {
    return Vec::new();
  }

  let workers = thread::available_parallelism().map_or(1, NonZeroUsize::get).min(constructs.len());
  let batch_size = constructs.len().div_ceil(workers);

  thread::scope(|scope| {
    let handles: Vec<_> = constructs
      .chunks(batch_size)
      .map(|batch| {
        let handle = scope.spawn(move || {
          batch
            .iter()
            .map(|construct| {
              trace_dbg!(flags, DebugTrace::Codegen, "lowering {}", construct.name);
              let outcome = visitor.visit(construct).map_err(FailureReason::Codegen);
              (*construct, outcome)
            })
            .collect::<Vec<Lowered<'p>>>()
        });
        (batch, handle)
      })
      .collect();

    let mut lowered = Vec::with_capacity(constructs.len());
    for (batch, handle) in handles {
      match handle.join() {
        Ok(results) => lowered.extend(results),
        Err(_) => lowered.extend(batch.iter().map(|c| (*c, Err(FailureReason::Panicked)))),
      }
    }
    lowered
  })
}
