use kiln_config::{CompilerFlags, DebugTrace};
use kiln_diagnostics::{DiagnosticCollector, DiagnosticMessage, SourceLocation};
use kiln_ir::MethodBuilder;
use kiln_log::trace_dbg;
use kiln_type::{MethodId, SymbolGraph};

use crate::{CallContext, CallFault, CallResolver, Resolution, build_call_details, build_promotions};

/// What a call site turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
  /// Result lives in this temporary, retained and registered to the call's scope.
  Value(String),
  /// Emitted; the method returns nothing.
  Unit,
  /// Nothing emitted; a diagnostic explains why.
  Reported,
}

/// Emits resolved calls into method bodies, collecting user diagnostics on the way.
pub struct CallEmitter<'a> {
  resolver: CallResolver<'a>,
  flags: &'a CompilerFlags,
  diagnostics: DiagnosticCollector,
}

impl<'a> CallEmitter<'a> {
  pub fn new(
    graph: &'a SymbolGraph,
    flags: &'a CompilerFlags,
  ) -> Self {
    Self {
      resolver: CallResolver::new(graph),
      flags,
      diagnostics: DiagnosticCollector::new(),
    }
  }

  pub fn diagnostics(&self) -> &DiagnosticCollector {
    &self.diagnostics
  }

  pub fn into_diagnostics(self) -> DiagnosticCollector {
    self.diagnostics
  }

  /// Resolve `context`, then emit promotions, the call, and ownership of its result.
  ///
  /// Ambiguous and unresolved calls are reported and emit nothing.
  pub fn emit_call(
    &mut self,
    builder: &mut MethodBuilder,
    context: &CallContext,
  ) -> Result<CallOutcome, CallFault> {
    let graph = self.resolver.graph();

    let resolved = match self.resolver.resolve(context) {
      Resolution::Resolved(resolved) => resolved,
      Resolution::Ambiguous(candidates) => {
        self.report_ambiguous(context, &candidates);
        return Ok(CallOutcome::Reported);
      },
      Resolution::Unresolved => {
        self.report_unresolved(context);
        return Ok(CallOutcome::Reported);
      },
    };

    trace_dbg!(
      self.flags,
      DebugTrace::Resolve,
      "{} -> {} (cost {}{})",
      context.method_name,
      self.resolver.signature(resolved.method),
      resolved.cost,
      if resolved.promotion_required { ", promoted" } else { "" }
    );

    let promotions = build_promotions(graph, builder, context, &resolved)?;
    builder.append(promotions.instructions);

    let details = build_call_details(graph, context, resolved.method);

    let previous = builder.debug_info().cloned();
    builder.set_debug_info(context.debug_info.clone());
    let dest = builder.call_owned(
      details,
      context.target_variable.as_deref(),
      promotions.arguments,
      &context.scope_id,
    );
    builder.set_debug_info(previous);

    Ok(match dest {
      Some(dest) => CallOutcome::Value(dest),
      None => CallOutcome::Unit,
    })
  }

  fn location(context: &CallContext) -> Option<SourceLocation> {
    context.debug_info.as_ref().map(SourceLocation::from)
  }

  fn target_name(
    &self,
    context: &CallContext,
  ) -> Option<String> {
    context.target_type.map(|ty| self.resolver.graph().type_name(ty).to_string())
  }

  fn report_ambiguous(
    &mut self,
    context: &CallContext,
    candidates: &[MethodId],
  ) {
    let message = DiagnosticMessage::AmbiguousCall {
      method: context.method_name.clone(),
      target: self.target_name(context),
      candidates: candidates.iter().map(|&m| self.resolver.signature(m)).collect(),
      at: Self::location(context),
    };
    self.diagnostics.report(message);
  }

  fn report_unresolved(
    &mut self,
    context: &CallContext,
  ) {
    let graph = self.resolver.graph();
    let message = DiagnosticMessage::UnresolvedCall {
      method: context.method_name.clone(),
      target: self.target_name(context),
      argument_types: context.argument_types.iter().map(|&ty| graph.type_name(ty).to_string()).collect(),
      at: Self::location(context),
    };
    self.diagnostics.report(message);
  }
}

/// One-off [`CallEmitter::emit_call`] that reports into an existing collector.
pub fn emit_call(
  graph: &SymbolGraph,
  flags: &CompilerFlags,
  builder: &mut MethodBuilder,
  context: &CallContext,
  diagnostics: &mut DiagnosticCollector,
) -> Result<CallOutcome, CallFault> {
  let mut emitter = CallEmitter::new(graph, flags);
  let outcome = emitter.emit_call(builder, context);
  diagnostics.extend(emitter.into_diagnostics());
  outcome
}
