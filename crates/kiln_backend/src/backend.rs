use std::fs;
use std::path::PathBuf;

use kiln_config::TargetArchitecture;
use kiln_ir::{EntryPoint, IrConstruct};

use crate::CompilerFault;
use crate::jvm::JvmBackend;
use crate::layout::{OutputLayout, OutputLocator};
use crate::llvm::{LlvmBackend, LlvmRuntime};

/// What every architecture provides: text for one construct and text for the program entry.
pub trait CodegenBackend: Send + Sync {
  fn architecture(&self) -> TargetArchitecture;

  fn file_extension(&self) -> &'static str;

  /// File stem of the entry artifact. Never a valid construct name.
  fn entry_file_stem(&self) -> &'static str {
    "kiln-entry"
  }

  fn lower_construct(
    &self,
    construct: &IrConstruct,
  ) -> Result<String, CompilerFault>;

  fn lower_entry_point(
    &self,
    entries: &[EntryPoint],
  ) -> Result<String, CompilerFault>;
}

/// Backend for `architecture`. Exhaustive: a new architecture will not compile until it is handled here.
pub fn backend_for(architecture: TargetArchitecture) -> Result<Box<dyn CodegenBackend>, CompilerFault> {
  match architecture {
    TargetArchitecture::Jvm => Ok(Box::new(JvmBackend)),
    TargetArchitecture::LlvmCpp => Ok(Box::new(LlvmBackend::new(LlvmRuntime::Cpp))),
    TargetArchitecture::LlvmGo => Ok(Box::new(LlvmBackend::new(LlvmRuntime::Go))),
    TargetArchitecture::NotSupported => Err(CompilerFault::unsupported("backend_for", architecture.to_string())),
  }
}

/// Lowers one construct at a time into its own file.
pub struct NodeVisitor {
  backend: Box<dyn CodegenBackend>,
  locator: OutputLocator,
}

impl NodeVisitor {
  pub fn architecture(&self) -> TargetArchitecture {
    self.backend.architecture()
  }

  pub fn locator(&self) -> &OutputLocator {
    &self.locator
  }

  /// Lower `construct` and write it; returns the written path.
  pub fn visit(
    &self,
    construct: &IrConstruct,
  ) -> Result<PathBuf, CompilerFault> {
    let text = self.backend.lower_construct(construct)?;
    let path = self.locator.prepare(&construct.name)?;
    fs::write(&path, text).map_err(|e| CompilerFault::io(&path, e))?;
    Ok(path)
  }
}

/// Writes the single entry artifact for the whole build.
pub struct EntryVisitor {
  backend: Box<dyn CodegenBackend>,
  locator: OutputLocator,
}

impl EntryVisitor {
  pub fn entry_file_name(&self) -> String {
    format!("{}.{}", self.backend.entry_file_stem(), self.backend.file_extension())
  }

  pub fn visit(
    &self,
    entries: &[EntryPoint],
  ) -> Result<PathBuf, CompilerFault> {
    let text = self.backend.lower_entry_point(entries)?;
    let path = self.locator.prepare_file(&self.entry_file_name())?;
    fs::write(&path, text).map_err(|e| CompilerFault::io(&path, e))?;
    Ok(path)
  }
}

/// Output locator for `architecture` under `layout`.
pub fn locate_output_file_for(
  architecture: TargetArchitecture,
  layout: &OutputLayout,
) -> Result<OutputLocator, CompilerFault> {
  let backend = backend_for(architecture)?;
  Ok(OutputLocator::new(layout.architecture_dir(architecture), backend.file_extension()))
}

pub fn locate_node_visitor(
  architecture: TargetArchitecture,
  layout: &OutputLayout,
) -> Result<NodeVisitor, CompilerFault> {
  let backend = backend_for(architecture)?;
  let locator = OutputLocator::new(layout.architecture_dir(architecture), backend.file_extension());
  Ok(NodeVisitor { backend, locator })
}

pub fn locate_main_entry_visitor(
  architecture: TargetArchitecture,
  layout: &OutputLayout,
) -> Result<EntryVisitor, CompilerFault> {
  let backend = backend_for(architecture)?;
  let locator = OutputLocator::new(layout.architecture_dir(architecture), backend.file_extension());
  Ok(EntryVisitor { backend, locator })
}
