//! Code generation for the supported target architectures.
//!
//! A [`Target`] says whether the host can build an architecture at all, a
//! [`NodeVisitor`] writes one artifact per construct and an [`EntryVisitor`]
//! writes the entry artifact that dispatches to the program's runnables.

pub mod backend;
pub mod errors;
pub mod jvm;
pub mod layout;
pub mod llvm;
pub mod target;
pub mod toolchain;

pub use backend::{
  CodegenBackend, EntryVisitor, NodeVisitor, backend_for, locate_main_entry_visitor, locate_node_visitor,
  locate_output_file_for,
};
pub use errors::CompilerFault;
pub use jvm::JvmBackend;
pub use layout::{OutputLayout, OutputLocator, construct_name, relative_path};
pub use llvm::{LlvmBackend, LlvmRuntime};
pub use target::{Target, locate_target, locate_target_with};
pub use toolchain::{CachedProbe, ClangProbe, ToolchainProbe, ToolchainStatus};
