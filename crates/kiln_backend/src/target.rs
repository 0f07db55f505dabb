use std::fmt;
use std::sync::Arc;

use kiln_config::TargetArchitecture;
use kiln_diagnostics::DiagnosticMessage;

use crate::CompilerFault;
use crate::toolchain::{ToolchainProbe, ToolchainStatus, shared_clang_probe};

/// A requested architecture plus the way to tell whether this host can build it.
#[derive(Clone)]
pub struct Target {
  architecture: TargetArchitecture,
  /// Present for targets that need an external toolchain.
  probe: Option<Arc<dyn ToolchainProbe>>,
}

impl Target {
  pub fn architecture(&self) -> TargetArchitecture {
    self.architecture
  }

  /// `None` for targets without external requirements.
  pub fn toolchain_status(&self) -> Option<ToolchainStatus> {
    self.probe.as_ref().map(|probe| probe.probe())
  }

  pub fn is_supported(&self) -> bool {
    self.probe.as_ref().map_or(true, |probe| probe.probe().is_available())
  }

  /// Warning describing why the target cannot be built here.
  pub fn unavailable_diagnostic(&self) -> Option<DiagnosticMessage> {
    let probe = self.probe.as_ref()?;
    let status = probe.probe();
    if status.is_available() {
      return None;
    }

    Some(DiagnosticMessage::TargetUnavailable {
      target: self.architecture.to_string(),
      executable: probe.executable().to_string(),
      minimum_version: probe.minimum_version(),
      found_version: status.found_version(),
    })
  }
}

impl fmt::Debug for Target {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Target")
      .field("architecture", &self.architecture)
      .field("probed", &self.probe.is_some())
      .finish()
  }
}

/// Target for `architecture`, probing native toolchains through the shared probe.
pub fn locate_target(architecture: TargetArchitecture) -> Result<Target, CompilerFault> {
  locate_target_with(architecture, shared_clang_probe())
}

/// Like [`locate_target`] with an explicit probe for the native targets.
pub fn locate_target_with(
  architecture: TargetArchitecture,
  native_probe: Arc<dyn ToolchainProbe>,
) -> Result<Target, CompilerFault> {
  let probe = match architecture {
    TargetArchitecture::Jvm => None,
    TargetArchitecture::LlvmCpp | TargetArchitecture::LlvmGo => Some(native_probe),
    TargetArchitecture::NotSupported => {
      return Err(CompilerFault::unsupported("locate_target", architecture.to_string()));
    },
  };

  Ok(Target { architecture, probe })
}
