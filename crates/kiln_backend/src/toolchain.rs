//! Host toolchain probing for the native targets.
//!
//! Probing runs an external process, so the shared probe is initialized at
//! most once per process and every `Target` reads the cached answer.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, OnceLock};

pub const CLANG_EXECUTABLE: &str = "clang";
pub const CLANG_MINIMUM_MAJOR: u32 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainStatus {
  Available { version: u32 },
  NotFound,
  TooOld { found: u32 },
  /// Found, but running it or reading its version failed.
  Unusable { reason: String },
}

impl ToolchainStatus {
  pub fn is_available(&self) -> bool {
    matches!(self, ToolchainStatus::Available { .. })
  }

  pub fn found_version(&self) -> Option<u32> {
    match self {
      ToolchainStatus::Available { version } => Some(*version),
      ToolchainStatus::TooOld { found } => Some(*found),
      ToolchainStatus::NotFound | ToolchainStatus::Unusable { .. } => None,
    }
  }
}

pub trait ToolchainProbe: Send + Sync {
  fn executable(&self) -> &str;

  fn minimum_version(&self) -> u32;

  fn probe(&self) -> ToolchainStatus;
}

/// Finds `clang` on `PATH` and checks `clang --version`.
#[derive(Debug, Clone)]
pub struct ClangProbe {
  executable: String,
  minimum_major: u32,
}

impl ClangProbe {
  pub fn new(
    executable: impl Into<String>,
    minimum_major: u32,
  ) -> Self {
    Self {
      executable: executable.into(),
      minimum_major,
    }
  }
}

impl Default for ClangProbe {
  fn default() -> Self {
    Self::new(CLANG_EXECUTABLE, CLANG_MINIMUM_MAJOR)
  }
}

impl ToolchainProbe for ClangProbe {
  fn executable(&self) -> &str {
    &self.executable
  }

  fn minimum_version(&self) -> u32 {
    self.minimum_major
  }

  fn probe(&self) -> ToolchainStatus {
    let Some(path_var) = env::var_os("PATH") else {
      return ToolchainStatus::NotFound;
    };
    let Some(executable) = find_on_path(&self.executable, &path_var) else {
      return ToolchainStatus::NotFound;
    };

    let output = match Command::new(&executable).arg("--version").output() {
      Ok(output) => output,
      Err(error) => {
        return ToolchainStatus::Unusable {
          reason: format!("failed to run {}: {}", executable.display(), error),
        };
      },
    };

    let text = String::from_utf8_lossy(&output.stdout);
    match parse_major_version(&text) {
      Some(major) if major >= self.minimum_major => ToolchainStatus::Available { version: major },
      Some(major) => ToolchainStatus::TooOld { found: major },
      None => ToolchainStatus::Unusable {
        reason: format!("unrecognised version output from {}", executable.display()),
      },
    }
  }
}

/// Memoizes another probe: the inner probe runs at most once.
pub struct CachedProbe<P> {
  inner: P,
  status: OnceLock<ToolchainStatus>,
}

impl<P: ToolchainProbe> CachedProbe<P> {
  pub fn new(inner: P) -> Self {
    Self {
      inner,
      status: OnceLock::new(),
    }
  }

  pub fn inner(&self) -> &P {
    &self.inner
  }
}

impl<P: ToolchainProbe> ToolchainProbe for CachedProbe<P> {
  fn executable(&self) -> &str {
    self.inner.executable()
  }

  fn minimum_version(&self) -> u32 {
    self.inner.minimum_version()
  }

  fn probe(&self) -> ToolchainStatus {
    self.status.get_or_init(|| self.inner.probe()).clone()
  }
}

static SHARED_CLANG: OnceLock<Arc<CachedProbe<ClangProbe>>> = OnceLock::new();

/// Process-wide clang probe used by the native targets.
pub fn shared_clang_probe() -> Arc<dyn ToolchainProbe> {
  SHARED_CLANG.get_or_init(|| Arc::new(CachedProbe::new(ClangProbe::default()))).clone()
}

/// First `executable` in the directories of a `PATH`-style list.
pub fn find_on_path(
  executable: &str,
  path_var: &OsStr,
) -> Option<PathBuf> {
  env::split_paths(path_var).find_map(|dir| candidate(&dir, executable))
}

fn candidate(
  dir: &Path,
  executable: &str,
) -> Option<PathBuf> {
  let path = dir.join(executable);
  if path.is_file() {
    return Some(path);
  }

  if cfg!(windows) {
    let exe = dir.join(format!("{}.exe", executable));
    if exe.is_file() {
      return Some(exe);
    }
  }
  None
}

/// Major version from `--version` output, e.g. `Ubuntu clang version 17.0.6` -> 17.
pub fn parse_major_version(text: &str) -> Option<u32> {
  let mut words = text.split_whitespace();
  while let Some(word) = words.next() {
    if word != "version" {
      continue;
    }
    let digits: String = words.next()?.chars().take_while(|c| c.is_ascii_digit()).collect();
    return digits.parse().ok();
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct Counting {
    calls: AtomicUsize,
  }

  impl ToolchainProbe for Counting {
    fn executable(&self) -> &str {
      "clang"
    }

    fn minimum_version(&self) -> u32 {
      CLANG_MINIMUM_MAJOR
    }

    fn probe(&self) -> ToolchainStatus {
      self.calls.fetch_add(1, Ordering::SeqCst);
      ToolchainStatus::Available { version: 17 }
    }
  }

  #[test]
  fn version_lines_from_common_builds() {
    assert_eq!(parse_major_version("clang version 17.0.6\nTarget: x86_64"), Some(17));
    assert_eq!(parse_major_version("Apple clang version 15.0.0 (clang-1500.3.9.4)"), Some(15));
    assert_eq!(parse_major_version("Ubuntu clang version 14.0.0-1ubuntu1.1"), Some(14));
    assert_eq!(parse_major_version("gcc (GCC) 13.2.1"), None);
  }

  #[test]
  fn cached_probe_runs_once() {
    let cached = CachedProbe::new(Counting {
      calls: AtomicUsize::new(0),
    });

    assert_eq!(cached.probe(), cached.probe());
    assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn missing_executable_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let probe = ClangProbe::new("kiln-no-such-compiler", 15);

    assert_eq!(find_on_path(probe.executable(), dir.path().as_os_str()), None);
  }
}
