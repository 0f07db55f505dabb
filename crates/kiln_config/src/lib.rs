use std::{
  convert::Infallible,
  fmt, fs, io,
  path::{Path, PathBuf},
  str::FromStr,
};

use serde::{Deserialize, Serialize};

pub const PROJECT_FILE: &str = "kiln.toml";
pub const DEFAULT_OUTPUT_DIR: &str = "build";

/// Closed set of output architectures.
///
/// `NotSupported` is a real state rather than a parse error: it records that
/// the caller asked for something the compiler was never taught, and the
/// backend locator refuses it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TargetArchitecture {
  #[default]
  Jvm,
  LlvmCpp,
  LlvmGo,
  NotSupported,
}

impl TargetArchitecture {
  pub const SUPPORTED: [TargetArchitecture; 3] =
    [TargetArchitecture::Jvm, TargetArchitecture::LlvmCpp, TargetArchitecture::LlvmGo];

  /// Canonical lowercase name, also used as a directory component.
  pub fn name(&self) -> &'static str {
    match self {
      TargetArchitecture::Jvm => "jvm",
      TargetArchitecture::LlvmCpp => "llvm-cpp",
      TargetArchitecture::LlvmGo => "llvm-go",
      TargetArchitecture::NotSupported => "not-supported",
    }
  }

  /// Native targets depend on an external toolchain being installed.
  pub fn is_native(&self) -> bool {
    matches!(self, TargetArchitecture::LlvmCpp | TargetArchitecture::LlvmGo)
  }
}

impl FromStr for TargetArchitecture {
  type Err = Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let arch = match s.trim().to_ascii_lowercase().as_str() {
      "jvm" => TargetArchitecture::Jvm,
      "llvm-cpp" => TargetArchitecture::LlvmCpp,
      "llvm-go" => TargetArchitecture::LlvmGo,
      _ => TargetArchitecture::NotSupported,
    };
    Ok(arch)
  }
}

impl From<String> for TargetArchitecture {
  fn from(value: String) -> Self {
    match value.parse() {
      Ok(arch) => arch,
      Err(never) => match never {},
    }
  }
}

impl From<TargetArchitecture> for String {
  fn from(value: TargetArchitecture) -> Self {
    value.name().to_string()
  }
}

impl fmt::Display for TargetArchitecture {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugTrace {
  Resolve,
  Ir,
  Ownership,
  Codegen,
  Toolchain,
  Driver,
}

/// `[project]` table of `kiln.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct KilnProjectMetadata {
  pub name: String,
  #[serde(default)]
  pub version: String,
}

/// `[build]` table of `kiln.toml`. Every key is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct KilnProjectBuildConfig {
  pub target: Option<TargetArchitecture>,
  pub dev: bool,
  pub output_dir: Option<String>,
}

/// Project file.
///
/// ```toml
/// [project]
/// name = "hello"
/// version = "0.1.0"
///
/// [build]
/// target = "llvm-cpp"
/// dev = true
/// output_dir = "out"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct KilnProjectConfig {
  pub project: KilnProjectMetadata,
  #[serde(default)]
  pub build: KilnProjectBuildConfig,
}

impl KilnProjectConfig {
  pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
    toml::from_str(content).map_err(|err| ConfigError::Parse {
      path: None,
      message: err.to_string(),
    })
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;

    toml::from_str(&content).map_err(|err| ConfigError::Parse {
      path: Some(path.to_path_buf()),
      message: err.to_string(),
    })
  }

  /// `kiln.toml` inside `dir`, if there is one.
  pub fn find_in(dir: &Path) -> Option<PathBuf> {
    let candidate = dir.join(PROJECT_FILE);
    candidate.is_file().then_some(candidate)
  }
}

#[derive(Debug)]
pub enum ConfigError {
  Io { path: PathBuf, source: io::Error },
  Parse { path: Option<PathBuf>, message: String },
}

impl fmt::Display for ConfigError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      ConfigError::Io { path, source } => write!(f, "cannot read {}: {}", path.display(), source),
      ConfigError::Parse { path: Some(path), message } => write!(f, "invalid {}: {}", path.display(), message),
      ConfigError::Parse { path: None, message } => write!(f, "invalid project config: {}", message),
    }
  }
}

impl std::error::Error for ConfigError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ConfigError::Io { source, .. } => Some(source),
      ConfigError::Parse { .. } => None,
    }
  }
}

/// Build settings given on the command line. `None` and `false` defer to the project file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOverrides {
  pub target: Option<TargetArchitecture>,
  pub dev: bool,
  pub output_dir: Option<String>,
}

/// Flags every phase reads. Never mutated once code generation starts.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerFlags {
  pub target: TargetArchitecture,
  /// Dev builds write under `generated/dev`, release builds under `generated/main`.
  pub dev_build: bool,
  pub output_dir: PathBuf,
  pub debug: bool,
  pub debug_trace: Vec<DebugTrace>,
  pub quiet: bool,
  pub verbose: u8,
}

impl Default for CompilerFlags {
  fn default() -> Self {
    Self {
      target: TargetArchitecture::default(),
      dev_build: false,
      output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
      debug: false,
      debug_trace: Vec::new(),
      quiet: false,
      verbose: 0,
    }
  }
}

impl CompilerFlags {
  pub fn new_basic(
    debug: bool,
    debug_trace: Vec<DebugTrace>,
    quiet: bool,
    verbose: u8,
  ) -> Self {
    Self {
      debug,
      debug_trace,
      quiet,
      verbose,
      ..Self::default()
    }
  }

  pub fn with_target(
    mut self,
    target: TargetArchitecture,
  ) -> Self {
    self.target = target;
    self
  }

  pub fn with_output_dir(
    mut self,
    output_dir: impl Into<PathBuf>,
  ) -> Self {
    self.output_dir = output_dir.into();
    self
  }

  pub fn with_dev_build(
    mut self,
    dev_build: bool,
  ) -> Self {
    self.dev_build = dev_build;
    self
  }

  /// Layer the project file and then the command line over the defaults.
  pub fn merge_build(
    mut self,
    project: Option<&KilnProjectConfig>,
    overrides: &BuildOverrides,
  ) -> Self {
    if let Some(project) = project {
      if let Some(target) = project.build.target {
        self.target = target;
      }
      if let Some(dir) = &project.build.output_dir {
        self.output_dir = PathBuf::from(dir);
      }
      self.dev_build = project.build.dev;
    }

    if let Some(target) = overrides.target {
      self.target = target;
    }
    if let Some(dir) = &overrides.output_dir {
      self.output_dir = PathBuf::from(dir);
    }
    if overrides.dev {
      self.dev_build = true;
    }

    self
  }
}
