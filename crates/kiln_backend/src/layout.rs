//! Where generated artifacts go.
//!
//! ```text
//! <base>/generated/dev/<architecture>/app/models/User.<ext>    dev build
//! <base>/generated/main/<architecture>/app/models/User.<ext>   release build
//! ```
//!
//! `app.models::User` maps to `app/models/User`: module dots become
//! directories and the type name becomes the file stem. Segments are
//! restricted to identifier characters, so distinct names never collide and
//! the mapping can be reversed.

use std::fs;
use std::path::{Component, Path, PathBuf};

use kiln_config::{CompilerFlags, TargetArchitecture};

use crate::CompilerFault;

pub const GENERATED_DIR: &str = "generated";
pub const DEV_DIR: &str = "dev";
pub const RELEASE_DIR: &str = "main";

const MODULE_SEPARATOR: &str = "::";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
  base: PathBuf,
  dev_build: bool,
}

impl OutputLayout {
  pub fn new(
    base: impl Into<PathBuf>,
    dev_build: bool,
  ) -> Self {
    Self {
      base: base.into(),
      dev_build,
    }
  }

  pub fn from_flags(flags: &CompilerFlags) -> Self {
    Self::new(flags.output_dir.clone(), flags.dev_build)
  }

  pub fn base(&self) -> &Path {
    &self.base
  }

  /// `<base>/generated/{dev|main}/<architecture>`.
  pub fn architecture_dir(
    &self,
    architecture: TargetArchitecture,
  ) -> PathBuf {
    let mode = if self.dev_build { DEV_DIR } else { RELEASE_DIR };
    self.base.join(GENERATED_DIR).join(mode).join(architecture.name())
  }
}

fn is_identifier(segment: &str) -> bool {
  !segment.is_empty() && segment.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Relative artifact path for a fully qualified construct name.
pub fn relative_path(
  name: &str,
  extension: &str,
) -> Result<PathBuf, CompilerFault> {
  let malformed = |reason| CompilerFault::MalformedName {
    name: name.to_string(),
    reason,
  };

  let (module, simple) = match name.rsplit_once(MODULE_SEPARATOR) {
    Some((module, simple)) => (Some(module), simple),
    None => (None, name),
  };

  if !is_identifier(simple) {
    return Err(malformed("type name must be a non-empty identifier"));
  }

  let mut path = PathBuf::new();
  if let Some(module) = module {
    for segment in module.split('.') {
      if !is_identifier(segment) {
        return Err(malformed("module path segments must be non-empty identifiers"));
      }
      path.push(segment);
    }
  }

  path.push(format!("{}.{}", simple, extension));
  Ok(path)
}

/// Inverse of [`relative_path`]; `None` for paths it could not have produced.
pub fn construct_name(
  relative: &Path,
  extension: &str,
) -> Option<String> {
  let mut segments: Vec<&str> = Vec::new();
  for component in relative.components() {
    match component {
      Component::Normal(part) => segments.push(part.to_str()?),
      _ => return None,
    }
  }

  let file = segments.pop()?;
  let simple = file.strip_suffix(extension)?.strip_suffix('.')?;
  if !is_identifier(simple) || !segments.iter().all(|s| is_identifier(s)) {
    return None;
  }

  if segments.is_empty() {
    Some(simple.to_string())
  } else {
    Some(format!("{}{}{}", segments.join("."), MODULE_SEPARATOR, simple))
  }
}

/// Output files for one architecture, creating directories on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocator {
  dir: PathBuf,
  extension: &'static str,
}

impl OutputLocator {
  pub fn new(
    dir: PathBuf,
    extension: &'static str,
  ) -> Self {
    Self { dir, extension }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn extension(&self) -> &'static str {
    self.extension
  }

  /// Path for `name` without touching the filesystem.
  pub fn path_for(
    &self,
    name: &str,
  ) -> Result<PathBuf, CompilerFault> {
    Ok(self.dir.join(relative_path(name, self.extension)?))
  }

  /// Path for `name`, with its parent directory created.
  pub fn prepare(
    &self,
    name: &str,
  ) -> Result<PathBuf, CompilerFault> {
    let path = self.path_for(name)?;
    self.ensure_parent(&path)?;
    Ok(path)
  }

  /// Path for a file directly in the architecture directory.
  pub fn prepare_file(
    &self,
    file_name: &str,
  ) -> Result<PathBuf, CompilerFault> {
    let path = self.dir.join(file_name);
    self.ensure_parent(&path)?;
    Ok(path)
  }

  fn ensure_parent(
    &self,
    path: &Path,
  ) -> Result<(), CompilerFault> {
    match path.parent() {
      Some(parent) if !parent.is_dir() => fs::create_dir_all(parent).map_err(|e| CompilerFault::io(parent, e)),
      _ => Ok(()),
    }
  }
}
