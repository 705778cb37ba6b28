//! Error types for configuration loading and build orchestration.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::lock::LockError;
use crate::tool::ToolError;

/// Errors raised while loading or validating the build configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The config file could not be read or evaluated.
  #[error("failed to evaluate {}: {message}", .path.display())]
  Eval { path: PathBuf, message: String },

  /// A field had an unexpected shape.
  #[error("invalid config field '{field}': {message}")]
  InvalidField { field: String, message: String },

  #[error("component name must not be empty")]
  EmptyName,

  /// The name cannot be used as a single path segment.
  #[error("component name '{0}' must not contain path separators or be '.' or '..'")]
  InvalidName(String),

  #[error("component '{0}' is declared more than once")]
  DuplicateComponent(String),

  /// A component lists itself as a dependency.
  #[error("component '{0}' depends on itself")]
  SelfDependency(String),

  #[error("component '{component}' lists dependency '{dependency}' more than once")]
  DuplicateDependency { component: String, dependency: String },

  /// A dependency names a component that is not declared.
  #[error("component '{component}' depends on unknown component '{dependency}'")]
  UnknownDependency { component: String, dependency: String },

  #[error("parallelism must be at least 1")]
  ZeroParallelism,
}

/// Errors that can occur while building components and stubs.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error("configuration error: {0}")]
  Config(#[from] ConfigError),

  /// The requested component is not part of the dependency graph.
  #[error("component not found: {0}")]
  ComponentNotFound(String),

  /// A declared source path of an operation does not exist.
  #[error("source path does not exist: {}", .path.display())]
  SourceMissing { path: PathBuf },

  #[error("io error at {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// An external tool failed.
  #[error(transparent)]
  Tool(#[from] ToolError),

  /// A stub was read before its stub build completed.
  #[error("stub for '{dependency}' (needed by '{consumer}') has not been built; run update-stubs first")]
  StubNotBuilt { consumer: String, dependency: String },

  /// A stub injection was requested along an edge the graph does not declare.
  #[error("'{consumer}' does not depend on '{dependency}'")]
  NotADependency { consumer: String, dependency: String },

  /// A pipeline step failed; `step` is the step's description.
  #[error("{step}: {cause}")]
  Step { step: String, cause: Box<BuildError> },

  #[error(transparent)]
  Lock(#[from] LockError),

  /// A concurrently running task panicked or could not be scheduled.
  #[error("build task failed: {0}")]
  TaskFailed(String),
}

impl BuildError {
  /// Attach a filesystem path to an I/O error.
  pub fn io(path: impl AsRef<Path>) -> impl FnOnce(io::Error) -> BuildError {
    let path = path.as_ref().to_path_buf();
    move |source| BuildError::Io { path, source }
  }

  /// Returns the innermost error, looking through `Step` wrappers.
  pub fn root_cause(&self) -> &BuildError {
    match self {
      BuildError::Step { cause, .. } => cause.root_cause(),
      other => other,
    }
  }
}
