//! Build configuration.
//!
//! The configuration is evaluated once, from a Lua file, into an immutable
//! `BuildConfig` that is handed to the orchestrator. Nothing else in the crate
//! reads global state.

mod lua;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::consts::{
  DEFAULT_ADAPTER, DEFAULT_COMPONENTS_DIR, DEFAULT_LOCK_WAIT_SECS, DEFAULT_PACKAGE_ORG, DEFAULT_TARGET_DIR,
};
use crate::error::ConfigError;
use crate::graph::DependencyGraph;

pub use lua::load_config;

/// Program names for the external tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolPrograms {
  pub wit_bindgen: String,
  pub tinygo: String,
  pub wasm_tools: String,
  pub golem_cli: String,
}

impl Default for ToolPrograms {
  fn default() -> Self {
    Self {
      wit_bindgen: "wit-bindgen".to_string(),
      tinygo: "tinygo".to_string(),
      wasm_tools: "wasm-tools".to_string(),
      golem_cli: "golem-cli".to_string(),
    }
  }
}

/// Everything the orchestrator needs to know about a workspace.
///
/// Relative paths are interpreted against `root`.
#[derive(Debug, Clone)]
pub struct BuildConfig {
  /// Directory all relative paths are resolved against.
  pub root: PathBuf,
  /// Package namespace used when naming injected stub dependencies.
  pub package_org: String,
  pub target_dir: PathBuf,
  pub components_dir: PathBuf,
  /// ABI adapter passed to the component packager, if any.
  pub adapter: Option<PathBuf>,
  /// Extra sources every component compile depends on (e.g. `go.mod`).
  pub shared_sources: Vec<PathBuf>,
  /// Maximum number of concurrently running component or stub builds.
  pub parallelism: usize,
  /// How long to wait for another invocation to release the workspace.
  pub lock_wait: Duration,
  pub tools: ToolPrograms,
  pub graph: DependencyGraph,
}

impl BuildConfig {
  /// Configuration with default paths and tools for `graph` rooted at `root`.
  pub fn new(root: impl Into<PathBuf>, graph: DependencyGraph) -> Self {
    Self {
      root: root.into(),
      package_org: DEFAULT_PACKAGE_ORG.to_string(),
      target_dir: PathBuf::from(DEFAULT_TARGET_DIR),
      components_dir: PathBuf::from(DEFAULT_COMPONENTS_DIR),
      adapter: Some(PathBuf::from(DEFAULT_ADAPTER)),
      shared_sources: Vec::new(),
      parallelism: 1,
      lock_wait: Duration::from_secs(DEFAULT_LOCK_WAIT_SECS),
      tools: ToolPrograms::default(),
      graph,
    }
  }

  /// Load and validate a Lua configuration file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    load_config(path)
  }

  /// Override the parallelism, rejecting zero.
  pub fn with_parallelism(mut self, parallelism: usize) -> Result<Self, ConfigError> {
    if parallelism == 0 {
      return Err(ConfigError::ZeroParallelism);
    }
    self.parallelism = parallelism;
    Ok(self)
  }

  /// Resolve a configured path against the root.
  pub fn resolve(&self, path: &Path) -> PathBuf {
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.root.join(path)
    }
  }
}
