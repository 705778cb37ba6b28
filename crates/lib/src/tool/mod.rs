//! External tools driven by the pipeline.
//!
//! The pipeline never shells out directly. It talks to a `Toolchain`, whose
//! methods mirror the contracts of the tools: what they read, what they must
//! produce, and how they fail. `CommandToolchain` implements it by spawning the
//! real programs.

pub mod command;

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

pub use command::CommandToolchain;

/// A failed tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
  /// The program could not be started.
  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    args: Vec<String>,
    #[source]
    source: io::Error,
  },

  /// The program exited unsuccessfully; `stderr` is its captured diagnostic output.
  #[error("{program} {} failed with exit code {code:?}\n{stderr}", .args.join(" "))]
  Failed {
    program: String,
    args: Vec<String>,
    code: Option<i32>,
    stderr: String,
  },

  /// The program reported success but did not produce a declared output.
  #[error("{program} did not produce {}", .path.display())]
  MissingOutput { program: String, path: PathBuf },

  #[error("io error: {0}")]
  Io(#[from] io::Error),
}

/// The external collaborators of the build pipeline.
#[async_trait]
pub trait Toolchain: Send + Sync {
  /// Generate binding code for the interface in `wit_dir` into `binding_dir`.
  async fn generate_binding(&self, wit_dir: &Path, binding_dir: &Path) -> Result<(), ToolError>;

  /// Compile the component in `component_dir` to a raw module.
  async fn compile(&self, component_dir: &Path, module_wasm: &Path) -> Result<(), ToolError>;

  /// Embed interface type metadata into a raw module.
  async fn embed(&self, wit_dir: &Path, module_wasm: &Path, embed_wasm: &Path) -> Result<(), ToolError>;

  /// Package a typed module as a self-describing component.
  async fn package(&self, embed_wasm: &Path, component_wasm: &Path) -> Result<(), ToolError>;

  /// Generate a stub module and stub interface for the interface in `wit_dir`.
  async fn build_stub(&self, wit_dir: &Path, stub_wasm: &Path, stub_wit_dir: &Path) -> Result<(), ToolError>;

  /// Merge a stub interface into a consumer's interface directory, namespaced.
  async fn add_stub_dependency(&self, stub_wit_dir: &Path, consumer_wit_dir: &Path) -> Result<(), ToolError>;

  /// Fold one stub module into `base_wasm`, writing `dest_wasm`.
  async fn compose(&self, base_wasm: &Path, stub_wasm: &Path, dest_wasm: &Path) -> Result<(), ToolError>;
}
