//! Toolchain backed by external programs.
//!
//! Each contract method spawns the corresponding program with captured output.
//! Success is decided by the exit status and by the presence of the declared
//! outputs; the programs' output text is only logged, never interpreted.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::{BuildConfig, ToolPrograms};
use crate::tool::{ToolError, Toolchain};

/// Runs `wit-bindgen`, `tinygo`, `wasm-tools` and `golem-cli`.
#[derive(Debug, Clone)]
pub struct CommandToolchain {
  programs: ToolPrograms,
  adapter: Option<PathBuf>,
  working_dir: PathBuf,
}

impl CommandToolchain {
  pub fn new(config: &BuildConfig) -> Self {
    Self {
      programs: config.tools.clone(),
      adapter: config.adapter.as_deref().map(|adapter| config.resolve(adapter)),
      working_dir: config.root.clone(),
    }
  }

  async fn run(&self, program: &str, args: Vec<String>, outputs: &[&Path]) -> Result<(), ToolError> {
    run_tool(program, &args, &self.working_dir).await?;
    expect_outputs(program, outputs)
  }
}

#[async_trait]
impl Toolchain for CommandToolchain {
  async fn generate_binding(&self, wit_dir: &Path, binding_dir: &Path) -> Result<(), ToolError> {
    let args = vec![
      "tiny-go".to_string(),
      "--rename-package".to_string(),
      "binding".to_string(),
      "--out-dir".to_string(),
      arg(binding_dir),
      arg(wit_dir),
    ];
    self.run(&self.programs.wit_bindgen, args, &[binding_dir]).await
  }

  async fn compile(&self, component_dir: &Path, module_wasm: &Path) -> Result<(), ToolError> {
    let args = vec![
      "build".to_string(),
      "-target=wasi".to_string(),
      "-tags=purego".to_string(),
      "-o".to_string(),
      arg(module_wasm),
      arg(&component_dir.join("main.go")),
    ];
    self.run(&self.programs.tinygo, args, &[module_wasm]).await
  }

  async fn embed(&self, wit_dir: &Path, module_wasm: &Path, embed_wasm: &Path) -> Result<(), ToolError> {
    let args = vec![
      "component".to_string(),
      "embed".to_string(),
      arg(wit_dir),
      arg(module_wasm),
      "--output".to_string(),
      arg(embed_wasm),
    ];
    self.run(&self.programs.wasm_tools, args, &[embed_wasm]).await
  }

  async fn package(&self, embed_wasm: &Path, component_wasm: &Path) -> Result<(), ToolError> {
    let mut args = vec![
      "component".to_string(),
      "new".to_string(),
      arg(embed_wasm),
      "-o".to_string(),
      arg(component_wasm),
    ];
    if let Some(adapter) = &self.adapter {
      args.push("--adapt".to_string());
      args.push(arg(adapter));
    }
    self.run(&self.programs.wasm_tools, args, &[component_wasm]).await
  }

  async fn build_stub(&self, wit_dir: &Path, stub_wasm: &Path, stub_wit_dir: &Path) -> Result<(), ToolError> {
    let args = vec![
      "stubgen".to_string(),
      "build".to_string(),
      "--source-wit-root".to_string(),
      arg(wit_dir),
      "--dest-wasm".to_string(),
      arg(stub_wasm),
      "--dest-wit-root".to_string(),
      arg(stub_wit_dir),
    ];
    self.run(&self.programs.golem_cli, args, &[stub_wasm, stub_wit_dir]).await
  }

  async fn add_stub_dependency(&self, stub_wit_dir: &Path, consumer_wit_dir: &Path) -> Result<(), ToolError> {
    let args = vec![
      "stubgen".to_string(),
      "add-stub-dependency".to_string(),
      "--overwrite".to_string(),
      "--stub-wit-root".to_string(),
      arg(stub_wit_dir),
      "--dest-wit-root".to_string(),
      arg(consumer_wit_dir),
    ];
    self.run(&self.programs.golem_cli, args, &[consumer_wit_dir]).await
  }

  async fn compose(&self, base_wasm: &Path, stub_wasm: &Path, dest_wasm: &Path) -> Result<(), ToolError> {
    let args = vec![
      "stubgen".to_string(),
      "compose".to_string(),
      "--source-wasm".to_string(),
      arg(base_wasm),
      "--stub-wasm".to_string(),
      arg(stub_wasm),
      "--dest-wasm".to_string(),
      arg(dest_wasm),
    ];
    self.run(&self.programs.golem_cli, args, &[dest_wasm]).await
  }
}

fn arg(path: &Path) -> String {
  path.to_string_lossy().to_string()
}

/// Run `program` with `args` in `working_dir`, capturing its output.
///
/// # Returns
///
/// The trimmed stdout on success. A non-zero exit yields
/// `ToolError::Failed` carrying the captured stderr verbatim.
pub async fn run_tool(program: &str, args: &[String], working_dir: &Path) -> Result<String, ToolError> {
  debug!(program = %program, args = ?args, "spawning tool");

  let output = Command::new(program)
    .args(args)
    .current_dir(working_dir)
    .output()
    .await
    .map_err(|source| ToolError::Spawn {
      program: program.to_string(),
      args: args.to_vec(),
      source,
    })?;

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
  let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

  if !stdout.is_empty() {
    debug!(stdout = %stdout, "tool stdout");
  }
  if !stderr.is_empty() {
    debug!(stderr = %stderr, "tool stderr");
  }

  if !output.status.success() {
    return Err(ToolError::Failed {
      program: program.to_string(),
      args: args.to_vec(),
      code: output.status.code(),
      stderr,
    });
  }

  Ok(stdout)
}

fn expect_outputs(program: &str, outputs: &[&Path]) -> Result<(), ToolError> {
  match outputs.iter().find(|path| !path.exists()) {
    Some(missing) => Err(ToolError::MissingOutput {
      program: program.to_string(),
      path: missing.to_path_buf(),
    }),
    None => Ok(()),
  }
}
