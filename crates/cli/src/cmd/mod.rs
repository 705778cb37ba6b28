mod build;
mod clean;
mod graph;
mod update_stubs;

use std::path::Path;

use anyhow::{Context, Result};
use stubsmith_lib::BuildConfig;

pub use build::cmd_build;
pub use clean::cmd_clean;
pub use graph::cmd_graph;
pub use update_stubs::cmd_update_stubs;

fn load_config(path: &Path) -> Result<BuildConfig> {
  BuildConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}
