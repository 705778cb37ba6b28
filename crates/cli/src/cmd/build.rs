//! Implementation of the `stubsmith build` command.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use stubsmith_lib::Orchestrator;

use crate::cmd::{load_config, runtime};
use crate::output::{OutputFormat, build_lines, print_json, print_lines};

/// Build every component, or only `component`.
///
/// Stubs are not refreshed here; composition fails with a hint to run
/// `update-stubs` when a dependency's stub is missing.
pub fn cmd_build(config_path: &Path, component: Option<&str>, jobs: Option<usize>, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let mut config = load_config(config_path)?;
  if let Some(jobs) = jobs {
    config = config.with_parallelism(jobs).context("Invalid --jobs")?;
  }
  debug!(root = %config.root.display(), parallelism = config.parallelism, "loaded config");

  let orchestrator = Orchestrator::with_commands(config);
  let rt = runtime()?;
  let report = match component {
    Some(name) => rt.block_on(orchestrator.build_one(name)),
    None => rt.block_on(orchestrator.build_all()),
  }
  .context("Build failed")?;

  if output.is_json() {
    return print_json(&report);
  }

  print_lines(&build_lines(&report, start.elapsed()));
  Ok(())
}
