//! Implementation of the `stubsmith update-stubs` command.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};

use stubsmith_lib::Orchestrator;

use crate::cmd::{load_config, runtime};
use crate::output::{OutputFormat, print_json, print_lines, stub_lines};

pub fn cmd_update_stubs(config_path: &Path, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let orchestrator = Orchestrator::with_commands(load_config(config_path)?);
  let report = runtime()?
    .block_on(orchestrator.refresh_stubs())
    .context("Updating stubs failed")?;

  if output.is_json() {
    return print_json(&report);
  }

  print_lines(&stub_lines(&report, start.elapsed()));
  Ok(())
}
