use std::path::Path;

use anyhow::{Context, Result};

use stubsmith_lib::Orchestrator;

use crate::cmd::{load_config, runtime};
use crate::output::{clean_lines, print_lines};

pub fn cmd_clean(config_path: &Path) -> Result<()> {
  let orchestrator = Orchestrator::with_commands(load_config(config_path)?);
  let removed = runtime()?.block_on(orchestrator.clean()).context("Clean failed")?;

  print_lines(&clean_lines(&removed));
  Ok(())
}
