//! Folding dependency stubs into a component.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BuildError;
use crate::layout::Layout;
use crate::tool::Toolchain;

/// Compose `component_wasm` with `stubs` (in dependency order) into `dest`.
///
/// Each stub is folded into the result of the previous step, so the i-th
/// intermediate `compose-<i>-<dep>.wasm` already carries the first i stubs.
/// Without stubs the component is copied unchanged. Intermediates stay in the
/// component's build directory.
pub async fn compose(
  tools: &dyn Toolchain,
  layout: &Layout,
  name: &str,
  component_wasm: &Path,
  stubs: &[(String, PathBuf)],
  dest: &Path,
) -> Result<(), BuildError> {
  let mut current = component_wasm.to_path_buf();

  for (index, (dependency, stub_wasm)) in stubs.iter().enumerate() {
    let next = layout.compose_step_wasm(name, index, dependency);
    debug!(component = %name, dependency = %dependency, output = %next.display(), "folding stub");
    tools.compose(&current, stub_wasm, &next).await?;
    current = next;
  }

  tokio::fs::copy(&current, dest).await.map_err(BuildError::io(dest))?;
  Ok(())
}
