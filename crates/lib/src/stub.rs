//! Stub generation and injection.
//!
//! Stubs are refreshed in two phases. Phase one builds a stub for every
//! component that some other component depends on. Phase two copies those
//! stub interfaces into each consumer's interface directory. A stub counts as
//! built only once its completion marker exists, and both injection and
//! composition check the marker before reading the stub.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::build::BuildContext;
use crate::error::BuildError;
use crate::layout::Layout;
use crate::operation::{Operation, RunOutcome};
use crate::util::{ensure_dir, remove_file_if_exists};

/// Content of the stub completion marker.
#[derive(Debug, Serialize, Deserialize)]
pub struct StubMarker {
  pub version: u32,
  /// Always "complete" for a finished stub build.
  pub status: String,
}

/// Build the stub for `name`, unless it is newer than the component's interface.
pub async fn build_stub(ctx: &BuildContext, name: &str) -> Result<RunOutcome, BuildError> {
  ctx.dependencies(name)?;
  let layout = &ctx.layout;

  Operation::new(format!("Building stub for {name}"), format!("stub build for {name}"))
    .targets([layout.stub_wasm(name), layout.stub_wit_dir(name), layout.stub_marker(name)])
    .sources([layout.wit_dir(name)])
    .run(|| generate_stub(ctx, name))
    .await
}

async fn generate_stub(ctx: &BuildContext, name: &str) -> Result<(), BuildError> {
  let layout = &ctx.layout;
  let marker = layout.stub_marker(name);

  remove_file_if_exists(&marker).await?;
  ensure_dir(&layout.stub_dir(name)).await?;

  ctx
    .toolchain
    .build_stub(&layout.wit_dir(name), &layout.stub_wasm(name), &layout.stub_wit_dir(name))
    .await?;

  write_marker(&marker).await
}

async fn write_marker(path: &Path) -> Result<(), BuildError> {
  let marker = StubMarker {
    version: 1,
    status: "complete".to_string(),
  };
  let content = serde_json::to_string(&marker).map_err(|e| BuildError::io(path)(std::io::Error::other(e)))?;
  tokio::fs::write(path, format!("{}\n", content))
    .await
    .map_err(BuildError::io(path))
}

/// Whether the stub of `name` finished building and its outputs are present.
pub fn is_stub_complete(layout: &Layout, name: &str) -> bool {
  let marker = layout.stub_marker(name);
  let Ok(content) = std::fs::read_to_string(&marker) else {
    return false;
  };

  match serde_json::from_str::<StubMarker>(&content) {
    Ok(parsed) if parsed.status == "complete" => {
      layout.stub_wasm(name).is_file() && layout.stub_wit_dir(name).is_dir()
    }
    Ok(parsed) => {
      warn!(path = %marker.display(), status = %parsed.status, "stub marker is not complete");
      false
    }
    Err(e) => {
      warn!(path = %marker.display(), error = %e, "unreadable stub marker");
      false
    }
  }
}

/// Fail with `StubNotBuilt` unless the stub of `dependency` is complete.
pub fn ensure_stub_ready(layout: &Layout, consumer: &str, dependency: &str) -> Result<(), BuildError> {
  if is_stub_complete(layout, dependency) {
    Ok(())
  } else {
    Err(BuildError::StubNotBuilt {
      consumer: consumer.to_string(),
      dependency: dependency.to_string(),
    })
  }
}

/// Inject the stub interface of `dependency` into the interface of `consumer`.
///
/// `dependency` must be one of the consumer's declared dependencies and its
/// stub must have been built already; nothing is written otherwise.
pub async fn inject_stub_dependency(ctx: &BuildContext, consumer: &str, dependency: &str) -> Result<RunOutcome, BuildError> {
  ctx.dependencies(dependency)?;
  if !ctx.dependencies(consumer)?.iter().any(|declared| declared == dependency) {
    return Err(BuildError::NotADependency {
      consumer: consumer.to_string(),
      dependency: dependency.to_string(),
    });
  }
  let layout = &ctx.layout;

  ensure_stub_ready(layout, consumer, dependency)?;

  let stub_wit_dir = layout.stub_wit_dir(dependency);
  let consumer_wit_dir = layout.wit_dir(consumer);

  Operation::new(
    format!("Adding stub dependency on {dependency} to {consumer}"),
    format!("stub injection of {dependency} into {consumer}"),
  )
  .targets([
    layout.injected_interface_dir(consumer, dependency),
    layout.injected_stub_dir(consumer, dependency),
  ])
  .sources([stub_wit_dir.clone()])
  .run(|| async {
    ctx
      .toolchain
      .add_stub_dependency(&stub_wit_dir, &consumer_wit_dir)
      .await
      .map_err(BuildError::from)
  })
  .await
}
