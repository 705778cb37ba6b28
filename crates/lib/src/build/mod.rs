//! The per-component build pipeline.
//!
//! Each component goes through five cached steps, strictly in sequence:
//!
//! 1. binding generation from the interface directory
//! 2. compilation to a raw module
//! 3. embedding of interface type metadata
//! 4. packaging as a component
//! 5. composition with the stubs of its dependencies
//!
//! A failing step aborts the remaining ones. Artifacts of finished steps stay
//! on disk and are reused by the next run.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::compose::compose;
use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::layout::Layout;
use crate::operation::{Operation, RunOutcome};
use crate::stub::ensure_stub_ready;
use crate::tool::Toolchain;
use crate::util::ensure_dir;

/// Everything a pipeline stage needs: the configuration, the derived paths
/// and the tools.
pub struct BuildContext {
  pub config: BuildConfig,
  pub layout: Layout,
  pub toolchain: Arc<dyn Toolchain>,
}

impl BuildContext {
  pub fn new(config: BuildConfig, toolchain: Arc<dyn Toolchain>) -> Self {
    let layout = Layout::new(&config);
    Self {
      config,
      layout,
      toolchain,
    }
  }

  /// Ordered dependencies of `name`, or `ComponentNotFound`.
  pub fn dependencies(&self, name: &str) -> Result<&[String], BuildError> {
    self
      .config
      .graph
      .dependencies(name)
      .ok_or_else(|| BuildError::ComponentNotFound(name.to_string()))
  }
}

/// Summary of one component's pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentReport {
  pub name: String,
  /// Number of steps whose action executed.
  pub ran: usize,
  /// Number of steps skipped as up to date.
  pub skipped: usize,
  /// The composed, deployable artifact.
  pub artifact: PathBuf,
}

impl ComponentReport {
  fn new(name: &str, artifact: PathBuf) -> Self {
    Self {
      name: name.to_string(),
      ran: 0,
      skipped: 0,
      artifact,
    }
  }

  fn record(&mut self, outcome: RunOutcome) {
    match outcome {
      RunOutcome::Ran => self.ran += 1,
      RunOutcome::Skipped => self.skipped += 1,
    }
  }

  /// True when every step was skipped.
  pub fn up_to_date(&self) -> bool {
    self.ran == 0
  }
}

/// Run the full pipeline for one component.
///
/// Every dependency's stub must already be complete; run the stub refresh
/// first.
pub async fn build_component(ctx: &BuildContext, name: &str) -> Result<ComponentReport, BuildError> {
  let dependencies = ctx.dependencies(name)?;
  let layout = &ctx.layout;
  let tools = ctx.toolchain.as_ref();

  ensure_dir(&layout.build_dir(name)).await?;
  ensure_dir(&layout.components_target_dir()).await?;

  let component_dir = layout.component_dir(name);
  let wit_dir = layout.wit_dir(name);
  let binding_dir = layout.binding_dir(name);
  let module_wasm = layout.module_wasm(name);
  let embed_wasm = layout.embed_wasm(name);
  let component_wasm = layout.component_wasm(name);
  let composed_wasm = layout.composed_wasm(name);

  let mut report = ComponentReport::new(name, composed_wasm.clone());

  let outcome = Operation::new(
    format!("Generating bindings for {name}"),
    format!("binding generation for {name}"),
  )
  .targets([binding_dir.clone()])
  .sources([wit_dir.clone()])
  .run(|| async { tools.generate_binding(&wit_dir, &binding_dir).await.map_err(BuildError::from) })
  .await?;
  report.record(outcome);

  let compile_sources = std::iter::once(component_dir.clone()).chain(
    ctx
      .config
      .shared_sources
      .iter()
      .map(|source| ctx.config.resolve(source)),
  );
  let outcome = Operation::new(format!("Compiling {name}"), format!("compilation of {name}"))
    .targets([module_wasm.clone()])
    .sources(compile_sources)
    .run(|| async { tools.compile(&component_dir, &module_wasm).await.map_err(BuildError::from) })
    .await?;
  report.record(outcome);

  let outcome = Operation::new(
    format!("Embedding interface metadata into {name}"),
    format!("metadata embedding for {name}"),
  )
  .targets([embed_wasm.clone()])
  .sources([wit_dir.clone(), module_wasm.clone()])
  .run(|| async { tools.embed(&wit_dir, &module_wasm, &embed_wasm).await.map_err(BuildError::from) })
  .await?;
  report.record(outcome);

  let outcome = Operation::new(format!("Packaging {name} as a component"), format!("packaging of {name}"))
    .targets([component_wasm.clone()])
    .sources([embed_wasm.clone()])
    .run(|| async { tools.package(&embed_wasm, &component_wasm).await.map_err(BuildError::from) })
    .await?;
  report.record(outcome);

  for dependency in dependencies {
    ensure_stub_ready(layout, name, dependency)?;
  }
  let stubs: Vec<(String, PathBuf)> = dependencies
    .iter()
    .map(|dependency| (dependency.clone(), layout.stub_wasm(dependency)))
    .collect();

  let outcome = Operation::new(
    format!("Composing {name} with its dependency stubs"),
    format!("composition of {name}"),
  )
  .targets([composed_wasm.clone()])
  .sources(
    stubs
      .iter()
      .map(|(_, stub)| stub.clone())
      .chain([component_wasm.clone()]),
  )
  .run(|| compose(tools, layout, name, &component_wasm, &stubs, &composed_wasm))
  .await?;
  report.record(outcome);

  Ok(report)
}
