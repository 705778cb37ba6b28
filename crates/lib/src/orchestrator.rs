//! Build entry points.
//!
//! The `Orchestrator` owns the configuration and the toolchain and exposes the
//! operations a user runs: build everything, build one component, refresh the
//! stubs, clean. Each entry point holds the workspace lock for its duration.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::build::{BuildContext, ComponentReport, build_component};
use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::layout::Layout;
use crate::lock::{BuildLock, LockHolder};
use crate::operation::RunOutcome;
use crate::stub;
use crate::tool::{CommandToolchain, Toolchain};

/// Result of `build_all` or `build_one`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
  pub components: Vec<ComponentReport>,
}

impl BuildReport {
  /// Total number of steps that executed.
  pub fn ran(&self) -> usize {
    self.components.iter().map(|c| c.ran).sum()
  }

  pub fn skipped(&self) -> usize {
    self.components.iter().map(|c| c.skipped).sum()
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct StubBuild {
  pub component: String,
  pub outcome: RunOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct StubInjection {
  pub consumer: String,
  pub dependency: String,
  pub outcome: RunOutcome,
}

/// Result of `refresh_stubs`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StubReport {
  pub stubs: Vec<StubBuild>,
  pub injections: Vec<StubInjection>,
}

pub struct Orchestrator {
  ctx: Arc<BuildContext>,
}

impl Orchestrator {
  pub fn new(config: BuildConfig, toolchain: Arc<dyn Toolchain>) -> Self {
    Self {
      ctx: Arc::new(BuildContext::new(config, toolchain)),
    }
  }

  /// Orchestrator driving the real external programs.
  pub fn with_commands(config: BuildConfig) -> Self {
    let toolchain = Arc::new(CommandToolchain::new(&config));
    Self::new(config, toolchain)
  }

  pub fn config(&self) -> &BuildConfig {
    &self.ctx.config
  }

  pub fn layout(&self) -> &Layout {
    &self.ctx.layout
  }

  async fn lock(&self, holder: LockHolder) -> Result<BuildLock, BuildError> {
    Ok(BuildLock::acquire(&self.ctx.layout.lock_path(), holder, self.ctx.config.lock_wait).await?)
  }

  /// Build every component.
  ///
  /// With a parallelism of one, components run one by one in name order.
  /// Otherwise they run wave by wave, dependencies first.
  pub async fn build_all(&self) -> Result<BuildReport, BuildError> {
    let _lock = self.lock(LockHolder::Build { component: None }).await?;

    let waves = if self.ctx.config.parallelism == 1 {
      vec![
        self
          .ctx
          .config
          .graph
          .all_components()
          .into_iter()
          .map(String::from)
          .collect(),
      ]
    } else {
      self.ctx.config.graph.build_waves()
    };

    let mut report = BuildReport::default();
    for (index, wave) in waves.into_iter().enumerate() {
      debug!(wave = index + 1, components = ?wave, "building wave");
      let built = self
        .run_tasks(wave, |ctx, name| async move { build_component(&ctx, &name).await })
        .await?;
      report.components.extend(built);
    }

    info!(
      components = report.components.len(),
      ran = report.ran(),
      skipped = report.skipped(),
      "build finished"
    );
    Ok(report)
  }

  /// Build a single component.
  pub async fn build_one(&self, name: &str) -> Result<BuildReport, BuildError> {
    let _lock = self
      .lock(LockHolder::Build {
        component: Some(name.to_string()),
      })
      .await?;
    let component = build_component(&self.ctx, name).await?;
    Ok(BuildReport {
      components: vec![component],
    })
  }

  /// Rebuild every needed stub, then inject the stubs into their consumers.
  ///
  /// Injection starts only after every stub build succeeded.
  pub async fn refresh_stubs(&self) -> Result<StubReport, BuildError> {
    let _lock = self.lock(LockHolder::UpdateStubs).await?;
    let graph = &self.ctx.config.graph;

    let needed: Vec<String> = graph.stub_needed().into_iter().map(String::from).collect();
    let stubs = self
      .run_tasks(needed, |ctx, name| async move {
        let outcome = stub::build_stub(&ctx, &name).await?;
        Ok::<_, BuildError>(StubBuild {
          component: name,
          outcome,
        })
      })
      .await?;
    info!(stubs = stubs.len(), "stubs ready");

    let consumers: Vec<String> = graph
      .all_components()
      .into_iter()
      .filter(|name| graph.dependencies(name).is_some_and(|deps| !deps.is_empty()))
      .map(String::from)
      .collect();
    let injections: Vec<StubInjection> = self
      .run_tasks(consumers, |ctx, consumer| async move { inject_all(&ctx, &consumer).await })
      .await?
      .into_iter()
      .flatten()
      .collect();
    info!(injections = injections.len(), "stub dependencies injected");

    Ok(StubReport { stubs, injections })
  }

  /// Build the stub of a single component.
  pub async fn build_stub(&self, name: &str) -> Result<RunOutcome, BuildError> {
    let _lock = self
      .lock(LockHolder::BuildStub {
        component: name.to_string(),
      })
      .await?;
    stub::build_stub(&self.ctx, name).await
  }

  /// Inject a single, already built stub into `consumer`.
  pub async fn inject_stub_dependency(&self, consumer: &str, dependency: &str) -> Result<RunOutcome, BuildError> {
    let _lock = self
      .lock(LockHolder::InjectStub {
        consumer: consumer.to_string(),
        dependency: dependency.to_string(),
      })
      .await?;
    stub::inject_stub_dependency(&self.ctx, consumer, dependency).await
  }

  /// Remove every generated directory. Returns the ones that existed.
  pub async fn clean(&self) -> Result<Vec<PathBuf>, BuildError> {
    let _lock = self.lock(LockHolder::Clean).await?;
    let layout = &self.ctx.layout;

    let mut removed = Vec::new();
    for dir in layout.generated_dirs(self.ctx.config.graph.all_components()) {
      if crate::util::remove_dir_if_exists(&dir).await? {
        info!("Removed {}", dir.display());
        removed.push(dir);
      } else {
        debug!(path = %dir.display(), "nothing to remove");
      }
    }
    Ok(removed)
  }

  /// Run `task` for every name, returning results in input order.
  ///
  /// With a parallelism of one the tasks run sequentially and stop at the
  /// first failure. Otherwise up to `parallelism` run at once; all started
  /// tasks finish and the failure of the lowest-ordered name is returned.
  async fn run_tasks<T, F, Fut>(&self, names: Vec<String>, task: F) -> Result<Vec<T>, BuildError>
  where
    T: Send + 'static,
    F: Fn(Arc<BuildContext>, String) -> Fut,
    Fut: Future<Output = Result<T, BuildError>> + Send + 'static,
  {
    let parallelism = self.ctx.config.parallelism;

    if parallelism <= 1 || names.len() <= 1 {
      let mut results = Vec::with_capacity(names.len());
      for name in names {
        results.push(task(Arc::clone(&self.ctx), name).await?);
      }
      return Ok(results);
    }

    let permits = parallelism.min(names.len()).min(Semaphore::MAX_PERMITS);
    let semaphore = Arc::new(Semaphore::new(permits));
    let mut set = JoinSet::new();

    for (index, name) in names.into_iter().enumerate() {
      let future = task(Arc::clone(&self.ctx), name);
      let semaphore = Arc::clone(&semaphore);
      set.spawn(async move {
        let _permit = match semaphore.acquire_owned().await {
          Ok(permit) => permit,
          Err(e) => return (index, Err(BuildError::TaskFailed(e.to_string()))),
        };
        (index, future.await)
      });
    }

    let mut finished = Vec::new();
    let mut join_failure = None;
    while let Some(joined) = set.join_next().await {
      match joined {
        Ok(result) => finished.push(result),
        Err(e) => join_failure = Some(BuildError::TaskFailed(e.to_string())),
      }
    }

    finished.sort_by_key(|(index, _)| *index);
    let mut results = Vec::with_capacity(finished.len());
    for (_, result) in finished {
      results.push(result?);
    }
    if let Some(err) = join_failure {
      return Err(err);
    }
    Ok(results)
  }
}

/// Inject every dependency of `consumer`, one at a time in declared order.
async fn inject_all(ctx: &BuildContext, consumer: &str) -> Result<Vec<StubInjection>, BuildError> {
  let mut injections = Vec::new();
  for dependency in ctx.dependencies(consumer)? {
    let outcome = stub::inject_stub_dependency(ctx, consumer, dependency).await?;
    injections.push(StubInjection {
      consumer: consumer.to_string(),
      dependency: dependency.clone(),
      outcome,
    });
  }
  Ok(injections)
}
