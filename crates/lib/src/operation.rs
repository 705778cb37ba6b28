//! Timestamp-cached units of work.
//!
//! An `Operation` pairs a description with the targets it produces and the
//! sources it reads. Running it consults the staleness oracle and either skips
//! the action or executes it. This is the only caching in the pipeline: every
//! call site is responsible for running operations in the right order.

use std::future::Future;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::error::BuildError;
use crate::stale::is_stale;

/// What happened when an operation was run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
  /// The action executed successfully.
  Ran,
  /// Every target was up to date; the action did not execute.
  Skipped,
}

impl RunOutcome {
  pub fn ran(self) -> bool {
    matches!(self, RunOutcome::Ran)
  }
}

/// A named unit of work with declared targets and sources.
#[derive(Debug, Clone)]
pub struct Operation {
  run_message: String,
  skip_message: String,
  targets: Vec<PathBuf>,
  sources: Vec<PathBuf>,
}

impl Operation {
  /// Create an operation.
  ///
  /// `run_message` is logged when the action executes and names the step in
  /// errors; `skip_message` labels what was skipped.
  pub fn new(run_message: impl Into<String>, skip_message: impl Into<String>) -> Self {
    Self {
      run_message: run_message.into(),
      skip_message: skip_message.into(),
      targets: Vec::new(),
      sources: Vec::new(),
    }
  }

  #[must_use]
  pub fn targets<I, P>(mut self, targets: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    self.targets.extend(targets.into_iter().map(Into::into));
    self
  }

  #[must_use]
  pub fn sources<I, P>(mut self, sources: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    self.sources.extend(sources.into_iter().map(Into::into));
    self
  }

  pub fn run_message(&self) -> &str {
    &self.run_message
  }

  /// Render the targets for log output: a single path as is, several as `(a, b)`.
  pub fn target_label(&self) -> String {
    match self.targets.as_slice() {
      [single] => single.display().to_string(),
      many => format!(
        "({})",
        many.iter().map(|t| t.display().to_string()).collect::<Vec<_>>().join(", ")
      ),
    }
  }

  /// Run `action` unless every target is up to date with the sources.
  ///
  /// Failures from the staleness check or from the action are wrapped in
  /// `BuildError::Step` with this operation's run message.
  pub async fn run<F, Fut>(self, action: F) -> Result<RunOutcome, BuildError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), BuildError>>,
  {
    let stale = is_stale(&self.targets, &self.sources).map_err(|e| self.step_error(e))?;

    if !stale {
      info!("{} is up to date, skipping {}", self.target_label(), self.skip_message);
      return Ok(RunOutcome::Skipped);
    }

    info!("{}", self.run_message);
    action().await.map_err(|e| self.step_error(e))?;

    Ok(RunOutcome::Ran)
  }

  fn step_error(&self, cause: BuildError) -> BuildError {
    BuildError::Step {
      step: self.run_message.clone(),
      cause: Box::new(cause),
    }
  }
}
