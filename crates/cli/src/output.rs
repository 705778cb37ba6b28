//! Rendering of build, stub and clean reports.
//!
//! Each report renders to plain lines first so the wording can be tested
//! without a terminal; color is applied only when printing.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use stubsmith_lib::build::ComponentReport;
use stubsmith_lib::operation::RunOutcome;
use stubsmith_lib::orchestrator::{BuildReport, StubBuild, StubInjection, StubReport};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// Leading mark of a rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
  /// Something was (re)built.
  Built,
  /// Nothing to do.
  Fresh,
  Removed,
  Failed,
}

impl Mark {
  fn symbol(self) -> &'static str {
    match self {
      Mark::Built => "✓",
      Mark::Fresh => "•",
      Mark::Removed => "-",
      Mark::Failed => "✗",
    }
  }

  fn for_outcome(outcome: RunOutcome) -> Self {
    if outcome.ran() { Mark::Built } else { Mark::Fresh }
  }
}

/// One line of report output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
  Headline(Mark, String),
  Row(Mark, String),
  Stat(&'static str, String),
  Blank,
}

pub fn build_lines(report: &BuildReport, elapsed: Duration) -> Vec<Line> {
  let headline = if report.ran() == 0 {
    Line::Headline(Mark::Fresh, "Everything is up to date".to_string())
  } else {
    Line::Headline(Mark::Built, "Build complete!".to_string())
  };

  let mut lines = vec![Line::Blank, headline];
  lines.extend(report.components.iter().map(component_row));
  lines.push(Line::Stat("Steps run", report.ran().to_string()));
  lines.push(Line::Stat("Steps skipped", report.skipped().to_string()));
  lines.push(Line::Stat("Duration", elapsed_text(elapsed)));
  lines
}

fn component_row(component: &ComponentReport) -> Line {
  let mark = if component.up_to_date() { Mark::Fresh } else { Mark::Built };
  Line::Row(
    mark,
    format!(
      "{} → {} ({} run, {} skipped)",
      component.name,
      component.artifact.display(),
      component.ran,
      component.skipped
    ),
  )
}

pub fn stub_lines(report: &StubReport, elapsed: Duration) -> Vec<Line> {
  let built = report.stubs.iter().filter(|s| s.outcome.ran()).count();
  let injected = report.injections.iter().filter(|i| i.outcome.ran()).count();

  let headline = if built + injected == 0 {
    Line::Headline(Mark::Fresh, "Stubs are up to date".to_string())
  } else {
    Line::Headline(Mark::Built, "Stubs updated!".to_string())
  };

  let mut lines = vec![Line::Blank, headline];
  lines.extend(report.stubs.iter().map(stub_row));
  lines.extend(report.injections.iter().map(injection_row));
  lines.push(Line::Stat("Stubs built", format!("{} of {}", built, report.stubs.len())));
  lines.push(Line::Stat("Stubs injected", format!("{} of {}", injected, report.injections.len())));
  lines.push(Line::Stat("Duration", elapsed_text(elapsed)));
  lines
}

fn stub_row(stub: &StubBuild) -> Line {
  Line::Row(
    Mark::for_outcome(stub.outcome),
    format!("stub {} ({})", stub.component, outcome_text(stub.outcome)),
  )
}

fn injection_row(injection: &StubInjection) -> Line {
  Line::Row(
    Mark::for_outcome(injection.outcome),
    format!(
      "{} ← {} ({})",
      injection.consumer,
      injection.dependency,
      outcome_text(injection.outcome)
    ),
  )
}

pub fn clean_lines(removed: &[PathBuf]) -> Vec<Line> {
  if removed.is_empty() {
    return vec![Line::Headline(Mark::Fresh, "Nothing to clean".to_string())];
  }

  let mut lines: Vec<Line> = removed
    .iter()
    .map(|path| Line::Row(Mark::Removed, path.display().to_string()))
    .collect();
  let noun = if removed.len() == 1 { "directory" } else { "directories" };
  lines.push(Line::Headline(Mark::Built, format!("Removed {} {}", removed.len(), noun)));
  lines
}

fn outcome_text(outcome: RunOutcome) -> &'static str {
  match outcome {
    RunOutcome::Ran => "rebuilt",
    RunOutcome::Skipped => "up to date",
  }
}

fn elapsed_text(elapsed: Duration) -> String {
  if elapsed.as_secs() > 0 {
    format!("{:.1}s", elapsed.as_secs_f64())
  } else {
    format!("{}ms", elapsed.as_millis())
  }
}

fn paint(mark: Mark) -> String {
  let symbol = mark.symbol();
  match mark {
    Mark::Built => symbol.if_supports_color(Stream::Stdout, |s| s.green()).to_string(),
    Mark::Fresh => symbol.if_supports_color(Stream::Stdout, |s| s.blue()).to_string(),
    Mark::Removed => symbol.if_supports_color(Stream::Stdout, |s| s.yellow()).to_string(),
    Mark::Failed => symbol.if_supports_color(Stream::Stdout, |s| s.red()).to_string(),
  }
}

pub fn print_lines(lines: &[Line]) {
  for line in lines {
    match line {
      Line::Headline(mark, text) => println!("{} {}", paint(*mark), text),
      Line::Row(mark, text) => println!("  {} {}", paint(*mark), text),
      Line::Stat(label, value) => println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value),
      Line::Blank => println!(),
    }
  }
}

/// Print a failure and its cause chain to stderr.
pub fn print_failure(err: &anyhow::Error) {
  eprintln!(
    "{} {}",
    Mark::Failed.symbol().if_supports_color(Stream::Stderr, |s| s.red()),
    format!("{err:#}").if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
  println!("{}", json);
  Ok(())
}
