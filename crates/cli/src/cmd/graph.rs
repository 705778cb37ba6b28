//! Implementation of the `stubsmith graph` command.
//!
//! Prints the dependency graph as evaluated from the config: each component
//! with its dependencies in composition order, the components that get a
//! stub, and the waves a parallel build runs in.

use std::path::Path;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use stubsmith_lib::graph::ComponentSpec;

use crate::cmd::load_config;
use crate::output::{OutputFormat, print_json};

#[derive(Serialize)]
struct GraphSummary<'a> {
  components: &'a [ComponentSpec],
  stub_needed: Vec<&'a str>,
  waves: Vec<Vec<String>>,
}

pub fn cmd_graph(config_path: &Path, output: OutputFormat) -> Result<()> {
  let config = load_config(config_path)?;
  let graph = &config.graph;

  let summary = GraphSummary {
    components: graph.components(),
    stub_needed: graph.stub_needed(),
    waves: graph.build_waves(),
  };

  if output.is_json() {
    return print_json(&summary);
  }

  println!("{}", "Components".if_supports_color(Stream::Stdout, |s| s.bold()));
  for name in graph.all_components() {
    let dependencies = graph.dependencies(name).unwrap_or_default();
    if dependencies.is_empty() {
      println!("  {}", name);
    } else {
      println!("  {} → {}", name, dependencies.join(", "));
    }
  }

  println!();
  println!("{}", "Stubs".if_supports_color(Stream::Stdout, |s| s.bold()));
  if summary.stub_needed.is_empty() {
    println!("  (none)");
  } else {
    println!("  {}", summary.stub_needed.join(", "));
  }

  println!();
  println!("{}", "Build waves".if_supports_color(Stream::Stdout, |s| s.bold()));
  for (index, wave) in summary.waves.iter().enumerate() {
    println!("  {}: {}", index + 1, wave.join(", "));
  }

  Ok(())
}
