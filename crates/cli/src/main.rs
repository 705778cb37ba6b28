//! `stubsmith`: build RPC-composed WebAssembly components.

mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stubsmith_lib::consts::CONFIG_FILENAME;

use crate::cmd::{cmd_build, cmd_clean, cmd_graph, cmd_update_stubs};
use crate::output::{OutputFormat, print_failure};

#[derive(Parser)]
#[command(name = "stubsmith")]
#[command(author, version, about = "Build components that call each other through generated stubs", long_about = None)]
struct Cli {
  /// Path to the build configuration
  #[arg(short, long, global = true, default_value = CONFIG_FILENAME)]
  config: PathBuf,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build every component, or only the named one
  Build {
    /// Component to build (default: all)
    component: Option<String>,

    /// Maximum number of components built at once
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Regenerate stubs and inject them into the components that call them
  UpdateStubs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Remove build outputs and generated bindings
  Clean,

  /// Show components, their dependencies and the build order
  Graph {
    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .without_time()
    .with_writer(std::io::stderr)
    .init();

  let result = match cli.command {
    Commands::Build {
      component,
      jobs,
      output,
    } => cmd_build(&cli.config, component.as_deref(), jobs, output),
    Commands::UpdateStubs { output } => cmd_update_stubs(&cli.config, output),
    Commands::Clean => cmd_clean(&cli.config),
    Commands::Graph { output } => cmd_graph(&cli.config, output),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_failure(&err);
      ExitCode::FAILURE
    }
  }
}
