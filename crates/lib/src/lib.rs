//! stubsmith-lib: build orchestration for RPC-composed WebAssembly components.
//!
//! This crate turns a set of components that call each other through generated
//! remote-procedure stubs into composed, deployable artifacts:
//! - `DependencyGraph`: which component calls which, in declared order
//! - `Operation`: a timestamp-cached unit of work (a restricted `make` rule)
//! - `Toolchain`: the external tools the pipeline drives
//! - `Orchestrator`: the `build`, `update-stubs` and `clean` entry points

pub mod build;
pub mod compose;
pub mod config;
pub mod consts;
pub mod error;
pub mod graph;
pub mod layout;
pub mod lock;
pub mod operation;
pub mod orchestrator;
pub mod stale;
pub mod stub;
pub mod tool;
pub mod util;

pub use config::BuildConfig;
pub use error::{BuildError, ConfigError};
pub use graph::DependencyGraph;
pub use orchestrator::Orchestrator;
