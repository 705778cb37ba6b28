//! Shared helpers for pipeline integration tests.
//!
//! `FakeToolchain` stands in for the external programs. It records every
//! invocation and writes small text artifacts whose content reflects the
//! pipeline's wiring: a composed artifact lists one `import:<dep>` line per
//! folded stub.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use filetime::{FileTime, set_file_mtime};
use stubsmith_lib::Orchestrator;
use stubsmith_lib::config::BuildConfig;
use stubsmith_lib::graph::{ComponentSpec, DependencyGraph};
use stubsmith_lib::tool::{ToolError, Toolchain};
use tempfile::TempDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
  Binding,
  Compile,
  Embed,
  Package,
  Stub,
  Inject,
  Compose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub tool: Tool,
  pub component: String,
}

#[derive(Default)]
pub struct FakeToolchain {
  calls: Mutex<Vec<Invocation>>,
  failures: Mutex<Vec<(Tool, String)>>,
}

impl FakeToolchain {
  /// Make `tool` fail whenever it runs for `component`.
  pub fn fail_on(&self, tool: Tool, component: &str) {
    self.failures.lock().unwrap().push((tool, component.to_string()));
  }

  pub fn calls(&self) -> Vec<Invocation> {
    self.calls.lock().unwrap().clone()
  }

  pub fn calls_for(&self, component: &str) -> Vec<Tool> {
    self
      .calls()
      .into_iter()
      .filter(|call| call.component == component)
      .map(|call| call.tool)
      .collect()
  }

  pub fn reset(&self) {
    self.calls.lock().unwrap().clear();
  }

  fn record(&self, tool: Tool, component: &str) -> Result<(), ToolError> {
    self.calls.lock().unwrap().push(Invocation {
      tool,
      component: component.to_string(),
    });

    let failing = self
      .failures
      .lock()
      .unwrap()
      .iter()
      .any(|(t, c)| *t == tool && c == component);
    if failing {
      return Err(ToolError::Failed {
        program: format!("{tool:?}").to_lowercase(),
        args: vec![component.to_string()],
        code: Some(1),
        stderr: format!("simulated failure for {component}"),
      });
    }
    Ok(())
  }
}

/// File name of the `depth`-th ancestor of `path`.
fn ancestor_name(path: &Path, depth: usize) -> String {
  let mut current = path;
  for _ in 0..depth {
    current = current.parent().unwrap();
  }
  current.file_name().unwrap().to_string_lossy().to_string()
}

#[async_trait]
impl Toolchain for FakeToolchain {
  async fn generate_binding(&self, wit_dir: &Path, binding_dir: &Path) -> Result<(), ToolError> {
    self.record(Tool::Binding, &ancestor_name(wit_dir, 1))?;
    fs::create_dir_all(binding_dir)?;
    fs::write(binding_dir.join("binding.go"), "package binding\n")?;
    Ok(())
  }

  async fn compile(&self, component_dir: &Path, module_wasm: &Path) -> Result<(), ToolError> {
    let name = ancestor_name(component_dir, 0);
    self.record(Tool::Compile, &name)?;
    fs::write(module_wasm, format!("module:{name}\n"))?;
    Ok(())
  }

  async fn embed(&self, wit_dir: &Path, module_wasm: &Path, embed_wasm: &Path) -> Result<(), ToolError> {
    self.record(Tool::Embed, &ancestor_name(wit_dir, 1))?;
    let module = fs::read_to_string(module_wasm)?;
    fs::write(embed_wasm, format!("{module}embed\n"))?;
    Ok(())
  }

  async fn package(&self, embed_wasm: &Path, component_wasm: &Path) -> Result<(), ToolError> {
    self.record(Tool::Package, &ancestor_name(embed_wasm, 1))?;
    let embedded = fs::read_to_string(embed_wasm)?;
    fs::write(component_wasm, format!("{embedded}component\n"))?;
    Ok(())
  }

  async fn build_stub(&self, wit_dir: &Path, stub_wasm: &Path, stub_wit_dir: &Path) -> Result<(), ToolError> {
    let name = ancestor_name(wit_dir, 1);
    self.record(Tool::Stub, &name)?;
    fs::create_dir_all(stub_wit_dir)?;
    fs::write(stub_wit_dir.join(format!("{name}-stub.wit")), format!("interface {name}-stub {{}}\n"))?;
    fs::write(stub_wasm, format!("stub:{name}\n"))?;
    Ok(())
  }

  async fn add_stub_dependency(&self, stub_wit_dir: &Path, consumer_wit_dir: &Path) -> Result<(), ToolError> {
    let dependency = ancestor_name(stub_wit_dir, 1);
    self.record(Tool::Inject, &ancestor_name(consumer_wit_dir, 1))?;
    let deps = consumer_wit_dir.join("deps");
    let interface_dir = deps.join(format!("golem_{dependency}"));
    let stub_dir = deps.join(format!("golem_{dependency}-stub"));
    fs::create_dir_all(&interface_dir)?;
    fs::create_dir_all(&stub_dir)?;
    fs::write(interface_dir.join(format!("{dependency}.wit")), format!("interface {dependency} {{}}\n"))?;
    fs::copy(
      stub_wit_dir.join(format!("{dependency}-stub.wit")),
      stub_dir.join(format!("{dependency}-stub.wit")),
    )?;
    Ok(())
  }

  async fn compose(&self, base_wasm: &Path, stub_wasm: &Path, dest_wasm: &Path) -> Result<(), ToolError> {
    self.record(Tool::Compose, &ancestor_name(dest_wasm, 1))?;
    let base = fs::read_to_string(base_wasm)?;
    let stub = fs::read_to_string(stub_wasm)?;
    let dependency = stub.trim().trim_start_matches("stub:");
    fs::write(dest_wasm, format!("{base}import:{dependency}\n"))?;
    Ok(())
  }
}

/// A workspace on disk with one source tree per component.
pub struct Workspace {
  _temp: TempDir,
  pub tools: Arc<FakeToolchain>,
  pub orchestrator: Orchestrator,
}

impl Workspace {
  /// Create a workspace for `(name, dependencies)` pairs.
  pub fn new(components: &[(&str, &[&str])]) -> Self {
    Self::with_parallelism(components, 1)
  }

  pub fn with_parallelism(components: &[(&str, &[&str])], parallelism: usize) -> Self {
    let temp = TempDir::new().unwrap();
    let root = dunce::canonicalize(temp.path()).unwrap();

    let specs = components
      .iter()
      .map(|(name, deps)| ComponentSpec::new(*name, deps.iter().copied()))
      .collect();
    let graph = DependencyGraph::new(specs).unwrap();

    for (name, _) in components {
      let component_dir = root.join("components").join(name);
      fs::create_dir_all(component_dir.join("wit")).unwrap();
      fs::write(
        component_dir.join("wit").join(format!("{name}.wit")),
        format!("package golem:{name};\n"),
      )
      .unwrap();
      fs::write(component_dir.join("main.go"), "package main\n").unwrap();
      backdate(&component_dir);
    }

    let config = BuildConfig::new(root, graph).with_parallelism(parallelism).unwrap();
    let tools = Arc::new(FakeToolchain::default());
    let orchestrator = Orchestrator::new(config, tools.clone());

    Self {
      _temp: temp,
      tools,
      orchestrator,
    }
  }

  pub fn root(&self) -> &Path {
    self.orchestrator.config().root.as_path()
  }

  pub fn artifact(&self, name: &str) -> PathBuf {
    self.orchestrator.layout().composed_wasm(name)
  }

  pub fn read_artifact(&self, name: &str) -> String {
    fs::read_to_string(self.artifact(name)).unwrap()
  }

  /// Set the mtime of `relative` one hour into the future.
  pub fn touch_future(&self, relative: &str) {
    let path = self.root().join(relative);
    let future = FileTime::from_unix_time(FileTime::now().unix_seconds() + 3600, 0);
    set_file_mtime(path, future).unwrap();
  }

  /// Set the mtime of `relative` and everything below it `minutes` into the past.
  pub fn age(&self, relative: &str, minutes: i64) {
    let past = FileTime::from_unix_time(FileTime::now().unix_seconds() - minutes * 60, 0);
    for entry in walk(&self.root().join(relative)) {
      set_file_mtime(&entry, past).unwrap();
    }
  }

  /// Refresh stubs and build everything.
  pub async fn build(&self) {
    self.orchestrator.refresh_stubs().await.unwrap();
    self.orchestrator.build_all().await.unwrap();
  }
}

/// Move every entry under `dir` (and `dir` itself) an hour into the past, so
/// sources are strictly older than anything the pipeline writes.
fn backdate(dir: &Path) {
  let past = FileTime::from_unix_time(FileTime::now().unix_seconds() - 3600, 0);
  for entry in walk(dir) {
    set_file_mtime(&entry, past).unwrap();
  }
}

fn walk(dir: &Path) -> Vec<PathBuf> {
  let mut paths = vec![dir.to_path_buf()];
  if dir.is_dir() {
    for entry in fs::read_dir(dir).unwrap() {
      paths.extend(walk(&entry.unwrap().path()));
    }
  }
  paths
}

/// Imports listed in a composed artifact, in fold order.
pub fn imports(artifact: &str) -> Vec<String> {
  artifact
    .lines()
    .filter_map(|line| line.strip_prefix("import:"))
    .map(String::from)
    .collect()
}

/// Executes `Add`/`Get` against composed artifacts.
///
/// `Add(n)` increments the component's counter and forwards `n` to every
/// component its artifact imports.
pub struct Runtime {
  wiring: BTreeMap<String, Vec<String>>,
  counters: BTreeMap<String, u64>,
}

impl Runtime {
  pub fn load(workspace: &Workspace, names: &[&str]) -> Self {
    let wiring = names
      .iter()
      .map(|name| (name.to_string(), imports(&workspace.read_artifact(name))))
      .collect();
    Self {
      wiring,
      counters: BTreeMap::new(),
    }
  }

  pub fn add(&mut self, name: &str, amount: u64) {
    *self.counters.entry(name.to_string()).or_default() += amount;
    let targets = self.wiring.get(name).cloned().unwrap_or_default();
    for target in targets {
      self.add(&target, amount);
    }
  }

  pub fn get(&self, name: &str) -> u64 {
    self.counters.get(name).copied().unwrap_or_default()
  }
}
