//! Paths of every source and generated artifact.
//!
//! All path derivation lives here so the pipeline, the stub builder and
//! `clean` agree on where things are.

use std::path::{Path, PathBuf};

use crate::config::BuildConfig;
use crate::consts::{LOCK_FILENAME, STUB_COMPLETE_MARKER};

#[derive(Debug, Clone)]
pub struct Layout {
  root: PathBuf,
  package_org: String,
  target_dir: PathBuf,
  components_dir: PathBuf,
}

impl Layout {
  pub fn new(config: &BuildConfig) -> Self {
    Self {
      root: config.root.clone(),
      package_org: config.package_org.clone(),
      target_dir: config.resolve(&config.target_dir),
      components_dir: config.resolve(&config.components_dir),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn target_dir(&self) -> &Path {
    &self.target_dir
  }

  pub fn components_dir(&self) -> &Path {
    &self.components_dir
  }

  pub fn lock_path(&self) -> PathBuf {
    self.root.join(LOCK_FILENAME)
  }

  // Component sources

  pub fn component_dir(&self, name: &str) -> PathBuf {
    self.components_dir.join(name)
  }

  /// The component's interface description directory.
  pub fn wit_dir(&self, name: &str) -> PathBuf {
    self.component_dir(name).join("wit")
  }

  pub fn binding_dir(&self, name: &str) -> PathBuf {
    self.component_dir(name).join("binding")
  }

  // Build outputs

  pub fn build_dir(&self, name: &str) -> PathBuf {
    self.target_dir.join("build").join(name)
  }

  pub fn module_wasm(&self, name: &str) -> PathBuf {
    self.build_dir(name).join("module.wasm")
  }

  pub fn embed_wasm(&self, name: &str) -> PathBuf {
    self.build_dir(name).join("embed.wasm")
  }

  pub fn component_wasm(&self, name: &str) -> PathBuf {
    self.build_dir(name).join("component.wasm")
  }

  /// Intermediate result of folding the `index`-th (zero based) stub into `name`.
  pub fn compose_step_wasm(&self, name: &str, index: usize, dependency: &str) -> PathBuf {
    self
      .build_dir(name)
      .join(format!("compose-{}-{}.wasm", index + 1, dependency))
  }

  pub fn components_target_dir(&self) -> PathBuf {
    self.target_dir.join("components")
  }

  /// The final deployable artifact.
  pub fn composed_wasm(&self, name: &str) -> PathBuf {
    self.components_target_dir().join(format!("{}.wasm", name))
  }

  // Stubs

  pub fn stub_dir(&self, name: &str) -> PathBuf {
    self.target_dir.join("stub").join(name)
  }

  pub fn stub_wasm(&self, name: &str) -> PathBuf {
    self.stub_dir(name).join("stub.wasm")
  }

  pub fn stub_wit_dir(&self, name: &str) -> PathBuf {
    self.stub_dir(name).join("wit")
  }

  pub fn stub_marker(&self, name: &str) -> PathBuf {
    self.stub_dir(name).join(STUB_COMPLETE_MARKER)
  }

  /// Where the dependency's interface package lands inside the consumer.
  pub fn injected_interface_dir(&self, consumer: &str, dependency: &str) -> PathBuf {
    self
      .wit_dir(consumer)
      .join("deps")
      .join(format!("{}_{}", self.package_org, dependency))
  }

  /// Where the dependency's stub interface package lands inside the consumer.
  pub fn injected_stub_dir(&self, consumer: &str, dependency: &str) -> PathBuf {
    self
      .wit_dir(consumer)
      .join("deps")
      .join(format!("{}_{}-stub", self.package_org, dependency))
  }

  /// Every directory `clean` removes: the target dir and all binding dirs.
  pub fn generated_dirs<'a>(&self, components: impl IntoIterator<Item = &'a str>) -> Vec<PathBuf> {
    let mut dirs = vec![self.target_dir.clone()];
    dirs.extend(components.into_iter().map(|name| self.binding_dir(name)));
    dirs
  }
}
