//! `clean` removes every generated directory.

use super::common::{Tool, Workspace};

const PAIR: &[(&str, &[&str])] = &[("component1", &["component2"]), ("component2", &[])];

#[tokio::test]
async fn clean_removes_target_and_bindings() {
  let ws = Workspace::new(PAIR);
  ws.build().await;

  let removed = ws.orchestrator.clean().await.unwrap();

  let layout = ws.orchestrator.layout();
  assert_eq!(
    removed,
    [
      layout.target_dir().to_path_buf(),
      layout.binding_dir("component1"),
      layout.binding_dir("component2"),
    ]
  );
  assert!(!layout.target_dir().exists());
  assert!(!layout.binding_dir("component1").exists());
  // Sources stay
  assert!(layout.wit_dir("component1").join("component1.wit").exists());
}

#[tokio::test]
async fn clean_on_fresh_workspace_is_a_no_op() {
  let ws = Workspace::new(PAIR);

  let removed = ws.orchestrator.clean().await.unwrap();

  assert!(removed.is_empty());
}

#[tokio::test]
async fn build_after_clean_runs_every_step() {
  let ws = Workspace::new(PAIR);
  ws.build().await;
  ws.orchestrator.clean().await.unwrap();
  ws.tools.reset();

  ws.orchestrator.refresh_stubs().await.unwrap();
  let report = ws.orchestrator.build_all().await.unwrap();

  assert_eq!(report.ran(), 10);
  assert_eq!(report.skipped(), 0);
  assert_eq!(
    ws.tools.calls_for("component2"),
    [Tool::Stub, Tool::Binding, Tool::Compile, Tool::Embed, Tool::Package]
  );
}
