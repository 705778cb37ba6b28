//! Stub refresh: the two phases and the barrier between them.

use stubsmith_lib::BuildError;
use stubsmith_lib::operation::RunOutcome;

use super::common::{Tool, Workspace};

const ONE_TWO_THREE: &[(&str, &[&str])] = &[("one", &["two", "three"]), ("two", &["three"]), ("three", &[])];

const FAN_OUT: &[(&str, &[&str])] = &[
  ("component-a", &["component-b", "component-c"]),
  ("component-b", &["component-c"]),
  ("component-c", &[]),
];

#[tokio::test]
async fn stubs_are_built_for_depended_upon_components_only() {
  let ws = Workspace::new(FAN_OUT);

  let report = ws.orchestrator.refresh_stubs().await.unwrap();

  let stubs: Vec<&str> = report.stubs.iter().map(|s| s.component.as_str()).collect();
  assert_eq!(stubs, ["component-b", "component-c"]);
  assert!(!ws.orchestrator.layout().stub_wasm("component-a").exists());
  assert!(ws.orchestrator.layout().stub_marker("component-b").exists());
}

#[tokio::test]
async fn every_stub_is_built_before_any_injection() {
  let ws = Workspace::with_parallelism(FAN_OUT, 4);

  ws.orchestrator.refresh_stubs().await.unwrap();

  let calls = ws.tools.calls();
  let last_stub = calls.iter().rposition(|call| call.tool == Tool::Stub).unwrap();
  let first_inject = calls.iter().position(|call| call.tool == Tool::Inject).unwrap();
  assert!(last_stub < first_inject, "calls out of phase: {calls:?}");
}

#[tokio::test]
async fn injections_follow_declared_order() {
  let ws = Workspace::new(FAN_OUT);

  let report = ws.orchestrator.refresh_stubs().await.unwrap();

  let edges: Vec<(&str, &str)> = report
    .injections
    .iter()
    .map(|i| (i.consumer.as_str(), i.dependency.as_str()))
    .collect();
  assert_eq!(
    edges,
    [
      ("component-a", "component-b"),
      ("component-a", "component-c"),
      ("component-b", "component-c"),
    ]
  );

  let layout = ws.orchestrator.layout();
  assert!(layout.injected_interface_dir("component-a", "component-c").is_dir());
  assert!(layout.injected_stub_dir("component-b", "component-c").is_dir());
}

#[tokio::test]
async fn failed_stub_build_prevents_injection() {
  let ws = Workspace::new(FAN_OUT);
  ws.tools.fail_on(Tool::Stub, "component-c");

  let err = ws.orchestrator.refresh_stubs().await.unwrap_err();

  assert!(matches!(&err, BuildError::Step { step, .. } if step == "Building stub for component-c"));
  assert!(ws.tools.calls().iter().all(|call| call.tool != Tool::Inject));
  assert!(!ws.orchestrator.layout().stub_marker("component-c").exists());
}

#[tokio::test]
async fn injection_before_stub_build_is_rejected() {
  let ws = Workspace::new(FAN_OUT);

  let err = ws
    .orchestrator
    .inject_stub_dependency("component-a", "component-b")
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    BuildError::StubNotBuilt { consumer, dependency } if consumer == "component-a" && dependency == "component-b"
  ));
  let layout = ws.orchestrator.layout();
  assert!(!layout.injected_interface_dir("component-a", "component-b").exists());
  assert!(!layout.injected_stub_dir("component-a", "component-b").exists());
  assert!(ws.tools.calls().is_empty());
}

#[tokio::test]
async fn single_stub_build_then_injection() {
  let ws = Workspace::new(FAN_OUT);

  assert_eq!(ws.orchestrator.build_stub("component-b").await.unwrap(), RunOutcome::Ran);
  assert_eq!(ws.orchestrator.build_stub("component-b").await.unwrap(), RunOutcome::Skipped);

  let outcome = ws
    .orchestrator
    .inject_stub_dependency("component-a", "component-b")
    .await
    .unwrap();

  assert_eq!(outcome, RunOutcome::Ran);
  assert_eq!(ws.tools.calls_for("component-b"), [Tool::Stub]);
}

#[tokio::test]
async fn interrupted_stub_build_is_redone() {
  let ws = Workspace::new(FAN_OUT);
  ws.orchestrator.build_stub("component-c").await.unwrap();
  // Outputs without a marker look like a build that died halfway
  std::fs::remove_file(ws.orchestrator.layout().stub_marker("component-c")).unwrap();
  ws.tools.reset();

  let outcome = ws.orchestrator.build_stub("component-c").await.unwrap();

  assert_eq!(outcome, RunOutcome::Ran);
  assert_eq!(ws.tools.calls_for("component-c"), [Tool::Stub]);
}

#[tokio::test]
async fn injection_outside_declared_dependencies_is_rejected() {
  let ws = Workspace::new(FAN_OUT);
  ws.orchestrator.refresh_stubs().await.unwrap();
  ws.tools.reset();

  let err = ws
    .orchestrator
    .inject_stub_dependency("component-c", "component-b")
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    BuildError::NotADependency { consumer, dependency } if consumer == "component-c" && dependency == "component-b"
  ));
  let layout = ws.orchestrator.layout();
  assert!(!layout.injected_interface_dir("component-c", "component-b").exists());
  assert!(!layout.injected_stub_dir("component-c", "component-b").exists());
  assert!(ws.tools.calls().is_empty());
}

#[tokio::test]
async fn injection_into_a_stubbed_component_settles_on_the_next_refresh() {
  let ws = Workspace::new(ONE_TWO_THREE);
  ws.orchestrator.refresh_stubs().await.unwrap();
  // Stubs were generated before any injection landed in the interfaces
  ws.age("target", 30);
  ws.age("components/one/wit/deps", 20);
  ws.age("components/two/wit/deps", 20);
  ws.tools.reset();

  let second = ws.orchestrator.refresh_stubs().await.unwrap();

  let rebuilt: Vec<&str> = second
    .stubs
    .iter()
    .filter(|s| s.outcome.ran())
    .map(|s| s.component.as_str())
    .collect();
  assert_eq!(rebuilt, ["two"]);
  let reinjected: Vec<(&str, &str)> = second
    .injections
    .iter()
    .filter(|i| i.outcome.ran())
    .map(|i| (i.consumer.as_str(), i.dependency.as_str()))
    .collect();
  assert_eq!(reinjected, [("one", "two")]);
  assert_eq!(ws.tools.calls_for("one"), [Tool::Inject]);

  ws.tools.reset();
  let third = ws.orchestrator.refresh_stubs().await.unwrap();

  assert!(ws.tools.calls().is_empty(), "unexpected calls: {:?}", ws.tools.calls());
  assert!(third.stubs.iter().all(|s| !s.outcome.ran()));
  assert!(third.injections.iter().all(|i| !i.outcome.ran()));
}
