/// Default configuration file looked up in the working directory.
pub const CONFIG_FILENAME: &str = "stubsmith.lua";

/// Lock file guarding a workspace against concurrent orchestrator runs.
pub const LOCK_FILENAME: &str = ".stubsmith.lock";

/// Marker written into a stub directory once the stub generator succeeded.
pub const STUB_COMPLETE_MARKER: &str = ".stubsmith-complete";

pub const DEFAULT_PACKAGE_ORG: &str = "golem";
pub const DEFAULT_TARGET_DIR: &str = "target";
pub const DEFAULT_COMPONENTS_DIR: &str = "components";
/// Seconds an entry point waits for a busy workspace before giving up.
pub const DEFAULT_LOCK_WAIT_SECS: u64 = 30;

pub const DEFAULT_ADAPTER: &str = "adapters/tier1/wasi_snapshot_preview1.wasm";
