//! Lua configuration loading.
//!
//! A configuration file returns a table:
//!
//! ```lua
//! return {
//!   package_org = "golem",
//!   target_dir = "target",
//!   components_dir = "components",
//!   adapter = "adapters/tier1/wasi_snapshot_preview1.wasm", -- or false
//!   shared_sources = { "go.mod" },
//!   parallelism = 1,
//!   lock_wait = 30, -- seconds; 0 fails at once when the workspace is busy
//!   tools = { golem_cli = "golem-cli" },
//!   components = {
//!     { name = "component1", dependencies = { "component2", "component3" } },
//!     { name = "component2", dependencies = { "component3" } },
//!     "component3",
//!   },
//! }
//! ```
//!
//! `components` is a sequence so that declaration and dependency order are
//! preserved exactly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mlua::prelude::*;
use tracing::debug;

use crate::config::{BuildConfig, ToolPrograms};
use crate::error::ConfigError;
use crate::graph::{ComponentSpec, DependencyGraph};

const TOP_LEVEL_FIELDS: &[&str] = &[
  "package_org",
  "target_dir",
  "components_dir",
  "adapter",
  "shared_sources",
  "parallelism",
  "lock_wait",
  "tools",
  "components",
];

const COMPONENT_FIELDS: &[&str] = &["name", "dependencies"];

const TOOL_FIELDS: &[&str] = &["wit_bindgen", "tinygo", "wasm_tools", "golem_cli"];

/// Evaluate the config file at `path` into a validated `BuildConfig`.
///
/// The config root is the directory containing the file.
pub fn load_config(path: &Path) -> Result<BuildConfig, ConfigError> {
  let eval_error = |message: String| ConfigError::Eval {
    path: path.to_path_buf(),
    message,
  };

  let canonical_path = dunce::canonicalize(path).map_err(|e| eval_error(e.to_string()))?;
  let content = std::fs::read_to_string(&canonical_path).map_err(|e| eval_error(e.to_string()))?;
  let root = canonical_path.parent().map(Path::to_path_buf).unwrap_or_default();

  let lua = Lua::new();
  let result = lua
    .load(content.as_str())
    .set_name(format!("@{}", canonical_path.display()))
    .eval::<LuaValue>()
    .map_err(|e| eval_error(e.to_string()))?;

  let returned = result.type_name();
  let LuaValue::Table(table) = result else {
    return Err(eval_error(format!("config must return a table, got {}", returned)));
  };

  let config = parse_config(root, &table)?;
  debug!(
    path = %canonical_path.display(),
    components = config.graph.components().len(),
    "loaded config"
  );
  Ok(config)
}

fn parse_config(root: PathBuf, table: &LuaTable) -> Result<BuildConfig, ConfigError> {
  check_fields("config", table, TOP_LEVEL_FIELDS)?;

  let components = match get_field(table, "components")? {
    LuaValue::Nil => Vec::new(),
    LuaValue::Table(list) => parse_components(&list)?,
    other => return Err(type_error("components", "a list", &other)),
  };

  let mut config = BuildConfig::new(root, DependencyGraph::new(components)?);

  if let Some(org) = get_string(table, "package_org")? {
    config.package_org = org;
  }
  if let Some(dir) = get_string(table, "target_dir")? {
    config.target_dir = PathBuf::from(dir);
  }
  if let Some(dir) = get_string(table, "components_dir")? {
    config.components_dir = PathBuf::from(dir);
  }

  match get_field(table, "adapter")? {
    LuaValue::Nil => {}
    LuaValue::Boolean(false) => config.adapter = None,
    LuaValue::String(s) => config.adapter = Some(PathBuf::from(lua_string("adapter", &s)?)),
    other => return Err(type_error("adapter", "a path or false", &other)),
  }

  config.shared_sources = string_list("shared_sources", get_field(table, "shared_sources")?)?
    .into_iter()
    .map(PathBuf::from)
    .collect();

  match get_field(table, "parallelism")? {
    LuaValue::Nil => {}
    LuaValue::Integer(n) if n > 0 => config.parallelism = n as usize,
    LuaValue::Integer(_) => return Err(ConfigError::ZeroParallelism),
    other => return Err(type_error("parallelism", "a positive integer", &other)),
  }

  match get_field(table, "lock_wait")? {
    LuaValue::Nil => {}
    LuaValue::Integer(secs) if secs >= 0 => config.lock_wait = Duration::from_secs(secs as u64),
    other => return Err(type_error("lock_wait", "a non-negative number of seconds", &other)),
  }

  match get_field(table, "tools")? {
    LuaValue::Nil => {}
    LuaValue::Table(tools) => config.tools = parse_tools(&tools)?,
    other => return Err(type_error("tools", "a table", &other)),
  }

  Ok(config)
}

fn parse_components(list: &LuaTable) -> Result<Vec<ComponentSpec>, ConfigError> {
  let mut components = Vec::new();

  for value in list.sequence_values::<LuaValue>() {
    let value = value.map_err(|e| lua_error("components", e))?;
    let component = match value {
      LuaValue::String(name) => ComponentSpec::new(lua_string("components", &name)?, Vec::<String>::new()),
      LuaValue::Table(entry) => {
        check_fields("component", &entry, COMPONENT_FIELDS)?;
        let name = get_string(&entry, "name")?.ok_or_else(|| ConfigError::InvalidField {
          field: "components".to_string(),
          message: "every component needs a name".to_string(),
        })?;
        let field = format!("components.{}.dependencies", name);
        let dependencies = string_list(&field, get_field(&entry, "dependencies")?)?;
        ComponentSpec { name, dependencies }
      }
      other => return Err(type_error("components", "a name or a table", &other)),
    };
    components.push(component);
  }

  Ok(components)
}

fn parse_tools(table: &LuaTable) -> Result<ToolPrograms, ConfigError> {
  check_fields("tools", table, TOOL_FIELDS)?;

  let mut tools = ToolPrograms::default();
  if let Some(program) = get_string(table, "wit_bindgen")? {
    tools.wit_bindgen = program;
  }
  if let Some(program) = get_string(table, "tinygo")? {
    tools.tinygo = program;
  }
  if let Some(program) = get_string(table, "wasm_tools")? {
    tools.wasm_tools = program;
  }
  if let Some(program) = get_string(table, "golem_cli")? {
    tools.golem_cli = program;
  }
  Ok(tools)
}

/// Reject keys that are not part of the schema, so typos do not go unnoticed.
fn check_fields(context: &str, table: &LuaTable, allowed: &[&str]) -> Result<(), ConfigError> {
  for pair in table.pairs::<LuaValue, LuaValue>() {
    let (key, _) = pair.map_err(|e| lua_error(context, e))?;
    let LuaValue::String(key) = key else {
      continue;
    };
    let key = lua_string(context, &key)?;
    if !allowed.contains(&key.as_str()) {
      return Err(ConfigError::InvalidField {
        field: format!("{}.{}", context, key),
        message: format!("unknown field (expected one of: {})", allowed.join(", ")),
      });
    }
  }
  Ok(())
}

fn get_field(table: &LuaTable, field: &str) -> Result<LuaValue, ConfigError> {
  table.get::<LuaValue>(field).map_err(|e| lua_error(field, e))
}

fn get_string(table: &LuaTable, field: &str) -> Result<Option<String>, ConfigError> {
  match get_field(table, field)? {
    LuaValue::Nil => Ok(None),
    LuaValue::String(s) => Ok(Some(lua_string(field, &s)?)),
    other => Err(type_error(field, "a string", &other)),
  }
}

fn string_list(field: &str, value: LuaValue) -> Result<Vec<String>, ConfigError> {
  let list = match value {
    LuaValue::Nil => return Ok(Vec::new()),
    LuaValue::Table(list) => list,
    other => return Err(type_error(field, "a list of strings", &other)),
  };

  let mut items = Vec::new();
  for item in list.sequence_values::<LuaValue>() {
    match item.map_err(|e| lua_error(field, e))? {
      LuaValue::String(s) => items.push(lua_string(field, &s)?),
      other => return Err(type_error(field, "a list of strings", &other)),
    }
  }
  Ok(items)
}

fn lua_string(field: &str, value: &LuaString) -> Result<String, ConfigError> {
  Ok(value.to_str().map_err(|e| lua_error(field, e))?.to_string())
}

fn lua_error(field: &str, err: LuaError) -> ConfigError {
  ConfigError::InvalidField {
    field: field.to_string(),
    message: err.to_string(),
  }
}

fn type_error(field: &str, expected: &str, got: &LuaValue) -> ConfigError {
  ConfigError::InvalidField {
    field: field.to_string(),
    message: format!("expected {}, got {}", expected, got.type_name()),
  }
}
