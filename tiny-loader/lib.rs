use std::{
  path::{
    Path,
    PathBuf,
  },
  sync::OnceLock,
};

use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};

const APP_DIR: &str = "tiny";

/// Name of the per-workspace directory holding `config.toml`.
pub const WORKSPACE_DIR: &str = ".tiny";

static CONFIG_FILE: OnceLock<PathBuf> = OnceLock::new();

static LOG_FILE: OnceLock<PathBuf> = OnceLock::new();

pub fn initialize_config_file(specified_file: Option<PathBuf>) {
  let config_file = specified_file.unwrap_or_else(default_config_file);
  ensure_parent_dir(&config_file);
  CONFIG_FILE.set(config_file).ok();
}

pub fn initialize_log_file(specified_file: Option<PathBuf>) {
  let log_file = specified_file.unwrap_or_else(default_log_file);
  ensure_parent_dir(&log_file);
  LOG_FILE.set(log_file).ok();
}

#[derive(Clone, Copy)]
enum BaseDir {
  Config,
  Cache,
  Data,
}

/// `$var` when set, else the platform base directory joined with the app
/// name. Falls back to the temp dir on platforms without a home directory.
fn base_dir(var: &str, kind: BaseDir) -> PathBuf {
  if let Ok(dir) = std::env::var(var) {
    return expand_tilde(Path::new(&dir));
  }
  let mut path = match choose_base_strategy() {
    Ok(strategy) => {
      match kind {
        BaseDir::Config => strategy.config_dir(),
        BaseDir::Cache => strategy.cache_dir(),
        BaseDir::Data => strategy.data_dir(),
      }
    },
    Err(err) => {
      log::warn!("no home directory ({err}), using the temp dir");
      std::env::temp_dir()
    },
  };
  path.push(APP_DIR);
  path
}

pub fn config_dir() -> PathBuf {
  base_dir("TINY_CONFIG_DIR", BaseDir::Config)
}

pub fn cache_dir() -> PathBuf {
  base_dir("TINY_CACHE_DIR", BaseDir::Cache)
}

pub fn data_dir() -> PathBuf {
  base_dir("TINY_DATA_DIR", BaseDir::Data)
}

/// Where the file store keeps documents unless configured otherwise.
pub fn default_documents_dir() -> PathBuf {
  data_dir().join("documents")
}

pub fn config_file() -> PathBuf {
  CONFIG_FILE
    .get_or_init(|| {
      let path = default_config_file();
      ensure_parent_dir(&path);
      path
    })
    .clone()
}

pub fn log_file() -> PathBuf {
  LOG_FILE
    .get_or_init(|| {
      let path = default_log_file();
      ensure_parent_dir(&path);
      path
    })
    .clone()
}

pub fn workspace_config_file() -> PathBuf {
  find_workspace().0.join(WORKSPACE_DIR).join("config.toml")
}

pub fn default_log_file() -> PathBuf {
  cache_dir().join("tiny.log")
}

fn default_config_file() -> PathBuf {
  config_dir().join("config.toml")
}

pub fn expand_tilde(path: &Path) -> PathBuf {
  if let Ok(rest) = path.strip_prefix("~")
    && let Ok(home) = etcetera::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

/// Merge two TOML documents, merging values from `right` onto `left`.
///
/// `merge_depth` sets the nesting depth up to which tables are merged instead
/// of overridden. Arrays are always replaced: an argv list such as
/// `suggest.command` is meaningful only as a whole.
pub fn merge_toml_values(left: toml::Value, right: toml::Value, merge_depth: usize) -> toml::Value {
  use toml::Value;

  match (left, right) {
    (Value::Table(mut left_map), Value::Table(right_map)) if merge_depth > 0 => {
      for (rname, rvalue) in right_map {
        let merged = match left_map.remove(&rname) {
          Some(lvalue) => merge_toml_values(lvalue, rvalue, merge_depth - 1),
          None => rvalue,
        };
        left_map.insert(rname, merged);
      }
      Value::Table(left_map)
    },
    (_, value) => value,
  }
}

/// Finds the current workspace folder.
///
/// Searches upward from the CWD for the first directory containing `.git`,
/// `.jj` or `.tiny`. If none is found returns (CWD, true), otherwise
/// (workspace, false).
pub fn find_workspace() -> (PathBuf, bool) {
  match std::env::current_dir() {
    Ok(current_dir) => find_workspace_in(current_dir),
    Err(_) => (PathBuf::new(), true),
  }
}

pub fn find_workspace_in(dir: impl AsRef<Path>) -> (PathBuf, bool) {
  let dir = dir.as_ref();
  for ancestor in dir.ancestors() {
    if ancestor.join(".git").exists()
      || ancestor.join(".jj").exists()
      || ancestor.join(WORKSPACE_DIR).exists()
    {
      return (ancestor.to_owned(), false);
    }
  }

  (dir.to_owned(), true)
}

pub fn ensure_parent_dir(path: &Path) {
  if let Some(parent) = path.parent()
    && !parent.exists()
  {
    std::fs::create_dir_all(parent).ok();
  }
}


#[cfg(test)]
mod tests {
  use std::path::Path;

  use super::*;

  #[test]
  fn workspace_is_found_from_nested_dir() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join(WORKSPACE_DIR)).unwrap();
    let nested = root.path().join("a").join("b");
    std::fs::create_dir_all(&nested).unwrap();

    let (found, fallback) = find_workspace_in(&nested);
    assert_eq!(found, root.path());
    assert!(!fallback);
  }

  #[test]
  fn expand_tilde_leaves_plain_paths() {
    assert_eq!(expand_tilde(Path::new("/tmp/x")), Path::new("/tmp/x"));
    assert_eq!(expand_tilde(Path::new("notes")), Path::new("notes"));
  }

  #[test]
  fn ensure_parent_dir_creates_missing_dirs() {
    let root = tempfile::tempdir().unwrap();
    let file = root.path().join("logs").join("tiny.log");
    ensure_parent_dir(&file);
    assert!(root.path().join("logs").is_dir());
  }
}
