use std::{
  fs,
  io::{
    Error as IOError,
    ErrorKind,
  },
  path::PathBuf,
  sync::Arc,
  time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use tiny_lib::{
  config::EditorConfig,
  shell::SuggestionProvider,
};
use tiny_loader::merge_toml_values;
use toml::{
  Value,
  de::Error as TomlError,
};

use crate::provider::CommandProvider;

pub const DEFAULT_SUGGEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub editor:  EditorConfig,
  pub store:   StoreConfig,
  pub suggest: SuggestConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct StoreConfig {
  /// Directory holding one JSON file per document.
  pub dir: Option<PathBuf>,
}

impl StoreConfig {
  pub fn documents_dir(&self) -> PathBuf {
    match &self.dir {
      Some(dir) => tiny_loader::expand_tilde(dir),
      None => tiny_loader::default_documents_dir(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SuggestConfig {
  /// Program and arguments. The document text is written to its stdin.
  /// Empty disables suggestions.
  pub command: Vec<String>,
  /// Milliseconds before a suggestion request is abandoned.
  pub timeout: u64,
}

impl Default for SuggestConfig {
  fn default() -> Self {
    Self {
      command: Vec::new(),
      timeout: DEFAULT_SUGGEST_TIMEOUT_MS,
    }
  }
}

impl SuggestConfig {
  pub fn provider(&self) -> Option<Arc<dyn SuggestionProvider>> {
    if self.command.is_empty() {
      return None;
    }
    Some(Arc::new(CommandProvider::new(
      self.command.clone(),
      Duration::from_millis(self.timeout),
    )))
  }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
  #[error("bad config: {0}")]
  BadConfig(TomlError),
  #[error("failed to read config: {0}")]
  Error(IOError),
}

impl Config {
  /// Merge the workspace config onto the global one. A missing file counts as
  /// empty; a malformed one is an error.
  pub fn load(
    global: Result<String, ConfigLoadError>,
    local: Result<String, ConfigLoadError>,
  ) -> Result<Config, ConfigLoadError> {
    let mut merged = Value::Table(toml::Table::new());
    for source in [global, local] {
      let text = match source {
        Ok(text) => text,
        Err(ConfigLoadError::Error(err)) if err.kind() == ErrorKind::NotFound => continue,
        Err(err) => return Err(err),
      };
      let value: toml::Table = toml::from_str(&text).map_err(ConfigLoadError::BadConfig)?;
      merged = merge_toml_values(merged, Value::Table(value), 3);
    }
    merged.try_into().map_err(ConfigLoadError::BadConfig)
  }

  pub fn load_default() -> Result<Config, ConfigLoadError> {
    let global_config =
      fs::read_to_string(tiny_loader::config_file()).map_err(ConfigLoadError::Error);
    let local_config =
      fs::read_to_string(tiny_loader::workspace_config_file()).map_err(ConfigLoadError::Error);
    Self::load(global_config, local_config)
  }
}
