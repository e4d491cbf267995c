use std::time::Duration;

use serde::{
  Deserialize,
  Serialize,
};

use crate::messages::DEFAULT_HISTORY_LIMIT;

/// Quiet period before a burst of edits is saved, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct EditorConfig {
  /// Milliseconds of inactivity after which the document is saved and,
  /// when no suggestion is held, a new suggestion is requested.
  pub debounce:     u64,
  /// Number of user messages kept in history.
  pub max_messages: usize,
  /// Render the "Tab to accept" hint next to the suggestion overlay.
  pub accept_hint:  bool,
}

impl Default for EditorConfig {
  fn default() -> Self {
    Self {
      debounce:     DEFAULT_DEBOUNCE_MS,
      max_messages: DEFAULT_HISTORY_LIMIT,
      accept_hint:  true,
    }
  }
}

impl EditorConfig {
  pub fn debounce_delay(&self) -> Duration {
    Duration::from_millis(self.debounce)
  }
}
