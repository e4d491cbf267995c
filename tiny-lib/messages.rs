//! Transient, non-blocking user notifications.
//!
//! Collaborator failures (load, save, suggestion) end up here instead of
//! interrupting editing. The host shows the active message in a status line.

use std::collections::VecDeque;

use serde::{
  Deserialize,
  Serialize,
};

pub const DEFAULT_HISTORY_LIMIT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
  Info,
  Warning,
  Error,
}

/// Which collaborator a message is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
  Editor,
  Load,
  Save,
  Title,
  Suggest,
}

impl MessageSource {
  /// A missed suggestion is less important than an unsaved edit, so it never
  /// displaces a foreground message.
  fn is_background(self) -> bool {
    self == MessageSource::Suggest
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub id:     u64,
  pub level:  MessageLevel,
  pub source: MessageSource,
  pub text:   String,
}

#[derive(Debug, Clone)]
pub struct MessageCenter {
  active:          Option<Message>,
  history:         VecDeque<Message>,
  next_message_id: u64,
  history_limit:   usize,
}

impl Default for MessageCenter {
  fn default() -> Self {
    Self::with_limit(DEFAULT_HISTORY_LIMIT)
  }
}

impl MessageCenter {
  pub fn with_limit(history_limit: usize) -> Self {
    Self {
      active:          None,
      history:         VecDeque::new(),
      next_message_id: 1,
      history_limit:   history_limit.max(1),
    }
  }

  pub fn active(&self) -> Option<&Message> {
    self.active.as_ref()
  }

  pub fn history_len(&self) -> usize {
    self.history.len()
  }

  pub fn history(&self) -> impl Iterator<Item = &Message> {
    self.history.iter()
  }

  pub fn publish(
    &mut self,
    level: MessageLevel,
    source: MessageSource,
    text: impl Into<String>,
  ) -> Message {
    let message = Message {
      id: self.next_message_id,
      level,
      source,
      text: text.into(),
    };
    self.next_message_id = self.next_message_id.saturating_add(1);

    let displaces = !source.is_background()
      || self
        .active
        .as_ref()
        .is_none_or(|active| active.source.is_background());
    if displaces {
      self.active = Some(message.clone());
    }

    self.history.push_back(message.clone());
    while self.history.len() > self.history_limit {
      self.history.pop_front();
    }
    message
  }

  pub fn info(&mut self, source: MessageSource, text: impl Into<String>) -> Message {
    self.publish(MessageLevel::Info, source, text)
  }

  pub fn warning(&mut self, source: MessageSource, text: impl Into<String>) -> Message {
    self.publish(MessageLevel::Warning, source, text)
  }

  pub fn error(&mut self, source: MessageSource, text: impl Into<String>) -> Message {
    self.publish(MessageLevel::Error, source, text)
  }

  pub fn dismiss_active(&mut self) -> Option<Message> {
    self.active.take()
  }

  /// Clear the active message if it came from `source`. Called when a later
  /// operation of the same kind succeeds, so a recovered failure stops
  /// showing.
  pub fn resolve(&mut self, source: MessageSource) -> Option<Message> {
    if self.active.as_ref()?.source != source {
      return None;
    }
    self.active.take()
  }

  pub fn clear(&mut self) {
    self.active = None;
    self.history.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn publish_sets_active() {
    let mut center = MessageCenter::default();
    let message = center.error(MessageSource::Save, "boom");
    assert_eq!(center.active(), Some(&message));
    assert_eq!(center.history_len(), 1);
  }

  #[test]
  fn history_limit_is_enforced() {
    let mut center = MessageCenter::with_limit(2);
    center.info(MessageSource::Editor, "a");
    center.info(MessageSource::Editor, "b");
    center.info(MessageSource::Editor, "c");
    let texts: Vec<_> = center.history().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["b", "c"]);
  }

  #[test]
  fn suggestion_failure_does_not_displace_save_failure() {
    let mut center = MessageCenter::default();
    let save = center.warning(MessageSource::Save, "could not save");
    center.warning(MessageSource::Suggest, "no suggestion");
    assert_eq!(center.active().map(|m| m.id), Some(save.id));
    assert_eq!(center.history_len(), 2);
  }

  #[test]
  fn suggestion_failure_replaces_suggestion_failure() {
    let mut center = MessageCenter::default();
    center.warning(MessageSource::Suggest, "first");
    center.warning(MessageSource::Suggest, "second");
    assert_eq!(center.active().map(|m| m.text.as_str()), Some("second"));
  }

  #[test]
  fn resolve_only_clears_its_own_source() {
    let mut center = MessageCenter::default();
    center.error(MessageSource::Save, "could not save");
    assert!(center.resolve(MessageSource::Title).is_none());
    assert!(center.active().is_some());

    let resolved = center.resolve(MessageSource::Save);
    assert_eq!(resolved.map(|m| m.text), Some("could not save".to_string()));
    assert!(center.active().is_none());
    assert!(center.resolve(MessageSource::Save).is_none());
    assert_eq!(center.history_len(), 1);
  }

  #[test]
  fn dismiss_clears_active_only() {
    let mut center = MessageCenter::default();
    center.info(MessageSource::Title, "saved");
    assert!(center.dismiss_active().is_some());
    assert!(center.active().is_none());
    assert_eq!(center.history_len(), 1);
  }
}
