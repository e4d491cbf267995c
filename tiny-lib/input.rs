//! Key vocabulary shared by the controller, the suggestion state machine and
//! the host adapters.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
  Shift,
  Control,
  Alt,
  Meta,
  CapsLock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
  Char(char),
  Enter,
  Escape,
  Backspace,
  Tab,
  Delete,
  Home,
  End,
  Left,
  Right,
  Up,
  Down,
  /// A bare modifier press. Hosts that report modifiers as separate key
  /// events (browsers do) forward them as this variant.
  Modifier(Modifier),
}

impl Key {
  pub const SPACE: Key = Key::Char(' ');

  /// Keys that never invalidate a held suggestion even when they do not match
  /// it: caret movement, Enter, modifiers, Tab and Space.
  pub fn is_non_content(&self) -> bool {
    matches!(
      self,
      Key::Left
        | Key::Right
        | Key::Up
        | Key::Down
        | Key::Enter
        | Key::Tab
        | Key::Modifier(_)
        | Key::Char(' ')
    )
  }

  pub fn as_char(&self) -> Option<char> {
    match self {
      Key::Char(c) => Some(*c),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyOutcome {
  /// The host should run its default handling for the key.
  #[default]
  Continue,
  /// The controller consumed the key; the host must not act on it.
  Handled,
}

impl KeyOutcome {
  pub fn is_handled(self) -> bool {
    self == KeyOutcome::Handled
  }
}
