//! Input handling - maps crossterm key events to editor actions.

use crossterm::event::{
  KeyCode,
  KeyEvent as CrosstermKeyEvent,
  KeyEventKind,
  KeyModifiers,
  ModifierKeyCode,
};
use tiny_lib::input::{
  Key,
  Modifier,
};

use crate::ctx::Ctx;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  Key(Key),
  Copy,
  Paste,
  FocusTitle,
  Quit,
}

pub fn handle_key(ctx: &mut Ctx, event: CrosstermKeyEvent) {
  let Some(action) = to_action(event) else {
    return;
  };

  match action {
    Action::Quit => ctx.quit(),
    Action::Copy => ctx.copy(),
    Action::Paste => ctx.paste(None),
    Action::FocusTitle => ctx.focus_title(),
    Action::Key(key) if ctx.editor().title().is_focused() => ctx.title_key(&key),
    Action::Key(key) => ctx.press(&key),
  }
}

pub fn to_action(event: CrosstermKeyEvent) -> Option<Action> {
  if event.kind == KeyEventKind::Release {
    return None;
  }

  if event.modifiers.contains(KeyModifiers::CONTROL)
    && let KeyCode::Char(c) = event.code
  {
    return match c.to_ascii_lowercase() {
      'q' => Some(Action::Quit),
      'c' => Some(Action::Copy),
      'v' => Some(Action::Paste),
      't' => Some(Action::FocusTitle),
      _ => None,
    };
  }

  to_key(event.code).map(Action::Key)
}

fn to_key(code: KeyCode) -> Option<Key> {
  match code {
    KeyCode::Char(c) => Some(Key::Char(c)),
    KeyCode::Enter => Some(Key::Enter),
    KeyCode::Tab => Some(Key::Tab),
    KeyCode::Esc => Some(Key::Escape),
    KeyCode::Backspace => Some(Key::Backspace),
    KeyCode::Delete => Some(Key::Delete),
    KeyCode::Home => Some(Key::Home),
    KeyCode::End => Some(Key::End),
    KeyCode::Left => Some(Key::Left),
    KeyCode::Right => Some(Key::Right),
    KeyCode::Up => Some(Key::Up),
    KeyCode::Down => Some(Key::Down),
    KeyCode::CapsLock => Some(Key::Modifier(Modifier::CapsLock)),
    KeyCode::Modifier(modifier) => Some(Key::Modifier(to_modifier(modifier))),
    _ => None,
  }
}

fn to_modifier(code: ModifierKeyCode) -> Modifier {
  match code {
    ModifierKeyCode::LeftShift
    | ModifierKeyCode::RightShift
    | ModifierKeyCode::IsoLevel3Shift
    | ModifierKeyCode::IsoLevel5Shift => Modifier::Shift,
    ModifierKeyCode::LeftControl | ModifierKeyCode::RightControl => Modifier::Control,
    ModifierKeyCode::LeftAlt | ModifierKeyCode::RightAlt => Modifier::Alt,
    ModifierKeyCode::LeftSuper
    | ModifierKeyCode::RightSuper
    | ModifierKeyCode::LeftHyper
    | ModifierKeyCode::RightHyper
    | ModifierKeyCode::LeftMeta
    | ModifierKeyCode::RightMeta => Modifier::Meta,
  }
}
