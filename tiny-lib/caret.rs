//! Caret/selection adapter.
//!
//! The controller never touches a host toolkit's selection API directly. It
//! talks to a set of small traits instead, implemented once per host:
//!
//! - [`CaretAdapter`]: query and place the caret inside one surface.
//! - [`SurfaceText`]: read and write a surface's live text.
//! - [`NativeEditing`]: the toolkit's default handling for keys the controller
//!   lets through.
//! - [`SurfaceLifecycle`]: create and release surfaces as blocks are mounted.
//!
//! [`MemorySurfaces`] implements all of them for single-line in-memory
//! surfaces. The terminal host and the tests run on it.

use std::{
  collections::HashMap,
  fmt,
};

use crate::{
  block::byte_index,
  input::Key,
};

pub trait CaretAdapter {
  /// Opaque handle to one live editable region.
  type Surface: Copy + Eq + fmt::Debug;

  /// Character offset of the caret within `surface`, or `None` when the
  /// selection is not inside that surface.
  fn caret_offset(&self, surface: Self::Surface) -> Option<usize>;

  /// Collapse the selection to `offset` within `surface`, replacing any
  /// existing selection.
  fn place_caret(&mut self, surface: Self::Surface, offset: usize);

  /// Move input focus to `surface`. The caret lands at some valid position.
  fn focus(&mut self, surface: Self::Surface);
}

pub trait SurfaceText: CaretAdapter {
  /// Live text of `surface`, `None` if the surface no longer exists.
  fn read(&self, surface: Self::Surface) -> Option<String>;

  fn write(&mut self, surface: Self::Surface, text: &str);
}

pub trait NativeEditing: SurfaceText {
  /// Apply the toolkit's default behavior for `key` inside `surface`.
  /// Returns true if the surface text changed.
  fn apply_native(&mut self, surface: Self::Surface, key: &Key) -> bool;
}

pub trait SurfaceLifecycle: CaretAdapter {
  fn create_surface(&mut self) -> Self::Surface;

  fn release_surface(&mut self, surface: Self::Surface);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u32);

impl SurfaceId {
  pub const fn get(self) -> u32 {
    self.0
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct MemorySurface {
  text:  String,
  caret: usize,
}

impl MemorySurface {
  fn len_chars(&self) -> usize {
    self.text.chars().count()
  }

  fn clamp_caret(&mut self) {
    self.caret = self.caret.min(self.len_chars());
  }
}

/// Single-line in-memory surfaces with one shared focus.
#[derive(Debug, Clone, Default)]
pub struct MemorySurfaces {
  surfaces: HashMap<SurfaceId, MemorySurface>,
  focused:  Option<SurfaceId>,
  next_id:  u32,
}

impl MemorySurfaces {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn focused(&self) -> Option<SurfaceId> {
    self.focused
  }

  pub fn blur(&mut self) {
    self.focused = None;
  }

  pub fn len(&self) -> usize {
    self.surfaces.len()
  }

  pub fn is_empty(&self) -> bool {
    self.surfaces.is_empty()
  }

  pub fn contains(&self, surface: SurfaceId) -> bool {
    self.surfaces.contains_key(&surface)
  }
}

impl CaretAdapter for MemorySurfaces {
  type Surface = SurfaceId;

  fn caret_offset(&self, surface: SurfaceId) -> Option<usize> {
    if self.focused != Some(surface) {
      return None;
    }
    self.surfaces.get(&surface).map(|s| s.caret)
  }

  fn place_caret(&mut self, surface: SurfaceId, offset: usize) {
    let Some(entry) = self.surfaces.get_mut(&surface) else {
      log::warn!("place_caret on missing surface {surface:?}");
      return;
    };
    entry.caret = offset;
    entry.clamp_caret();
    self.focused = Some(surface);
  }

  fn focus(&mut self, surface: SurfaceId) {
    if let Some(entry) = self.surfaces.get_mut(&surface) {
      entry.clamp_caret();
      self.focused = Some(surface);
    }
  }
}

impl SurfaceText for MemorySurfaces {
  fn read(&self, surface: SurfaceId) -> Option<String> {
    self.surfaces.get(&surface).map(|s| s.text.clone())
  }

  fn write(&mut self, surface: SurfaceId, text: &str) {
    if let Some(entry) = self.surfaces.get_mut(&surface) {
      entry.text.clear();
      entry.text.push_str(text);
      entry.clamp_caret();
    }
  }
}

impl NativeEditing for MemorySurfaces {
  fn apply_native(&mut self, surface: SurfaceId, key: &Key) -> bool {
    let Some(entry) = self.surfaces.get_mut(&surface) else {
      return false;
    };
    entry.clamp_caret();
    let len = entry.len_chars();

    match key {
      Key::Char(c) => {
        let at = byte_index(&entry.text, entry.caret);
        entry.text.insert(at, *c);
        entry.caret += 1;
        true
      },
      Key::Backspace if entry.caret > 0 => {
        entry.caret -= 1;
        let at = byte_index(&entry.text, entry.caret);
        entry.text.remove(at);
        true
      },
      Key::Delete if entry.caret < len => {
        let at = byte_index(&entry.text, entry.caret);
        entry.text.remove(at);
        true
      },
      Key::Left => {
        entry.caret = entry.caret.saturating_sub(1);
        false
      },
      Key::Right => {
        entry.caret = (entry.caret + 1).min(len);
        false
      },
      Key::Home | Key::Up => {
        entry.caret = 0;
        false
      },
      Key::End | Key::Down => {
        entry.caret = len;
        false
      },
      _ => false,
    }
  }
}

impl SurfaceLifecycle for MemorySurfaces {
  fn create_surface(&mut self) -> SurfaceId {
    let id = SurfaceId(self.next_id);
    self.next_id += 1;
    self.surfaces.insert(id, MemorySurface::default());
    id
  }

  fn release_surface(&mut self, surface: SurfaceId) {
    self.surfaces.remove(&surface);
    if self.focused == Some(surface) {
      self.focused = None;
    }
  }
}
