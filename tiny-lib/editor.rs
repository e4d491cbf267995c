//! Block editor controller.
//!
//! [`BlockEditor`] routes keystrokes for the active block to the block model,
//! keeps the suggestion state machine in step with what the user types, and
//! debounces content changes into save and suggestion requests.
//!
//! # Design
//!
//! - Single-threaded: every method runs to completion inside one event.
//! - Outgoing collaborator calls are queued as [`Effect`]s. The host drains
//!   them with [`BlockEditor::drain_effects`] and reports completions back
//!   as later, independent events ([`BlockEditor::apply_suggestion`],
//!   [`BlockEditor::save_failed`], ...).
//! - A completion is only applied after re-validating its request token and
//!   its target block, since anything may have changed while it was in
//!   flight.
//! - Surfaces hold the live text of mounted blocks. The model is brought up
//!   to date only at serialization boundaries: save, suggestion request,
//!   copy, split and merge.

use std::{
  fmt,
  mem,
  time::Instant,
};

use tiny_event::Debounce;

use crate::{
  block::{
    BlockId,
    Blocks,
    Direction,
    byte_index,
    split_at_char,
  },
  caret::{
    NativeEditing,
    SurfaceLifecycle,
    SurfaceText,
  },
  config::EditorConfig,
  input::{
    Key,
    KeyOutcome,
  },
  messages::{
    MessageCenter,
    MessageSource,
  },
  suggestion::{
    Consumed,
    Offer,
    RequestToken,
    Suggestion,
    TokenMint,
  },
};

/// A call the host must make on the editor's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
  /// Persist the whole serialized document.
  SaveContent { text: String },
  /// Ask for a continuation of `text`. The answer must be fed back through
  /// [`BlockEditor::apply_suggestion`] with the same token.
  RequestSuggestion {
    token: RequestToken,
    block: BlockId,
    text:  String,
  },
  /// Persist the document title.
  SaveTitle { title: String },
}

/// Where the caret should land when a block receives focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretTarget {
  Start,
  End,
  At(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingFocus {
  block:  BlockId,
  target: CaretTarget,
}

/// The document title, committed on blur rather than on a timer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleField {
  committed: String,
  draft:     String,
  focused:   bool,
}

impl TitleField {
  pub fn new(title: impl Into<String>) -> Self {
    let committed = title.into();
    Self {
      draft: committed.clone(),
      committed,
      focused: false,
    }
  }

  pub fn text(&self) -> &str {
    &self.draft
  }

  pub fn committed(&self) -> &str {
    &self.committed
  }

  pub fn is_focused(&self) -> bool {
    self.focused
  }

  pub fn is_dirty(&self) -> bool {
    self.draft != self.committed
  }
}

pub struct BlockEditor<A: SurfaceText> {
  blocks:        Blocks<A::Surface>,
  surfaces:      A,
  active:        Option<BlockId>,
  pending_focus: Option<PendingFocus>,
  suggestion:    Suggestion,
  tokens:        TokenMint,
  requested_for: Option<(RequestToken, BlockId)>,
  debounce:      Debounce,
  title:         TitleField,
  effects:       Vec<Effect>,
  messages:      MessageCenter,
  config:        EditorConfig,
}

impl<A> fmt::Debug for BlockEditor<A>
where
  A: SurfaceText,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BlockEditor")
      .field("blocks", &self.blocks)
      .field("active", &self.active)
      .field("suggestion", self.suggestion.state())
      .field("debounce", &self.debounce)
      .field("title", &self.title)
      .field("effects", &self.effects)
      .finish_non_exhaustive()
  }
}

impl<A> BlockEditor<A>
where
  A: SurfaceText + SurfaceLifecycle,
{
  /// Open `content` for editing. The caret is requested at the end of the
  /// last block and lands there once that block is mounted.
  pub fn new(surfaces: A, content: &str, title: impl Into<String>, config: EditorConfig) -> Self {
    let blocks = Blocks::deserialize(content);
    let last = blocks.last().id();
    Self {
      blocks,
      surfaces,
      active: Some(last),
      pending_focus: Some(PendingFocus {
        block:  last,
        target: CaretTarget::End,
      }),
      suggestion: Suggestion::new(),
      tokens: TokenMint::new(),
      requested_for: None,
      debounce: Debounce::new(config.debounce_delay()),
      title: TitleField::new(title),
      effects: Vec::new(),
      messages: MessageCenter::with_limit(config.max_messages),
      config,
    }
  }

  pub fn blocks(&self) -> &Blocks<A::Surface> {
    &self.blocks
  }

  pub fn surfaces(&self) -> &A {
    &self.surfaces
  }

  pub fn surfaces_mut(&mut self) -> &mut A {
    &mut self.surfaces
  }

  pub fn config(&self) -> &EditorConfig {
    &self.config
  }

  pub fn active(&self) -> Option<BlockId> {
    self.active
  }

  pub fn suggestion(&self) -> &Suggestion {
    &self.suggestion
  }

  pub fn messages(&self) -> &MessageCenter {
    &self.messages
  }

  pub fn messages_mut(&mut self) -> &mut MessageCenter {
    &mut self.messages
  }

  pub fn title(&self) -> &TitleField {
    &self.title
  }

  /// The tentative text to draw after the active block's caret.
  pub fn overlay(&self) -> Option<&str> {
    self.suggestion.overlay(self.active?)
  }

  /// When the host should next call [`BlockEditor::tick`].
  pub fn next_deadline(&self) -> Option<Instant> {
    self.debounce.deadline()
  }

  pub fn effects(&self) -> &[Effect] {
    &self.effects
  }

  pub fn drain_effects(&mut self) -> Vec<Effect> {
    mem::take(&mut self.effects)
  }

  fn surface_of(&self, id: BlockId) -> Option<A::Surface> {
    self.blocks.get(id)?.surface().copied()
  }

  /// Current text of a block: its surface when mounted, the model otherwise.
  pub fn live_text(&self, id: BlockId) -> Option<String> {
    let block = self.blocks.get(id)?;
    let live = block
      .surface()
      .and_then(|surface| self.surfaces.read(*surface));
    Some(live.unwrap_or_else(|| block.text().to_string()))
  }

  fn sync_block(&mut self, id: BlockId) -> Option<String> {
    let text = self.live_text(id)?;
    self.blocks.get_mut(id)?.set_text(text.clone());
    Some(text)
  }

  fn sync_all(&mut self) {
    let surfaces = &self.surfaces;
    for block in self.blocks.iter_mut() {
      if let Some(surface) = block.surface()
        && let Some(text) = surfaces.read(*surface)
      {
        block.set_text(text);
      }
    }
  }

  /// The whole document as flat text, read from the live surfaces.
  pub fn document_text(&mut self) -> String {
    self.sync_all();
    self.blocks.serialize()
  }

  /// Same as [`BlockEditor::document_text`]; the text the host should put
  /// on its clipboard.
  pub fn copy(&mut self) -> String {
    self.document_text()
  }

  // Mounting

  /// Associate `id` with a live surface and fill it with the block's text.
  /// A focus request waiting for this block is honored now.
  pub fn mount(&mut self, id: BlockId, surface: A::Surface) -> bool {
    let Some(block) = self.blocks.get_mut(id) else {
      log::error!("cannot mount surface {surface:?}: block {id} does not exist");
      return false;
    };
    let text = block.text().to_string();
    if let Some(previous) = block.set_surface(surface)
      && previous != surface
    {
      self.surfaces.release_surface(previous);
    }
    self.surfaces.write(surface, &text);

    if let Some(pending) = self.pending_focus
      && pending.block == id
    {
      self.pending_focus = None;
      self.focus_block(id, pending.target);
    }
    true
  }

  /// Detach the surface of `id`, keeping its last live text in the model.
  pub fn unmount(&mut self, id: BlockId) -> Option<A::Surface> {
    if self.sync_block(id).is_none() {
      log::error!("cannot unmount block {id}: it does not exist");
      return None;
    }
    let surface = self.blocks.get_mut(id)?.take_surface()?;
    self.surfaces.release_surface(surface);
    Some(surface)
  }

  /// Create and mount surfaces for every block that has none yet, the way a
  /// UI renders newly created blocks.
  pub fn mount_pending(&mut self) -> usize {
    let unmounted: Vec<_> = self
      .blocks
      .iter()
      .filter(|block| block.surface().is_none())
      .map(|block| block.id())
      .collect();
    for id in &unmounted {
      let surface = self.surfaces.create_surface();
      self.mount(*id, surface);
    }
    unmounted.len()
  }

  // Focus

  /// Make `id` the active block and move the caret there, or remember the
  /// request until the block is mounted.
  pub fn focus_block(&mut self, id: BlockId, target: CaretTarget) -> bool {
    let Some(block) = self.blocks.get(id) else {
      log::error!("cannot focus block {id}: it does not exist");
      return false;
    };
    self.active = Some(id);
    self.title.focused = false;

    let Some(surface) = block.surface().copied() else {
      self.pending_focus = Some(PendingFocus { block: id, target });
      return true;
    };
    let offset = match target {
      CaretTarget::Start => 0,
      CaretTarget::End => self.live_text(id).map_or(0, |text| text.chars().count()),
      CaretTarget::At(offset) => offset,
    };
    self.surfaces.place_caret(surface, offset);
    true
  }

  fn focus_neighbor(&mut self, id: BlockId, direction: Direction) -> bool {
    let (neighbor, target) = match direction {
      Direction::TowardPrevious => (self.blocks.previous(id), CaretTarget::End),
      Direction::TowardNext => (self.blocks.next(id), CaretTarget::Start),
    };
    match neighbor.map(|block| block.id()) {
      Some(neighbor) => self.focus_block(neighbor, target),
      None => false,
    }
  }

  // Keystrokes

  /// Route one keystroke typed into the active block.
  ///
  /// Returns [`KeyOutcome::Handled`] when the controller consumed the key
  /// (split, merge, cross-block navigation, suggestion acceptance). On
  /// [`KeyOutcome::Continue`] the host applies its default behavior and, if
  /// the text changed, reports it with [`BlockEditor::content_changed`].
  pub fn handle_key(&mut self, key: &Key, now: Instant) -> KeyOutcome {
    let Some(id) = self.active else {
      return KeyOutcome::Continue;
    };
    let Some(surface) = self.surface_of(id) else {
      return KeyOutcome::Continue;
    };

    if *key == Key::Tab && self.accept_suggestion(id, surface) {
      return KeyOutcome::Handled;
    }

    if let Consumed::Discarded = self.suggestion.consume(id, key) {
      log::debug!("suggestion discarded by {key:?} in block {id}");
    }

    let caret = self.surfaces.caret_offset(surface);
    let len = self
      .live_text(id)
      .map_or(0, |text| text.chars().count());

    match (key, caret) {
      (Key::Enter, _) => {
        self.split(id, caret.unwrap_or(len), now);
        KeyOutcome::Handled
      },
      (Key::Right | Key::Down, Some(offset)) if offset == len => {
        if self.focus_neighbor(id, Direction::TowardNext) {
          KeyOutcome::Handled
        } else {
          KeyOutcome::Continue
        }
      },
      (Key::Left | Key::Up, Some(0)) => {
        if self.focus_neighbor(id, Direction::TowardPrevious) {
          KeyOutcome::Handled
        } else {
          KeyOutcome::Continue
        }
      },
      (Key::Backspace, Some(0)) => {
        self.merge(id, Direction::TowardPrevious, now);
        KeyOutcome::Handled
      },
      (Key::Delete, Some(offset)) if offset == len => {
        self.merge(id, Direction::TowardNext, now);
        KeyOutcome::Handled
      },
      _ => KeyOutcome::Continue,
    }
  }

  fn accept_suggestion(&mut self, id: BlockId, surface: A::Surface) -> bool {
    let Some(unit) = self.suggestion.accept(id) else {
      return false;
    };
    let Some(mut text) = self.live_text(id) else {
      return false;
    };
    let caret = self
      .surfaces
      .caret_offset(surface)
      .unwrap_or_else(|| text.chars().count());
    text.insert_str(byte_index(&text, caret), &unit);

    self.surfaces.write(surface, &text);
    self
      .surfaces
      .place_caret(surface, caret + unit.chars().count());
    if let Some(block) = self.blocks.get_mut(id) {
      block.set_text(text);
    }

    let document = self.document_text();
    self.effects.push(Effect::SaveContent { text: document });
    true
  }

  /// Record an edit to block text. Re-arms the shared debounce timer and
  /// retires the request in flight, whose context is now outdated.
  pub fn content_changed(&mut self, now: Instant) {
    self.debounce.arm(now);
    if let Some(token) = self.tokens.retire() {
      log::debug!("edit supersedes suggestion request {token:?}");
    }
  }

  // Structure

  /// Split `id` at the character `offset`. The text after the offset,
  /// trimmed, seeds a new block right after `id`, which receives focus.
  /// `id` keeps its text when that tail trims to nothing.
  pub fn split(&mut self, id: BlockId, offset: usize, now: Instant) -> Option<BlockId> {
    let Some(text) = self.sync_block(id) else {
      log::error!("cannot split block {id}: it does not exist");
      return None;
    };
    let (head, tail) = split_at_char(&text, offset);
    let (head, tail) = (head.to_string(), tail.trim().to_string());
    // A whitespace-only tail stays where it is.
    let shortens = !tail.is_empty();

    let new = match self.blocks.split(id, tail) {
      Ok(new) => new,
      Err(err) => {
        log::error!("split failed: {err}");
        return None;
      },
    };
    if shortens {
      if let Some(surface) = self.surface_of(id) {
        self.surfaces.write(surface, &head);
      }
      if let Some(block) = self.blocks.get_mut(id) {
        block.set_text(head);
      }
    }
    log::debug!("split block {id} at {offset}, new block {new}");

    self.focus_block(new, CaretTarget::Start);
    self.content_changed(now);
    Some(new)
  }

  /// Merge `id` with its neighbor. Toward the previous block, the caret
  /// lands on the seam in the combined block; toward the next block it stays
  /// where it was, which is the seam as well.
  pub fn merge(&mut self, id: BlockId, direction: Direction, now: Instant) -> Option<BlockId> {
    self.sync_all();
    let merge = match self.blocks.merge(id, direction) {
      Ok(merge) => merge,
      Err(err) => {
        log::error!("merge failed: {err}");
        return None;
      },
    };
    if let Some(released) = merge.released {
      self.surfaces.release_surface(released);
    }
    if let Some(text) = self.blocks.get(merge.survivor).map(|b| b.text().to_string())
      && let Some(surface) = self.surface_of(merge.survivor)
    {
      self.surfaces.write(surface, &text);
    }
    if self.requested_for.is_some_and(|(_, block)| block == merge.removed) {
      self.requested_for = None;
    }
    log::debug!(
      "merged block {} into {} at seam {}",
      merge.removed,
      merge.survivor,
      merge.seam
    );

    self.focus_block(merge.survivor, CaretTarget::At(merge.seam));
    self.content_changed(now);
    Some(merge.survivor)
  }

  /// Replace the whole document with pasted text. Every previous block
  /// identity is discarded.
  pub fn paste(&mut self, text: &str, now: Instant) {
    for surface in self.blocks.replace_with_text(text) {
      self.surfaces.release_surface(surface);
    }
    self.suggestion.discard();
    self.requested_for = None;
    let last = self.blocks.last().id();
    self.focus_block(last, CaretTarget::End);
    self.content_changed(now);
  }

  // Timers and completions

  /// Fire the debounce if its quiet period is over.
  ///
  /// A fired debounce always saves the document. It also asks for a new
  /// suggestion, unless one is still held: the user is busy typing through
  /// or ignoring it.
  pub fn tick(&mut self, now: Instant) -> bool {
    if !self.debounce.poll(now) {
      return false;
    }
    let text = self.document_text();
    self.effects.push(Effect::SaveContent { text: text.clone() });

    if !self.suggestion.is_held()
      && let Some(block) = self.active
    {
      let token = self.tokens.issue();
      self.requested_for = Some((token, block));
      self
        .effects
        .push(Effect::RequestSuggestion { token, block, text });
    }
    true
  }

  /// Save immediately if an edit is still waiting for its quiet period.
  pub fn flush(&mut self) -> bool {
    if !self.debounce.flush() {
      return false;
    }
    let text = self.document_text();
    self.effects.push(Effect::SaveContent { text });
    true
  }

  /// Deliver the answer to a suggestion request.
  pub fn apply_suggestion(&mut self, token: RequestToken, prediction: impl Into<String>) -> Offer {
    let latest = self.tokens.latest();
    let Some((requested, block)) = self.requested_for else {
      log::debug!("no suggestion request outstanding, dropping {token:?}");
      return Offer::Stale;
    };
    if requested != token || !self.blocks.contains(block) {
      log::debug!("dropping suggestion {token:?} for block {block}");
      return Offer::Stale;
    }
    let offer = self.suggestion.offer(token, latest, block, prediction);
    if offer != Offer::Stale {
      self.messages.resolve(MessageSource::Suggest);
    }
    offer
  }

  /// Report a failed suggestion request. Failures of stale requests are
  /// not worth the user's attention.
  pub fn suggestion_failed(&mut self, token: RequestToken, error: impl fmt::Display) {
    log::warn!("suggestion request {token:?} failed: {error}");
    if self.tokens.is_current(token) {
      self
        .messages
        .warning(MessageSource::Suggest, format!("Suggestion unavailable: {error}"));
    }
  }

  pub fn save_failed(&mut self, error: impl fmt::Display) {
    log::warn!("saving content failed: {error}");
    self
      .messages
      .error(MessageSource::Save, format!("Failed to save document: {error}"));
  }

  /// A content save went through; an earlier save failure no longer applies.
  pub fn save_succeeded(&mut self) {
    if self.messages.resolve(MessageSource::Save).is_some() {
      log::info!("saving content recovered");
    }
  }

  pub fn title_save_succeeded(&mut self) {
    if self.messages.resolve(MessageSource::Title).is_some() {
      log::info!("saving title recovered");
    }
  }

  pub fn title_save_failed(&mut self, error: impl fmt::Display) {
    log::warn!("saving title failed: {error}");
    self
      .messages
      .error(MessageSource::Title, format!("Failed to save title: {error}"));
  }

  // Title

  pub fn title_focus(&mut self) {
    self.title.focused = true;
  }

  pub fn title_input(&mut self, text: impl Into<String>) {
    self.title.draft = text.into();
  }

  /// Commit the title if it changed while focused.
  pub fn title_blur(&mut self) -> bool {
    self.title.focused = false;
    if !self.title.is_dirty() {
      return false;
    }
    self.title.committed = self.title.draft.clone();
    self.effects.push(Effect::SaveTitle {
      title: self.title.committed.clone(),
    });
    true
  }
}

impl<A> BlockEditor<A>
where
  A: NativeEditing + SurfaceLifecycle,
{
  /// One full keystroke cycle: controller routing, the toolkit's default
  /// handling when the controller passes, and the render step that mounts
  /// newly created blocks.
  pub fn press(&mut self, key: &Key, now: Instant) -> KeyOutcome {
    let outcome = self.handle_key(key, now);
    if outcome == KeyOutcome::Continue
      && let Some(surface) = self.active.and_then(|id| self.surface_of(id))
      && self.surfaces.apply_native(surface, key)
    {
      self.content_changed(now);
    }
    self.mount_pending();
    outcome
  }

  pub fn type_text(&mut self, text: &str, now: Instant) {
    for c in text.chars() {
      self.press(&Key::Char(c), now);
    }
  }

  pub fn title_key(&mut self, key: &Key) {
    let mut draft = self.title.draft.clone();
    match key {
      Key::Char(c) => draft.push(*c),
      Key::Backspace => {
        draft.pop();
      },
      _ => return,
    }
    self.title_input(draft);
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::{
    caret::{
      CaretAdapter,
      MemorySurfaces,
    },
    suggestion::SuggestionState,
  };

  fn editor(content: &str) -> BlockEditor<MemorySurfaces> {
    let mut editor = BlockEditor::new(
      MemorySurfaces::new(),
      content,
      "Blank Page",
      EditorConfig::default(),
    );
    editor.mount_pending();
    editor
  }

  fn caret(editor: &BlockEditor<MemorySurfaces>) -> Option<usize> {
    let id = editor.active()?;
    let surface = *editor.blocks().get(id)?.surface()?;
    editor.surfaces().caret_offset(surface)
  }

  fn quiet(editor: &mut BlockEditor<MemorySurfaces>, now: Instant) -> Instant {
    let later = now + editor.config().debounce_delay();
    assert!(editor.tick(later));
    later
  }

  fn request(effects: &[Effect]) -> Option<RequestToken> {
    effects.iter().find_map(|effect| match effect {
      Effect::RequestSuggestion { token, .. } => Some(*token),
      _ => None,
    })
  }

  #[test]
  fn opens_with_caret_at_end_of_last_block() {
    let editor = editor("one\ntwo");
    assert_eq!(editor.active(), Some(BlockId::new(1)));
    assert_eq!(caret(&editor), Some(3));
  }

  #[test]
  fn enter_splits_at_caret_and_focuses_new_block() {
    let now = Instant::now();
    let mut editor = editor("Line one\n\n\nLine two");
    editor.focus_block(BlockId::new(0), CaretTarget::At(5));

    assert_eq!(editor.press(&Key::Enter, now), KeyOutcome::Handled);
    assert_eq!(editor.blocks().texts(), ["Line ", "one", "Line two"]);
    assert_eq!(editor.active(), Some(BlockId::new(2)));
    assert_eq!(caret(&editor), Some(0));
    assert_eq!(editor.document_text(), "Line \none\nLine two");
  }

  #[test]
  fn enter_at_end_creates_empty_block() {
    let now = Instant::now();
    let mut editor = editor("abc");
    editor.press(&Key::Enter, now);
    assert_eq!(editor.blocks().texts(), ["abc", ""]);
  }

  #[test]
  fn backspace_at_start_merges_into_previous_at_seam() {
    let now = Instant::now();
    let mut editor = editor("hello\nworld");
    editor.focus_block(BlockId::new(1), CaretTarget::Start);

    assert_eq!(editor.press(&Key::Backspace, now), KeyOutcome::Handled);
    assert_eq!(editor.blocks().texts(), ["helloworld"]);
    assert_eq!(editor.active(), Some(BlockId::new(0)));
    assert_eq!(caret(&editor), Some(5));
    assert_eq!(editor.surfaces().len(), 1);
  }

  #[test]
  fn backspace_on_first_block_start_is_a_noop() {
    let now = Instant::now();
    let mut editor = editor("hello\nworld");
    editor.focus_block(BlockId::new(0), CaretTarget::Start);

    assert_eq!(editor.press(&Key::Backspace, now), KeyOutcome::Handled);
    assert_eq!(editor.blocks().texts(), ["hello", "world"]);
  }

  #[test]
  fn delete_at_end_merges_next_and_keeps_caret() {
    let now = Instant::now();
    let mut editor = editor("ab\ncd\nef");
    editor.focus_block(BlockId::new(0), CaretTarget::End);

    assert_eq!(editor.press(&Key::Delete, now), KeyOutcome::Handled);
    assert_eq!(editor.blocks().texts(), ["abcd", "ef"]);
    assert_eq!(editor.active(), Some(BlockId::new(0)));
    assert_eq!(caret(&editor), Some(2));
  }

  #[test]
  fn delete_on_last_block_end_is_a_noop() {
    let now = Instant::now();
    let mut editor = editor("hello\nworld");
    editor.focus_block(BlockId::new(1), CaretTarget::End);

    assert_eq!(editor.press(&Key::Delete, now), KeyOutcome::Handled);
    assert_eq!(editor.blocks().texts(), ["hello", "world"]);
    assert_eq!(editor.active(), Some(BlockId::new(1)));
    assert_eq!(caret(&editor), Some(5));
  }

  #[test]
  fn enter_before_trailing_whitespace_keeps_it() {
    let now = Instant::now();
    let mut editor = editor("ab   ");
    editor.focus_block(BlockId::new(0), CaretTarget::At(2));

    assert_eq!(editor.press(&Key::Enter, now), KeyOutcome::Handled);
    assert_eq!(editor.blocks().texts(), ["ab   ", ""]);
    assert_eq!(editor.active(), Some(BlockId::new(1)));
  }

  #[test]
  fn arrows_cross_block_boundaries_only_at_the_edges() {
    let now = Instant::now();
    let mut editor = editor("ab\ncd");
    editor.focus_block(BlockId::new(0), CaretTarget::At(1));

    assert_eq!(editor.press(&Key::Right, now), KeyOutcome::Continue);
    assert_eq!(caret(&editor), Some(2));
    assert_eq!(editor.press(&Key::Right, now), KeyOutcome::Handled);
    assert_eq!(editor.active(), Some(BlockId::new(1)));
    assert_eq!(caret(&editor), Some(0));

    assert_eq!(editor.press(&Key::Up, now), KeyOutcome::Handled);
    assert_eq!(editor.active(), Some(BlockId::new(0)));
    assert_eq!(caret(&editor), Some(2));

    assert_eq!(editor.press(&Key::Down, now), KeyOutcome::Handled);
    assert_eq!(editor.press(&Key::Down, now), KeyOutcome::Continue);
    assert_eq!(editor.press(&Key::Down, now), KeyOutcome::Continue);
    assert_eq!(editor.active(), Some(BlockId::new(1)));
    assert_eq!(editor.blocks().len(), 2);
  }

  #[test]
  fn debounce_requests_suggestion_when_idle() {
    let now = Instant::now();
    let mut editor = editor("");
    editor.type_text("hel", now);
    assert!(editor.effects().is_empty());
    assert!(!editor.tick(now + Duration::from_millis(10)));

    quiet(&mut editor, now);
    let effects = editor.drain_effects();
    assert_eq!(
      effects[0],
      Effect::SaveContent {
        text: "hel".into(),
      }
    );
    assert!(matches!(
      &effects[1],
      Effect::RequestSuggestion { block, text, .. }
        if *block == BlockId::new(0) && text == "hel"
    ));
  }

  #[test]
  fn debounce_only_saves_while_a_suggestion_is_held() {
    let now = Instant::now();
    let mut editor = editor("");
    editor.type_text("hel", now);
    let now = quiet(&mut editor, now);
    let token = request(&editor.drain_effects()).unwrap();
    assert_eq!(editor.apply_suggestion(token, "lo there"), Offer::Applied);

    editor.type_text("lo", now);
    quiet(&mut editor, now);
    let effects = editor.drain_effects();
    assert_eq!(effects.len(), 1);
    assert!(matches!(effects[0], Effect::SaveContent { .. }));
    assert_eq!(editor.overlay(), Some(" there"));
  }

  #[test]
  fn tab_accepts_one_clause_and_saves() {
    let now = Instant::now();
    let mut editor = editor("");
    editor.type_text("hel", now);
    let now = quiet(&mut editor, now);
    let token = request(&editor.drain_effects()).unwrap();
    editor.apply_suggestion(token, "lo, world. Next");

    assert_eq!(editor.press(&Key::Tab, now), KeyOutcome::Handled);
    assert_eq!(editor.live_text(BlockId::new(0)).as_deref(), Some("hello,"));
    assert_eq!(caret(&editor), Some(6));
    assert_eq!(
      editor.drain_effects(),
      [Effect::SaveContent {
        text: "hello,".into(),
      }]
    );
    assert_eq!(editor.suggestion().remaining(), Some(" world. Next"));
    assert!(matches!(
      editor.suggestion().state(),
      SuggestionState::Consuming(_)
    ));

    editor.press(&Key::Char('x'), now);
    assert!(!editor.suggestion().is_held());
  }

  #[test]
  fn tab_without_suggestion_passes_through() {
    let now = Instant::now();
    let mut editor = editor("abc");
    assert_eq!(editor.press(&Key::Tab, now), KeyOutcome::Continue);
    assert_eq!(editor.document_text(), "abc");
  }

  #[test]
  fn edits_retire_the_request_in_flight() {
    let now = Instant::now();
    let mut editor = editor("");
    editor.type_text("a", now);
    let now = quiet(&mut editor, now);
    let token = request(&editor.drain_effects()).unwrap();

    editor.type_text("b", now);
    assert_eq!(editor.apply_suggestion(token, "late"), Offer::Stale);
    assert_eq!(editor.overlay(), None);
  }

  #[test]
  fn suggestion_for_a_removed_block_is_dropped() {
    let now = Instant::now();
    let mut editor = editor("one\ntwo");
    editor.content_changed(now);
    quiet(&mut editor, now);
    let token = request(&editor.drain_effects()).unwrap();

    editor.paste("fresh", now);
    assert_eq!(editor.apply_suggestion(token, "never"), Offer::Stale);
  }

  #[test]
  fn paste_replaces_all_blocks_with_new_ids() {
    let now = Instant::now();
    let mut editor = editor("a\nb");
    editor.paste("x\n\n  y  ", now);
    editor.mount_pending();

    assert_eq!(editor.blocks().texts(), ["x", "y"]);
    assert_eq!(
      editor.blocks().ids().collect::<Vec<_>>(),
      [BlockId::new(2), BlockId::new(3)]
    );
    assert_eq!(editor.surfaces().len(), 2);
    assert_eq!(editor.active(), Some(BlockId::new(3)));
    assert_eq!(caret(&editor), Some(1));
  }

  #[test]
  fn unknown_block_operations_are_noops() {
    let now = Instant::now();
    let mut editor = editor("a\nb");
    let ghost = BlockId::new(42);

    assert_eq!(editor.split(ghost, 0, now), None);
    assert_eq!(editor.merge(ghost, Direction::TowardNext, now), None);
    assert!(!editor.focus_block(ghost, CaretTarget::Start));
    assert!(!editor.mount(ghost, editor.surfaces().focused().unwrap()));
    assert_eq!(editor.unmount(ghost), None);
    assert_eq!(editor.blocks().texts(), ["a", "b"]);
    assert!(editor.next_deadline().is_none());
  }

  #[test]
  fn split_focus_waits_for_mount() {
    let now = Instant::now();
    let mut editor = editor("abc");
    let new = editor.split(BlockId::new(0), 1, now).unwrap();
    assert_eq!(editor.active(), Some(new));
    assert_eq!(editor.handle_key(&Key::Char('x'), now), KeyOutcome::Continue);

    let surface = editor.surfaces_mut().create_surface();
    assert!(editor.mount(new, surface));
    assert_eq!(editor.surfaces().focused(), Some(surface));
    assert_eq!(editor.live_text(new).as_deref(), Some("bc"));
  }

  #[test]
  fn failures_become_messages() {
    let now = Instant::now();
    let mut editor = editor("");
    editor.type_text("a", now);
    quiet(&mut editor, now);
    let token = request(&editor.drain_effects()).unwrap();

    editor.save_failed("offline");
    editor.suggestion_failed(token, "timeout");
    let active = editor.messages().active().unwrap();
    assert_eq!(active.source, MessageSource::Save);
    assert_eq!(editor.messages().history_len(), 2);
    assert_eq!(editor.document_text(), "a");
  }

  #[test]
  fn later_success_clears_a_failure_message() {
    let now = Instant::now();
    let mut editor = editor("");
    editor.save_failed("offline");
    editor.type_text("a", now);
    quiet(&mut editor, now);
    let token = request(&editor.drain_effects()).unwrap();

    editor.save_succeeded();
    assert!(editor.messages().active().is_none());

    editor.suggestion_failed(token, "timeout");
    assert_eq!(
      editor.messages().active().map(|m| m.source),
      Some(MessageSource::Suggest)
    );
    editor.title_save_succeeded();
    assert!(editor.messages().active().is_some());
    assert_eq!(editor.apply_suggestion(token, " b."), Offer::Applied);
    assert!(editor.messages().active().is_none());
  }

  #[test]
  fn title_commits_on_blur_only_when_changed() {
    let mut editor = editor("");
    editor.title_focus();
    assert!(!editor.title_blur());

    editor.title_focus();
    editor.title_key(&Key::Char('!'));
    assert!(editor.effects().is_empty());
    assert!(editor.title_blur());
    assert_eq!(
      editor.drain_effects(),
      [Effect::SaveTitle {
        title: "Blank Page!".into(),
      }]
    );
    assert_eq!(editor.title().committed(), "Blank Page!");
  }

  #[test]
  fn flush_saves_pending_edit() {
    let now = Instant::now();
    let mut editor = editor("");
    assert!(!editor.flush());
    editor.type_text("z", now);
    assert!(editor.flush());
    assert_eq!(
      editor.drain_effects(),
      [Effect::SaveContent { text: "z".into() }]
    );
    assert!(!editor.tick(now + Duration::from_secs(5)));
  }
}
