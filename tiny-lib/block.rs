//! Block model.
//!
//! A document is an ordered sequence of text blocks, one per paragraph. The
//! model owns no behavior beyond creating, splitting, merging and converting
//! blocks to and from flat text.
//!
//! # Invariants
//!
//! - There is always at least one block. An empty document is a single block
//!   with empty text.
//! - Block ids are unique within a session and never reused: new ids come
//!   from a monotonic counter, not from the sequence length.
//! - Offsets are character offsets, never byte offsets.
//!
//! Failed operations return a [`BlockError`] and leave the sequence untouched.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u64);

impl BlockId {
  pub const fn new(id: u64) -> Self {
    Self(id)
  }

  pub const fn get(self) -> u64 {
    self.0
  }
}

impl fmt::Display for BlockId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
  TowardPrevious,
  TowardNext,
}

impl fmt::Display for Direction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::TowardPrevious => write!(f, "previous"),
      Self::TowardNext => write!(f, "next"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
  #[error("block {0} does not exist")]
  UnknownBlock(BlockId),
  #[error("block {id} has no {direction} neighbor to merge with")]
  NoNeighbor { id: BlockId, direction: Direction },
}

pub type Result<T> = std::result::Result<T, BlockError>;

/// One paragraph of the document.
///
/// `text` is the committed content. While the block is mounted, its surface
/// is the source of truth and `text` is refreshed from it at serialization
/// boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<S> {
  id:      BlockId,
  text:    String,
  surface: Option<S>,
}

impl<S> Block<S> {
  fn new(id: BlockId, text: String) -> Self {
    Self {
      id,
      text,
      surface: None,
    }
  }

  pub fn id(&self) -> BlockId {
    self.id
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn set_text(&mut self, text: impl Into<String>) {
    self.text = text.into();
  }

  /// Length of the committed text in characters.
  pub fn len_chars(&self) -> usize {
    self.text.chars().count()
  }

  pub fn surface(&self) -> Option<&S> {
    self.surface.as_ref()
  }

  pub fn set_surface(&mut self, surface: S) -> Option<S> {
    self.surface.replace(surface)
  }

  pub fn take_surface(&mut self) -> Option<S> {
    self.surface.take()
  }
}

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merge<S> {
  /// The block that now holds the combined text.
  pub survivor: BlockId,
  /// The block that was absorbed. Its id is retired.
  pub removed:  BlockId,
  /// Character offset in the survivor where the two texts meet.
  pub seam:     usize,
  /// The surface the removed block was mounted on, if any.
  pub released: Option<S>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blocks<S> {
  blocks:  Vec<Block<S>>,
  next_id: u64,
}

impl<S> Default for Blocks<S> {
  fn default() -> Self {
    Self::new()
  }
}

impl<S> Blocks<S> {
  /// A document with a single empty block.
  pub fn new() -> Self {
    Self {
      blocks:  vec![Block::new(BlockId(0), String::new())],
      next_id: 1,
    }
  }

  /// Build a block sequence from flat text.
  ///
  /// The text is split on runs of newlines, every line is trimmed and blank
  /// lines are dropped. Text without any content yields one empty block.
  /// Ids are assigned sequentially from zero.
  pub fn deserialize(text: &str) -> Self {
    let mut blocks = Self {
      blocks:  Vec::new(),
      next_id: 0,
    };
    blocks.fill(text);
    blocks
  }

  /// Replace the whole sequence with the blocks parsed from `text`.
  ///
  /// Unlike [`Blocks::deserialize`] the id counter keeps running, so the
  /// discarded identities are never handed out again. Returns the surfaces
  /// of the discarded blocks.
  pub fn replace_with_text(&mut self, text: &str) -> Vec<S> {
    let released = self
      .blocks
      .drain(..)
      .filter_map(|mut block| block.take_surface())
      .collect();
    self.fill(text);
    released
  }

  fn fill(&mut self, text: &str) {
    for line in text.split('\n').map(str::trim).filter(|line| !line.is_empty()) {
      let id = self.mint();
      self.blocks.push(Block::new(id, line.to_string()));
    }
    if self.blocks.is_empty() {
      let id = self.mint();
      self.blocks.push(Block::new(id, String::new()));
    }
  }

  fn mint(&mut self) -> BlockId {
    let id = BlockId(self.next_id);
    self.next_id += 1;
    id
  }

  /// Join the block texts with single newlines.
  pub fn serialize(&self) -> String {
    let mut out = String::new();
    for (idx, block) in self.blocks.iter().enumerate() {
      if idx > 0 {
        out.push('\n');
      }
      out.push_str(&block.text);
    }
    out
  }

  pub fn len(&self) -> usize {
    self.blocks.len()
  }

  /// Always false; kept for clippy's `len_without_is_empty`.
  pub fn is_empty(&self) -> bool {
    self.blocks.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Block<S>> {
    self.blocks.iter()
  }

  pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Block<S>> {
    self.blocks.iter_mut()
  }

  pub fn ids(&self) -> impl Iterator<Item = BlockId> + '_ {
    self.blocks.iter().map(|block| block.id)
  }

  pub fn texts(&self) -> Vec<&str> {
    self.blocks.iter().map(|block| block.text.as_str()).collect()
  }

  pub fn first(&self) -> &Block<S> {
    &self.blocks[0]
  }

  pub fn last(&self) -> &Block<S> {
    &self.blocks[self.blocks.len() - 1]
  }

  pub fn contains(&self, id: BlockId) -> bool {
    self.position(id).is_some()
  }

  pub fn position(&self, id: BlockId) -> Option<usize> {
    self.blocks.iter().position(|block| block.id == id)
  }

  pub fn get(&self, id: BlockId) -> Option<&Block<S>> {
    self.blocks.iter().find(|block| block.id == id)
  }

  pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block<S>> {
    self.blocks.iter_mut().find(|block| block.id == id)
  }

  pub fn previous(&self, id: BlockId) -> Option<&Block<S>> {
    let idx = self.position(id)?;
    idx.checked_sub(1).map(|idx| &self.blocks[idx])
  }

  pub fn next(&self, id: BlockId) -> Option<&Block<S>> {
    let idx = self.position(id)?;
    self.blocks.get(idx + 1)
  }

  /// Insert a new block holding `tail` right after `after` and return its id.
  pub fn split(&mut self, after: BlockId, tail: impl Into<String>) -> Result<BlockId> {
    let idx = self.position(after).ok_or(BlockError::UnknownBlock(after))?;
    let id = self.mint();
    self.blocks.insert(idx + 1, Block::new(id, tail.into()));
    Ok(id)
  }

  /// Join `id` with its neighbor in `direction`.
  ///
  /// Merging toward the previous block appends this block's text to the
  /// predecessor and removes this block; merging toward the next block
  /// appends the successor's text to this block and removes the successor.
  /// The seam is the survivor's original length.
  pub fn merge(&mut self, id: BlockId, direction: Direction) -> Result<Merge<S>> {
    let idx = self.position(id).ok_or(BlockError::UnknownBlock(id))?;
    let (keep, drop) = match direction {
      Direction::TowardPrevious if idx > 0 => (idx - 1, idx),
      Direction::TowardNext if idx + 1 < self.blocks.len() => (idx, idx + 1),
      _ => return Err(BlockError::NoNeighbor { id, direction }),
    };

    let mut removed = self.blocks.remove(drop);
    let survivor = &mut self.blocks[keep];
    let seam = survivor.len_chars();
    survivor.text.push_str(&removed.text);

    Ok(Merge {
      survivor: survivor.id,
      removed: removed.id,
      seam,
      released: removed.take_surface(),
    })
  }
}

/// Byte index of the character at `offset`, clamped to the end of `text`.
pub fn byte_index(text: &str, offset: usize) -> usize {
  text
    .char_indices()
    .nth(offset)
    .map_or(text.len(), |(idx, _)| idx)
}

/// Split `text` at a character offset.
pub fn split_at_char(text: &str, offset: usize) -> (&str, &str) {
  text.split_at(byte_index(text, offset))
}
