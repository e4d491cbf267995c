//! Suggestion state machine.
//!
//! A suggestion is a candidate continuation for one block. It moves through
//! three live states:
//!
//! ```text
//!            offer               matching key              last char typed
//!   Idle ───────────▶ Pending ───────────────▶ Consuming ──────────────────▶ Idle
//!     ▲                  │                        │
//!     └──────────────────┴── divergent key ───────┘
//! ```
//!
//! Acceptance (Tab) inserts the next clause, see [`trim_suggestion`], and
//! keeps whatever is left of the suggestion around until the user diverges.
//!
//! Responses are matched to requests with [`RequestToken`]s. Only a response
//! carrying the most recently issued token is ever applied; everything else
//! is dropped without comment.

use std::mem;

use crate::{
  block::BlockId,
  input::Key,
};

/// Marks that end an acceptable insertion unit.
pub const TERMINAL_PUNCTUATION: [char; 7] = ['.', '?', '!', ',', ':', ';', '…'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
  pub const fn new(value: u64) -> Self {
    Self(value)
  }

  pub const fn get(self) -> u64 {
    self.0
  }
}

/// Issues request tokens and remembers which one is current.
#[derive(Debug, Clone, Default)]
pub struct TokenMint {
  next:   u64,
  latest: Option<RequestToken>,
}

impl TokenMint {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn issue(&mut self) -> RequestToken {
    self.next += 1;
    let token = RequestToken(self.next);
    self.latest = Some(token);
    token
  }

  pub fn latest(&self) -> Option<RequestToken> {
    self.latest
  }

  /// Forget the current token without issuing a new one, so that the
  /// response to the request in flight is treated as stale.
  pub fn retire(&mut self) -> Option<RequestToken> {
    self.latest.take()
  }

  pub fn is_current(&self, token: RequestToken) -> bool {
    self.latest.is_some_and(|latest| !is_stale(token, latest))
  }
}

/// A response is stale unless it answers the latest issued request.
pub fn is_stale(response: RequestToken, latest: RequestToken) -> bool {
  response != latest
}

/// The part of `suggestion` a single acceptance inserts: everything up to and
/// including the first terminal punctuation mark, or the whole suggestion
/// when there is none.
pub fn trim_suggestion(suggestion: &str) -> &str {
  match suggestion.find(TERMINAL_PUNCTUATION) {
    Some(idx) => {
      let end = idx
        + suggestion[idx..]
          .chars()
          .next()
          .map_or(0, char::len_utf8);
      &suggestion[..end]
    },
    None => suggestion,
  }
}

fn same_letter(typed: char, expected: char) -> bool {
  typed == expected || typed.to_lowercase().eq(expected.to_lowercase())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldSuggestion {
  text:  String,
  token: RequestToken,
  block: BlockId,
}

impl HeldSuggestion {
  pub fn remaining(&self) -> &str {
    &self.text
  }

  pub fn token(&self) -> RequestToken {
    self.token
  }

  pub fn block(&self) -> BlockId {
    self.block
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SuggestionState {
  #[default]
  Idle,
  /// Held, nothing typed through it yet.
  Pending(HeldSuggestion),
  /// Held, the user has typed or accepted part of it.
  Consuming(HeldSuggestion),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
  Applied,
  /// Not the latest request, or not fresher than what is already held.
  Stale,
  /// The response was current but carried no text; nothing is held now.
  Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumed {
  /// No suggestion held, or the key neither matched nor diverged.
  Ignored,
  /// The key matched the next character, which was stripped.
  Advanced,
  /// The key matched the last character; the suggestion is used up.
  Exhausted,
  /// The key diverged from the suggestion, which was dropped.
  Discarded,
}

#[derive(Debug, Clone, Default)]
pub struct Suggestion {
  state: SuggestionState,
}

impl Suggestion {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> &SuggestionState {
    &self.state
  }

  pub fn held(&self) -> Option<&HeldSuggestion> {
    match &self.state {
      SuggestionState::Idle => None,
      SuggestionState::Pending(held) | SuggestionState::Consuming(held) => Some(held),
    }
  }

  pub fn is_held(&self) -> bool {
    self.held().is_some()
  }

  pub fn remaining(&self) -> Option<&str> {
    self.held().map(HeldSuggestion::remaining)
  }

  /// What to render after the caret of `block`: the next acceptable unit.
  pub fn overlay(&self, block: BlockId) -> Option<&str> {
    self
      .held()
      .filter(|held| held.block == block)
      .map(|held| trim_suggestion(&held.text))
  }

  /// Offer a response for `block`. Applied only when `token` is the latest
  /// issued token and fresher than the held suggestion's.
  pub fn offer(
    &mut self,
    token: RequestToken,
    latest: Option<RequestToken>,
    block: BlockId,
    text: impl Into<String>,
  ) -> Offer {
    let current = latest.is_some_and(|latest| !is_stale(token, latest));
    let fresher = self.held().is_none_or(|held| token > held.token);
    if !current || !fresher {
      log::debug!("dropping stale suggestion response {token:?} (latest {latest:?})");
      return Offer::Stale;
    }

    let text = text.into();
    if text.is_empty() {
      self.state = SuggestionState::Idle;
      return Offer::Empty;
    }
    self.state = SuggestionState::Pending(HeldSuggestion { text, token, block });
    Offer::Applied
  }

  /// Feed a keystroke typed into `block`.
  ///
  /// Matching is case-insensitive. Keys that do not match but carry no
  /// content (navigation, Enter, modifiers, Tab, Space) leave the suggestion
  /// alone; anything else discards it.
  pub fn consume(&mut self, block: BlockId, key: &Key) -> Consumed {
    let Some(held) = self.held() else {
      return Consumed::Ignored;
    };

    let matches = held.block == block
      && key
        .as_char()
        .zip(held.text.chars().next())
        .is_some_and(|(typed, expected)| same_letter(typed, expected));

    if matches && let Some(mut held) = self.take_held() {
      let first = held.text.chars().next().map_or(0, char::len_utf8);
      held.text.replace_range(..first, "");
      if held.text.is_empty() {
        return Consumed::Exhausted;
      }
      self.state = SuggestionState::Consuming(held);
      return Consumed::Advanced;
    }

    if key.is_non_content() {
      return Consumed::Ignored;
    }
    self.discard();
    Consumed::Discarded
  }

  /// Take the next acceptable unit for insertion into `block` and strip it
  /// from the front of the suggestion.
  pub fn accept(&mut self, block: BlockId) -> Option<String> {
    if self.held()?.block != block {
      return None;
    }
    let mut held = self.take_held()?;
    let unit = trim_suggestion(&held.text).to_string();
    held.text.replace_range(..unit.len(), "");
    if !held.text.is_empty() {
      self.state = SuggestionState::Consuming(held);
    }
    Some(unit)
  }

  /// Drop whatever is held. Returns true if something was dropped.
  pub fn discard(&mut self) -> bool {
    !matches!(
      mem::take(&mut self.state),
      SuggestionState::Idle
    )
  }

  fn take_held(&mut self) -> Option<HeldSuggestion> {
    match mem::take(&mut self.state) {
      SuggestionState::Pending(held) | SuggestionState::Consuming(held) => Some(held),
      SuggestionState::Idle => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const BLOCK: BlockId = BlockId::new(0);

  fn held(text: &str) -> (Suggestion, TokenMint) {
    let mut mint = TokenMint::new();
    let token = mint.issue();
    let mut suggestion = Suggestion::new();
    assert_eq!(
      suggestion.offer(token, mint.latest(), BLOCK, text),
      Offer::Applied
    );
    (suggestion, mint)
  }

  #[test]
  fn trims_to_first_clause() {
    assert_eq!(trim_suggestion("lo, world. Next"), "lo,");
    assert_eq!(trim_suggestion(" world. Next"), " world.");
    assert_eq!(trim_suggestion("wait… what"), "wait…");
    assert_eq!(trim_suggestion("no marks here"), "no marks here");
    assert_eq!(trim_suggestion(""), "");
  }

  #[test]
  fn staleness_is_token_equality() {
    let mut mint = TokenMint::new();
    let first = mint.issue();
    let second = mint.issue();
    assert!(is_stale(first, second));
    assert!(!is_stale(second, second));
    assert!(mint.is_current(second));
    assert!(!mint.is_current(first));

    mint.retire();
    assert!(!mint.is_current(second));
  }

  #[test]
  fn out_of_order_responses_keep_the_latest() {
    let mut mint = TokenMint::new();
    let old = mint.issue();
    let new = mint.issue();
    let mut suggestion = Suggestion::new();

    assert_eq!(
      suggestion.offer(new, mint.latest(), BLOCK, "newer"),
      Offer::Applied
    );
    assert_eq!(
      suggestion.offer(old, mint.latest(), BLOCK, "older"),
      Offer::Stale
    );
    assert_eq!(suggestion.remaining(), Some("newer"));
  }

  #[test]
  fn duplicate_delivery_is_not_fresher() {
    let (mut suggestion, mint) = held("abc");
    let token = mint.latest().unwrap();
    suggestion.consume(BLOCK, &Key::Char('a'));
    assert_eq!(
      suggestion.offer(token, mint.latest(), BLOCK, "abc"),
      Offer::Stale
    );
    assert_eq!(suggestion.remaining(), Some("bc"));
  }

  #[test]
  fn empty_prediction_is_not_held() {
    let mut mint = TokenMint::new();
    let token = mint.issue();
    let mut suggestion = Suggestion::new();
    assert_eq!(
      suggestion.offer(token, mint.latest(), BLOCK, ""),
      Offer::Empty
    );
    assert_eq!(suggestion.state(), &SuggestionState::Idle);
  }

  #[test]
  fn typing_through_consumes_without_discarding() {
    let (mut suggestion, _) = held("Lo, w");
    assert!(matches!(suggestion.state(), SuggestionState::Pending(_)));

    let steps: Vec<_> = "lo, w"
      .chars()
      .map(|c| suggestion.consume(BLOCK, &Key::Char(c)))
      .collect();
    assert_eq!(
      steps,
      [
        Consumed::Advanced,
        Consumed::Advanced,
        Consumed::Advanced,
        Consumed::Advanced,
        Consumed::Exhausted,
      ]
    );
    assert_eq!(suggestion.state(), &SuggestionState::Idle);
  }

  #[test]
  fn divergent_key_discards() {
    let (mut suggestion, _) = held("hello");
    assert_eq!(
      suggestion.consume(BLOCK, &Key::Char('h')),
      Consumed::Advanced
    );
    assert!(matches!(suggestion.state(), SuggestionState::Consuming(_)));
    assert_eq!(
      suggestion.consume(BLOCK, &Key::Char('x')),
      Consumed::Discarded
    );
    assert!(!suggestion.is_held());
  }

  #[test]
  fn non_content_keys_never_discard() {
    let (mut suggestion, _) = held("hello");
    for key in [Key::Left, Key::Enter, Key::Tab, Key::SPACE, Key::Down] {
      assert_eq!(suggestion.consume(BLOCK, &key), Consumed::Ignored);
    }
    assert_eq!(suggestion.remaining(), Some("hello"));

    assert_eq!(suggestion.consume(BLOCK, &Key::Backspace), Consumed::Discarded);
  }

  #[test]
  fn space_consumes_when_it_matches() {
    let (mut suggestion, _) = held(" there");
    assert_eq!(suggestion.consume(BLOCK, &Key::SPACE), Consumed::Advanced);
    assert_eq!(suggestion.remaining(), Some("there"));
  }

  #[test]
  fn typing_in_another_block_diverges() {
    let (mut suggestion, _) = held("hello");
    let other = BlockId::new(1);
    assert_eq!(suggestion.consume(other, &Key::Up), Consumed::Ignored);
    assert_eq!(suggestion.consume(other, &Key::Char('h')), Consumed::Discarded);
  }

  #[test]
  fn accept_takes_one_clause_at_a_time() {
    let (mut suggestion, _) = held("lo, world. Next");
    assert_eq!(suggestion.overlay(BLOCK), Some("lo,"));

    assert_eq!(suggestion.accept(BLOCK).as_deref(), Some("lo,"));
    assert_eq!(suggestion.remaining(), Some(" world. Next"));
    assert_eq!(suggestion.accept(BLOCK).as_deref(), Some(" world."));
    assert_eq!(suggestion.accept(BLOCK).as_deref(), Some(" Next"));
    assert_eq!(suggestion.accept(BLOCK), None);
  }

  #[test]
  fn accept_and_overlay_are_scoped_to_the_block() {
    let (mut suggestion, _) = held("abc");
    let other = BlockId::new(3);
    assert_eq!(suggestion.overlay(other), None);
    assert_eq!(suggestion.accept(other), None);
    assert_eq!(suggestion.remaining(), Some("abc"));
  }
}
