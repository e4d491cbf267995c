//! Application context (state).

use std::time::{
  Duration,
  Instant,
};

use tiny_lib::{
  caret::MemorySurfaces,
  editor::{
    BlockEditor,
    CaretTarget,
    Effect,
  },
  input::Key,
  shell::{
    Completion,
    DocumentId,
    DocumentShell,
    Session,
  },
};
use tokio::{
  runtime::{
    Handle,
    Runtime,
  },
  sync::mpsc::{
    UnboundedReceiver,
    UnboundedSender,
    unbounded_channel,
  },
  task::JoinHandle,
};

/// Upper bound on how long the event loop sleeps, so completions arriving
/// from the runtime are picked up promptly.
const MAX_POLL: Duration = Duration::from_millis(50);

pub struct Ctx {
  pub session:      Session<MemorySurfaces>,
  pub should_quit:  bool,
  pub needs_render: bool,
  pub clipboard:    Option<String>,
  pub scroll:       usize,
  shell:            DocumentShell,
  runtime:          Handle,
  saves_tx:         Option<UnboundedSender<Effect>>,
  saver:            Option<JoinHandle<()>>,
  completions_tx:   UnboundedSender<Completion>,
  completions_rx:   UnboundedReceiver<Completion>,
}

impl Ctx {
  pub fn new(shell: DocumentShell, mut session: Session<MemorySurfaces>, runtime: Handle) -> Self {
    let (completions_tx, completions_rx) = unbounded_channel();
    let (saves_tx, saves_rx) = unbounded_channel();
    let saver = runtime.spawn(persist(
      shell.clone(),
      session.id.clone(),
      saves_rx,
      completions_tx.clone(),
    ));
    session.editor.mount_pending();

    Self {
      session,
      should_quit: false,
      needs_render: true,
      clipboard: None,
      scroll: 0,
      shell,
      runtime,
      saves_tx: Some(saves_tx),
      saver: Some(saver),
      completions_tx,
      completions_rx,
    }
  }

  pub fn editor(&self) -> &BlockEditor<MemorySurfaces> {
    &self.session.editor
  }

  pub fn editor_mut(&mut self) -> &mut BlockEditor<MemorySurfaces> {
    &mut self.session.editor
  }

  pub fn press(&mut self, key: &Key) {
    self.session.editor.press(key, Instant::now());
    self.dispatch_effects();
    self.needs_render = true;
  }

  pub fn copy(&mut self) {
    self.clipboard = Some(self.session.editor.copy());
    self.needs_render = true;
  }

  pub fn paste(&mut self, text: Option<String>) {
    let Some(text) = text.or_else(|| self.clipboard.clone()) else {
      return;
    };
    self.session.editor.paste(&text, Instant::now());
    self.session.editor.mount_pending();
    self.dispatch_effects();
    self.needs_render = true;
  }

  pub fn title_key(&mut self, key: &Key) {
    let editor = &mut self.session.editor;
    match key {
      Key::Enter | Key::Escape => {
        editor.title_blur();
        let active = editor.active();
        if let Some(id) = active {
          editor.focus_block(id, CaretTarget::End);
        }
        self.dispatch_effects();
      },
      key => editor.title_key(key),
    }
    self.needs_render = true;
  }

  pub fn focus_title(&mut self) {
    self.session.editor.title_focus();
    self.session.editor.surfaces_mut().blur();
    self.needs_render = true;
  }

  pub fn quit(&mut self) {
    self.should_quit = true;
  }

  /// How long the event loop may block waiting for input.
  pub fn poll_timeout(&self, now: Instant) -> Duration {
    self
      .session
      .editor
      .next_deadline()
      .map_or(MAX_POLL, |deadline| {
        deadline.saturating_duration_since(now).min(MAX_POLL)
      })
  }

  pub fn tick(&mut self, now: Instant) {
    if self.session.editor.tick(now) {
      self.dispatch_effects();
      self.needs_render = true;
    }
  }

  pub fn drain_completions(&mut self) {
    while let Ok(completion) = self.completions_rx.try_recv() {
      completion.apply(&mut self.session.editor);
      self.needs_render = true;
    }
  }

  /// Saves go through one ordered queue so an older text never lands after a
  /// newer one. Suggestion requests run concurrently; staleness is sorted out
  /// by their tokens.
  fn dispatch_effects(&mut self) {
    for effect in self.session.editor.drain_effects() {
      match effect {
        Effect::RequestSuggestion { .. } => {
          let shell = self.shell.clone();
          let id = self.session.id.clone();
          let tx = self.completions_tx.clone();
          self.runtime.spawn(async move {
            let completion = shell.perform(&id, effect).await;
            tx.send(completion).ok();
          });
        },
        effect => {
          let sent = self
            .saves_tx
            .as_ref()
            .is_some_and(|tx| tx.send(effect).is_ok());
          if !sent {
            log::error!("save queue closed, dropping save for {}", self.session.id);
          }
        },
      }
    }
  }

  /// Flush pending edits and wait for every queued save to finish. Returns
  /// the failures, for reporting once the terminal is restored.
  pub fn shutdown(mut self, runtime: &Runtime) -> Vec<String> {
    let editor = &mut self.session.editor;
    if editor.title().is_focused() {
      editor.title_blur();
    }
    editor.flush();
    self.dispatch_effects();

    self.saves_tx = None;
    if let Some(saver) = self.saver.take()
      && let Err(err) = runtime.block_on(saver)
    {
      log::error!("save task failed: {err}");
    }

    let mut failures = Vec::new();
    while let Ok(completion) = self.completions_rx.try_recv() {
      if let Completion::Failed { error, .. } = completion {
        log::warn!("{error}");
        failures.push(error.to_string());
      }
    }
    failures
  }
}

async fn persist(
  shell: DocumentShell,
  id: DocumentId,
  mut saves: UnboundedReceiver<Effect>,
  completions: UnboundedSender<Completion>,
) {
  while let Some(effect) = saves.recv().await {
    let completion = shell.perform(&id, effect).await;
    if completions.send(completion).is_err() {
      break;
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use tiny_lib::{
    config::EditorConfig,
    shell::MemoryStore,
  };

  use super::*;

  fn setup() -> (Runtime, Arc<MemoryStore>, Ctx) {
    let runtime = Runtime::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let shell = DocumentShell::new(store.clone(), None, EditorConfig::default());
    let session = runtime
      .block_on(shell.create(MemorySurfaces::new()))
      .unwrap();
    let ctx = Ctx::new(shell, session, runtime.handle().clone());
    (runtime, store, ctx)
  }

  #[test]
  fn shutdown_flushes_pending_edits() {
    let (runtime, store, mut ctx) = setup();
    let id = ctx.session.id.clone();
    ctx.press(&Key::Char('!'));

    let failures = ctx.shutdown(&runtime);
    assert!(failures.is_empty());
    assert_eq!(
      store.content(&id).as_deref(),
      Some("Start writing anything...!")
    );
  }

  #[test]
  fn title_commits_on_escape() {
    let (runtime, store, mut ctx) = setup();
    let id = ctx.session.id.clone();
    ctx.focus_title();
    ctx.title_key(&Key::Backspace);
    ctx.title_key(&Key::Escape);
    assert!(!ctx.editor().title().is_focused());

    ctx.shutdown(&runtime);
    assert_eq!(store.title(&id).as_deref(), Some("Blank Pag"));
  }

  #[test]
  fn copy_then_paste_round_trips() {
    let (runtime, _store, mut ctx) = setup();
    ctx.copy();
    ctx.paste(Some("other".into()));
    assert_eq!(ctx.editor_mut().document_text(), "other");
    ctx.paste(None);
    assert_eq!(
      ctx.editor_mut().document_text(),
      "Start writing anything..."
    );
    drop(runtime);
  }

  #[test]
  fn poll_timeout_is_bounded_by_debounce() {
    let (_runtime, _store, mut ctx) = setup();
    let now = Instant::now();
    assert_eq!(ctx.poll_timeout(now), MAX_POLL);
    ctx.press(&Key::Char('x'));
    let later = now + Duration::from_secs(5);
    assert_eq!(ctx.poll_timeout(later), Duration::ZERO);
  }
}
