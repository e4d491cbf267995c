//! Document shell.
//!
//! Owns document identity, title and persistence around a [`BlockEditor`].
//! The editor only ever sees the flat document text; the shell turns its
//! [`Effect`]s into calls on a [`DocumentStore`] and a [`SuggestionProvider`]
//! and hands the results back as [`Completion`]s.

use std::{
  collections::BTreeMap,
  fmt,
  sync::{
    Arc,
    atomic::{
      AtomicU64,
      Ordering,
    },
  },
};

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

use crate::{
  caret::{
    SurfaceLifecycle,
    SurfaceText,
  },
  config::EditorConfig,
  editor::{
    BlockEditor,
    Effect,
  },
  suggestion::{
    Offer,
    RequestToken,
  },
};

pub const DOCUMENT_KIND: &str = "document";
pub const BLANK_TITLE: &str = "Blank Page";
pub const BLANK_CONTENT: &str = "Start writing anything...";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for DocumentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for DocumentId {
  fn from(id: &str) -> Self {
    Self::new(id)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
  pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
  pub id:   DocumentId,
  pub meta: DocumentMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedDocument {
  pub id:      DocumentId,
  pub meta:    DocumentMeta,
  pub content: String,
}

/// Persistence backend.
#[async_trait]
pub trait DocumentStore: Send + Sync {
  /// Documents of `kind`, most recently modified first.
  async fn list(&self, kind: &str) -> anyhow::Result<Vec<DocumentSummary>>;

  async fn load(&self, id: &DocumentId) -> anyhow::Result<LoadedDocument>;

  async fn create(
    &self,
    kind: &str,
    meta: DocumentMeta,
    content: &str,
  ) -> anyhow::Result<DocumentId>;

  async fn save_title(&self, id: &DocumentId, title: &str) -> anyhow::Result<()>;

  async fn save_content(&self, id: &DocumentId, text: &str) -> anyhow::Result<()>;
}

/// Predicts a continuation of the full document text.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
  async fn suggest(&self, id: &DocumentId, context: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Error)]
pub enum ShellError {
  #[error("failed to load document: {0:#}")]
  Load(anyhow::Error),
  #[error("failed to save document: {0:#}")]
  Save(anyhow::Error),
  #[error("failed to get a suggestion: {0:#}")]
  Suggest(anyhow::Error),
  #[error("failed to list documents: {0:#}")]
  List(anyhow::Error),
  #[error("failed to create document: {0:#}")]
  Create(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ShellError>;

/// The outcome of one [`Effect`], to be applied back on the editor.
#[derive(Debug)]
pub enum Completion {
  Saved,
  TitleSaved,
  Suggested {
    token:      RequestToken,
    prediction: String,
  },
  Failed {
    effect: EffectKind,
    error:  ShellError,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
  SaveContent,
  SaveTitle,
  RequestSuggestion(RequestToken),
}

impl Completion {
  /// Feed the outcome back into the editor. Returns the suggestion offer
  /// result for suggestion completions.
  pub fn apply<A>(self, editor: &mut BlockEditor<A>) -> Option<Offer>
  where
    A: SurfaceText + SurfaceLifecycle,
  {
    match self {
      Completion::Saved => {
        editor.save_succeeded();
        None
      },
      Completion::TitleSaved => {
        editor.title_save_succeeded();
        None
      },
      Completion::Suggested { token, prediction } => {
        Some(editor.apply_suggestion(token, prediction))
      },
      Completion::Failed { effect, error } => {
        match effect {
          EffectKind::SaveContent => editor.save_failed(error),
          EffectKind::SaveTitle => editor.title_save_failed(error),
          EffectKind::RequestSuggestion(token) => editor.suggestion_failed(token, error),
        }
        None
      },
    }
  }
}

/// An opened document and the editor bound to it.
#[derive(Debug)]
pub struct Session<A: SurfaceText> {
  pub id:     DocumentId,
  pub editor: BlockEditor<A>,
}

#[derive(Clone)]
pub struct DocumentShell {
  store:    Arc<dyn DocumentStore>,
  provider: Option<Arc<dyn SuggestionProvider>>,
  config:   EditorConfig,
}

impl fmt::Debug for DocumentShell {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DocumentShell")
      .field("suggestions", &self.provider.is_some())
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

impl DocumentShell {
  pub fn new(
    store: Arc<dyn DocumentStore>,
    provider: Option<Arc<dyn SuggestionProvider>>,
    config: EditorConfig,
  ) -> Self {
    Self {
      store,
      provider,
      config,
    }
  }

  pub fn config(&self) -> &EditorConfig {
    &self.config
  }

  pub async fn list(&self) -> Result<Vec<DocumentSummary>> {
    self
      .store
      .list(DOCUMENT_KIND)
      .await
      .map_err(ShellError::List)
  }

  pub async fn open<A>(&self, id: &DocumentId, surfaces: A) -> Result<Session<A>>
  where
    A: SurfaceText + SurfaceLifecycle,
  {
    let document = self.store.load(id).await.map_err(ShellError::Load)?;
    log::info!("opened document {} ({:?})", document.id, document.meta.title);
    let editor = BlockEditor::new(
      surfaces,
      &document.content,
      document.meta.title,
      self.config.clone(),
    );
    Ok(Session {
      id: document.id,
      editor,
    })
  }

  /// Create a blank document and open it.
  pub async fn create<A>(&self, surfaces: A) -> Result<Session<A>>
  where
    A: SurfaceText + SurfaceLifecycle,
  {
    let meta = DocumentMeta {
      title: BLANK_TITLE.to_string(),
    };
    let id = self
      .store
      .create(DOCUMENT_KIND, meta, BLANK_CONTENT)
      .await
      .map_err(ShellError::Create)?;
    log::info!("created document {id}");
    self.open(&id, surfaces).await
  }

  /// Open `id`, or else the most recent document, or else a new one.
  pub async fn open_or_create<A>(&self, id: Option<&DocumentId>, surfaces: A) -> Result<Session<A>>
  where
    A: SurfaceText + SurfaceLifecycle,
  {
    if let Some(id) = id {
      return self.open(id, surfaces).await;
    }
    match self.list().await?.into_iter().next() {
      Some(summary) => self.open(&summary.id, surfaces).await,
      None => self.create(surfaces).await,
    }
  }

  /// Carry out one editor effect against the collaborators.
  pub async fn perform(&self, id: &DocumentId, effect: Effect) -> Completion {
    match effect {
      Effect::SaveContent { text } => {
        match self.store.save_content(id, &text).await {
          Ok(()) => Completion::Saved,
          Err(err) => Completion::Failed {
            effect: EffectKind::SaveContent,
            error:  ShellError::Save(err),
          },
        }
      },
      Effect::SaveTitle { title } => {
        match self.store.save_title(id, &title).await {
          Ok(()) => Completion::TitleSaved,
          Err(err) => Completion::Failed {
            effect: EffectKind::SaveTitle,
            error:  ShellError::Save(err),
          },
        }
      },
      Effect::RequestSuggestion { token, text, .. } => {
        let Some(provider) = &self.provider else {
          return Completion::Suggested {
            token,
            prediction: String::new(),
          };
        };
        match provider.suggest(id, &text).await {
          Ok(prediction) => Completion::Suggested { token, prediction },
          Err(err) => Completion::Failed {
            effect: EffectKind::RequestSuggestion(token),
            error:  ShellError::Suggest(err),
          },
        }
      },
    }
  }
}

#[derive(Debug, Clone)]
struct StoredDocument {
  kind:     String,
  meta:     DocumentMeta,
  content:  String,
  modified: u64,
}

/// A [`DocumentStore`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
  documents: Mutex<BTreeMap<DocumentId, StoredDocument>>,
  clock:     AtomicU64,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn tick(&self) -> u64 {
    self.clock.fetch_add(1, Ordering::Relaxed)
  }

  pub fn content(&self, id: &DocumentId) -> Option<String> {
    self
      .documents
      .lock()
      .get(id)
      .map(|document| document.content.clone())
  }

  pub fn title(&self, id: &DocumentId) -> Option<String> {
    self
      .documents
      .lock()
      .get(id)
      .map(|document| document.meta.title.clone())
  }

  fn update(&self, id: &DocumentId, f: impl FnOnce(&mut StoredDocument)) -> anyhow::Result<()> {
    let modified = self.tick();
    let mut documents = self.documents.lock();
    let document = documents
      .get_mut(id)
      .ok_or_else(|| anyhow!("unknown document {id}"))?;
    f(document);
    document.modified = modified;
    Ok(())
  }
}

#[async_trait]
impl DocumentStore for MemoryStore {
  async fn list(&self, kind: &str) -> anyhow::Result<Vec<DocumentSummary>> {
    let documents = self.documents.lock();
    let mut matching: Vec<_> = documents
      .iter()
      .filter(|(_, document)| document.kind == kind)
      .collect();
    matching.sort_by(|(_, a), (_, b)| b.modified.cmp(&a.modified));
    Ok(
      matching
        .into_iter()
        .map(|(id, document)| DocumentSummary {
          id:   id.clone(),
          meta: document.meta.clone(),
        })
        .collect(),
    )
  }

  async fn load(&self, id: &DocumentId) -> anyhow::Result<LoadedDocument> {
    let documents = self.documents.lock();
    let document = documents
      .get(id)
      .ok_or_else(|| anyhow!("unknown document {id}"))?;
    Ok(LoadedDocument {
      id:      id.clone(),
      meta:    document.meta.clone(),
      content: document.content.clone(),
    })
  }

  async fn create(
    &self,
    kind: &str,
    meta: DocumentMeta,
    content: &str,
  ) -> anyhow::Result<DocumentId> {
    let modified = self.tick();
    let id = DocumentId::new(format!("doc-{modified}"));
    self.documents.lock().insert(id.clone(), StoredDocument {
      kind: kind.to_string(),
      meta,
      content: content.to_string(),
      modified,
    });
    Ok(id)
  }

  async fn save_title(&self, id: &DocumentId, title: &str) -> anyhow::Result<()> {
    self.update(id, |document| document.meta.title = title.to_string())
  }

  async fn save_content(&self, id: &DocumentId, text: &str) -> anyhow::Result<()> {
    self.update(id, |document| document.content = text.to_string())
  }
}
