//! Document store keeping one JSON file per document.

use std::{
  io::ErrorKind,
  path::{
    Path,
    PathBuf,
  },
  time::SystemTime,
};

use anyhow::{
  Context,
  Result,
  bail,
};
use async_trait::async_trait;
use serde::{
  Deserialize,
  Serialize,
};
use tiny_lib::shell::{
  DocumentId,
  DocumentMeta,
  DocumentStore,
  DocumentSummary,
  LoadedDocument,
};
use tokio::fs;

const EXTENSION: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct DocumentFile {
  kind:    String,
  meta:    DocumentMeta,
  content: String,
}

#[derive(Debug, Clone)]
pub struct FileStore {
  dir: PathBuf,
}

impl FileStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn path(&self, id: &DocumentId) -> Result<PathBuf> {
    let raw = id.as_str();
    if raw.is_empty()
      || raw.starts_with('.')
      || raw.contains(|c: char| c == '/' || c == '\\' || c.is_control())
    {
      bail!("invalid document id {raw:?}");
    }
    Ok(self.dir.join(format!("{raw}.{EXTENSION}")))
  }

  async fn read(&self, id: &DocumentId) -> Result<DocumentFile> {
    let path = self.path(id)?;
    let bytes = fs::read(&path)
      .await
      .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("malformed document {}", path.display()))
  }

  /// Write through a sibling temp file so a crash never leaves half a
  /// document behind.
  async fn write(&self, id: &DocumentId, document: &DocumentFile) -> Result<()> {
    let path = self.path(id)?;
    fs::create_dir_all(&self.dir)
      .await
      .with_context(|| format!("failed to create {}", self.dir.display()))?;
    let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
    let bytes = serde_json::to_vec_pretty(document)?;
    fs::write(&tmp, bytes)
      .await
      .with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, &path)
      .await
      .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
  }

  async fn update(&self, id: &DocumentId, f: impl FnOnce(&mut DocumentFile)) -> Result<()> {
    let mut document = self.read(id).await?;
    f(&mut document);
    self.write(id, &document).await
  }

  fn fresh_id(&self) -> DocumentId {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f").to_string();
    let stamp = stamp.replace('.', "-");
    let mut candidate = DocumentId::new(stamp.clone());
    let mut suffix = 1;
    while self
      .path(&candidate)
      .is_ok_and(|path| path.exists())
    {
      suffix += 1;
      candidate = DocumentId::new(format!("{stamp}-{suffix}"));
    }
    candidate
  }
}

#[async_trait]
impl DocumentStore for FileStore {
  async fn list(&self, kind: &str) -> Result<Vec<DocumentSummary>> {
    let mut entries = match fs::read_dir(&self.dir).await {
      Ok(entries) => entries,
      Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
      Err(err) => {
        return Err(err).with_context(|| format!("failed to list {}", self.dir.display()));
      },
    };

    let mut found: Vec<(SystemTime, DocumentSummary)> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().is_none_or(|ext| ext != EXTENSION) {
        continue;
      }
      let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
        continue;
      };
      let id = DocumentId::new(stem);
      let document = match self.read(&id).await {
        Ok(document) => document,
        Err(err) => {
          log::warn!("skipping {}: {err:#}", path.display());
          continue;
        },
      };
      if document.kind != kind {
        continue;
      }
      let modified = entry
        .metadata()
        .await
        .and_then(|meta| meta.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH);
      found.push((modified, DocumentSummary {
        id,
        meta: document.meta,
      }));
    }

    found.sort_by(|(a, a_summary), (b, b_summary)| {
      b.cmp(a).then_with(|| b_summary.id.cmp(&a_summary.id))
    });
    Ok(found.into_iter().map(|(_, summary)| summary).collect())
  }

  async fn load(&self, id: &DocumentId) -> Result<LoadedDocument> {
    let document = self.read(id).await?;
    Ok(LoadedDocument {
      id:      id.clone(),
      meta:    document.meta,
      content: document.content,
    })
  }

  async fn create(&self, kind: &str, meta: DocumentMeta, content: &str) -> Result<DocumentId> {
    let id = self.fresh_id();
    self
      .write(&id, &DocumentFile {
        kind: kind.to_string(),
        meta,
        content: content.to_string(),
      })
      .await?;
    Ok(id)
  }

  async fn save_title(&self, id: &DocumentId, title: &str) -> Result<()> {
    self
      .update(id, |document| document.meta.title = title.to_string())
      .await
  }

  async fn save_content(&self, id: &DocumentId, text: &str) -> Result<()> {
    self
      .update(id, |document| document.content = text.to_string())
      .await
  }
}

#[cfg(test)]
mod tests {
  use tiny_lib::shell::{
    BLANK_CONTENT,
    BLANK_TITLE,
    DOCUMENT_KIND,
  };

  use super::*;

  fn blank() -> DocumentMeta {
    DocumentMeta {
      title: BLANK_TITLE.to_string(),
    }
  }

  #[tokio::test]
  async fn create_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("docs"));

    let id = store
      .create(DOCUMENT_KIND, blank(), BLANK_CONTENT)
      .await
      .unwrap();
    let loaded = store.load(&id).await.unwrap();
    assert_eq!(loaded.meta.title, BLANK_TITLE);
    assert_eq!(loaded.content, BLANK_CONTENT);
  }

  #[tokio::test]
  async fn saves_update_title_and_content() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let id = store.create(DOCUMENT_KIND, blank(), "").await.unwrap();

    store.save_content(&id, "one\ntwo").await.unwrap();
    store.save_title(&id, "Numbers").await.unwrap();

    let loaded = store.load(&id).await.unwrap();
    assert_eq!(loaded.content, "one\ntwo");
    assert_eq!(loaded.meta.title, "Numbers");
    assert!(!dir.path().join(format!("{id}.json.tmp")).exists());
  }

  #[tokio::test]
  async fn list_filters_by_kind_and_skips_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let first = store.create(DOCUMENT_KIND, blank(), "a").await.unwrap();
    let second = store.create(DOCUMENT_KIND, blank(), "b").await.unwrap();
    store.create("folder", blank(), "").await.unwrap();
    std::fs::write(dir.path().join("broken.json"), "{").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let listed: Vec<_> = store
      .list(DOCUMENT_KIND)
      .await
      .unwrap()
      .into_iter()
      .map(|summary| summary.id)
      .collect();
    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&first));
    assert!(listed.contains(&second));
    assert_ne!(first, second);
  }

  #[tokio::test]
  async fn list_of_missing_dir_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("nothing-here"));
    assert!(store.list(DOCUMENT_KIND).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn path_like_ids_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    for id in ["../escape", ".hidden", "a/b", ""] {
      assert!(store.load(&DocumentId::from(id)).await.is_err(), "{id}");
    }
  }

  #[tokio::test]
  async fn saving_missing_document_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    assert!(store.save_content(&DocumentId::from("nope"), "x").await.is_err());
  }
}
