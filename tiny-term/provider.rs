//! Suggestion provider backed by an external command.
//!
//! The full document text goes to the command's stdin. The command answers on
//! stdout with `{"prediction": "..."}`, or with the bare prediction text.

use std::{
  process::Stdio,
  time::Duration,
};

use anyhow::{
  Context,
  anyhow,
  bail,
};
use async_trait::async_trait;
use serde::Deserialize;
use tiny_lib::shell::{
  DocumentId,
  SuggestionProvider,
};
use tokio::{
  io::AsyncWriteExt,
  process::Command,
};

#[derive(Debug, Clone)]
pub struct CommandProvider {
  command: Vec<String>,
  timeout: Duration,
}

impl CommandProvider {
  pub fn new(command: Vec<String>, timeout: Duration) -> Self {
    Self { command, timeout }
  }
}

#[derive(Deserialize)]
struct PredictionResponse {
  prediction: String,
}

pub fn parse_prediction(stdout: &str) -> String {
  match serde_json::from_str::<PredictionResponse>(stdout.trim()) {
    Ok(response) => response.prediction,
    Err(_) => {
      stdout
        .strip_suffix('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .unwrap_or(stdout)
        .to_string()
    },
  }
}

#[async_trait]
impl SuggestionProvider for CommandProvider {
  async fn suggest(&self, id: &DocumentId, context: &str) -> anyhow::Result<String> {
    let (program, args) = self
      .command
      .split_first()
      .ok_or_else(|| anyhow!("no suggestion command configured"))?;

    let mut child = Command::new(program)
      .args(args)
      .env("TINY_DOCUMENT_ID", id.as_str())
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .with_context(|| format!("failed to start `{program}`"))?;

    let mut stdin = child.stdin.take().context("stdin of suggestion command")?;
    let context = context.to_string();
    let writer = tokio::spawn(async move {
      let result = stdin.write_all(context.as_bytes()).await;
      drop(stdin);
      result
    });

    let output = tokio::time::timeout(self.timeout, child.wait_with_output())
      .await
      .map_err(|_| anyhow!("`{program}` timed out after {:?}", self.timeout))?
      .with_context(|| format!("failed to wait for `{program}`"))?;

    if let Ok(Err(err)) = writer.await
      && err.kind() != std::io::ErrorKind::BrokenPipe
    {
      log::warn!("writing document to `{program}` failed: {err}");
    }

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      bail!("`{program}` exited with {}: {}", output.status, stderr.trim());
    }
    Ok(parse_prediction(&String::from_utf8_lossy(&output.stdout)))
  }
}
