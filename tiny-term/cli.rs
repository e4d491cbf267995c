use std::path::{
  Path,
  PathBuf,
};

use anyhow::{
  Result,
  bail,
};
use clap::{
  ArgAction,
  Parser,
};
use tiny_lib::shell::DocumentId;

#[derive(Clone, Debug)]
pub struct CliOptions {
  pub verbosity:   u8,
  pub log_file:    Option<PathBuf>,
  pub config_file: Option<PathBuf>,
  pub list:        bool,
  pub new:         bool,
  pub document:    Option<DocumentId>,
}

impl CliOptions {
  pub fn parse() -> Result<Self> {
    let raw = RawCli::parse();
    raw.try_into()
  }
}

#[derive(Parser, Debug)]
#[command(name = "tiny", about = "Block editor with inline suggestions", long_about = None)]
struct RawCli {
  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count)]
  verbosity: u8,

  /// Save logs to a specific file
  #[arg(long = "log", value_name = "FILE", value_parser = parse_pathbuf)]
  log_file: Option<PathBuf>,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE", value_parser = parse_pathbuf)]
  config_file: Option<PathBuf>,

  /// List documents and exit
  #[arg(long = "list", conflicts_with_all = ["new", "document"])]
  list: bool,

  /// Create a blank document and open it
  #[arg(long = "new", conflicts_with = "document")]
  new: bool,

  /// Document to open (defaults to the most recent one)
  #[arg(value_name = "ID")]
  document: Option<String>,
}

impl TryFrom<RawCli> for CliOptions {
  type Error = anyhow::Error;

  fn try_from(raw: RawCli) -> Result<Self> {
    let document = match raw.document {
      Some(id) if id.trim().is_empty() => bail!("document id must not be empty"),
      Some(id) => Some(DocumentId::new(id.trim())),
      None => None,
    };

    Ok(Self {
      verbosity: raw.verbosity,
      log_file: raw.log_file,
      config_file: raw.config_file,
      list: raw.list,
      new: raw.new,
      document,
    })
  }
}

fn parse_pathbuf(value: &str) -> std::result::Result<PathBuf, String> {
  Ok(tiny_loader::expand_tilde(Path::new(value)))
}
