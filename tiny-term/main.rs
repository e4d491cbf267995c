//! Terminal client for the tiny block editor.
//!
//! Each paragraph of the document is a block. Typing pauses trigger a save
//! and, through the configured suggestion command, an inline continuation
//! that can be typed through or accepted with Tab.

mod cli;
mod config;
mod ctx;
mod input;
mod provider;
mod render;
mod store;
mod terminal;

use std::{
  sync::Arc,
  time::Instant,
};

use anyhow::{
  Context,
  Result,
};
use crossterm::event::{
  self,
  Event,
};
use tiny_lib::{
  caret::MemorySurfaces,
  shell::DocumentShell,
};

use crate::{
  cli::CliOptions,
  config::Config,
  ctx::Ctx,
  store::FileStore,
  terminal::Terminal,
};

fn setup_logging(verbosity: u8) -> Result<()> {
  let level = match verbosity {
    0 => log::LevelFilter::Warn,
    1 => log::LevelFilter::Info,
    2 => log::LevelFilter::Debug,
    _ => log::LevelFilter::Trace,
  };

  fern::Dispatch::new()
    .level(level)
    .format(|out, message, record| {
      out.finish(format_args!(
        "{} {} [{}] {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
        record.target(),
        record.level(),
        message
      ))
    })
    .chain(fern::log_file(tiny_loader::log_file())?)
    .apply()?;
  Ok(())
}

fn main() -> Result<()> {
  let args = CliOptions::parse()?;

  tiny_loader::initialize_config_file(args.config_file.clone());
  tiny_loader::initialize_log_file(args.log_file.clone());
  setup_logging(args.verbosity).context("failed to initialize logging")?;

  let config = Config::load_default().context("failed to load config")?;
  let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;

  let store = Arc::new(FileStore::new(config.store.documents_dir()));
  log::info!("documents in {}", store.dir().display());
  let shell = DocumentShell::new(store, config.suggest.provider(), config.editor.clone());

  if args.list {
    for summary in runtime.block_on(shell.list())? {
      println!("{}\t{}", summary.id, summary.meta.title);
    }
    return Ok(());
  }

  let session = runtime.block_on(async {
    if args.new {
      shell.create(MemorySurfaces::new()).await
    } else {
      shell
        .open_or_create(args.document.as_ref(), MemorySurfaces::new())
        .await
    }
  })?;

  let mut ctx = Ctx::new(shell, session, runtime.handle().clone());
  let mut terminal = Terminal::new();
  terminal.enter_raw_mode()?;
  let result = run(&mut ctx, &mut terminal);
  terminal.leave_raw_mode()?;

  for failure in ctx.shutdown(&runtime) {
    eprintln!("tiny: {failure}");
  }
  result
}

fn run(ctx: &mut Ctx, terminal: &mut Terminal) -> Result<()> {
  render::render(ctx, terminal)?;

  loop {
    if ctx.should_quit {
      break;
    }

    if event::poll(ctx.poll_timeout(Instant::now()))? {
      match event::read()? {
        Event::Key(key) => input::handle_key(ctx, key),
        Event::Paste(text) => ctx.paste(Some(text)),
        Event::Resize(..) => ctx.needs_render = true,
        _ => {},
      }
    }

    ctx.tick(Instant::now());
    ctx.drain_completions();

    if ctx.needs_render {
      render::render(ctx, terminal)?;
      ctx.needs_render = false;
    }
  }

  Ok(())
}
