//! Terminal abstraction over crossterm.

use std::io::{
  self,
  Stdout,
  Write,
};

use anyhow::Result;
use crossterm::{
  cursor::{
    Hide,
    MoveTo,
    Show,
  },
  event::{
    DisableBracketedPaste,
    EnableBracketedPaste,
  },
  execute,
  queue,
  style::{
    Attribute,
    Color,
    Print,
    ResetColor,
    SetAttribute,
    SetForegroundColor,
  },
  terminal::{
    self,
    Clear,
    ClearType,
    EnterAlternateScreen,
    LeaveAlternateScreen,
    disable_raw_mode,
    enable_raw_mode,
  },
};

pub struct Terminal {
  stdout: Stdout,
  raw:    bool,
}

impl Terminal {
  pub fn new() -> Self {
    Self {
      stdout: io::stdout(),
      raw:    false,
    }
  }

  pub fn enter_raw_mode(&mut self) -> Result<()> {
    enable_raw_mode()?;
    self.raw = true;
    execute!(self.stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    Ok(())
  }

  pub fn leave_raw_mode(&mut self) -> Result<()> {
    if !self.raw {
      return Ok(());
    }
    execute!(
      self.stdout,
      DisableBracketedPaste,
      LeaveAlternateScreen,
      Show
    )?;
    disable_raw_mode()?;
    self.raw = false;
    Ok(())
  }

  /// (columns, rows)
  pub fn size(&self) -> Result<(u16, u16)> {
    Ok(terminal::size()?)
  }

  pub fn clear(&mut self) -> Result<()> {
    queue!(self.stdout, Hide, Clear(ClearType::All))?;
    Ok(())
  }

  pub fn draw_str(
    &mut self,
    row: u16,
    col: u16,
    text: &str,
    fg: Option<Color>,
    attr: Option<Attribute>,
  ) -> Result<()> {
    queue!(self.stdout, MoveTo(col, row))?;
    if let Some(fg) = fg {
      queue!(self.stdout, SetForegroundColor(fg))?;
    }
    if let Some(attr) = attr {
      queue!(self.stdout, SetAttribute(attr))?;
    }
    queue!(
      self.stdout,
      Print(text),
      SetAttribute(Attribute::Reset),
      ResetColor
    )?;
    Ok(())
  }

  pub fn set_cursor(&mut self, row: u16, col: u16) -> Result<()> {
    queue!(self.stdout, MoveTo(col, row), Show)?;
    Ok(())
  }

  pub fn hide_cursor(&mut self) -> Result<()> {
    queue!(self.stdout, Hide)?;
    Ok(())
  }

  pub fn flush(&mut self) -> Result<()> {
    self.stdout.flush()?;
    Ok(())
  }
}

impl Drop for Terminal {
  fn drop(&mut self) {
    if let Err(err) = self.leave_raw_mode() {
      log::error!("failed to restore terminal: {err}");
    }
  }
}
