//! Rendering - lays blocks out as wrapped paragraphs and draws them.

use anyhow::Result;
use crossterm::style::{
  Attribute,
  Color,
};
use tiny_lib::{
  caret::{
    CaretAdapter,
    MemorySurfaces,
  },
  editor::BlockEditor,
  messages::MessageLevel,
};
use unicode_width::UnicodeWidthChar;

use crate::{
  Ctx,
  terminal::Terminal,
};

pub const ACCEPT_HINT: &str = "› Tab to accept";

const HELP: &str = "Ctrl-T title  Ctrl-C copy  Ctrl-V paste  Ctrl-Q quit";

/// Rows used by the title, the separator and the status line.
const CHROME_ROWS: u16 = 3;

/// One wrapped row of a block: the char offset it starts at, and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
  pub start: usize,
  pub text:  String,
}

fn char_width(c: char) -> usize {
  c.width().unwrap_or(0)
}

/// Wrap `text` into rows at most `width` columns wide. Always yields at least
/// one row.
pub fn wrap(text: &str, width: usize) -> Vec<Segment> {
  let width = width.max(1);
  let mut segments = Vec::new();
  let mut current = Segment {
    start: 0,
    text:  String::new(),
  };
  let mut used = 0;

  for (offset, c) in text.chars().enumerate() {
    let w = char_width(c);
    if used + w > width && !current.text.is_empty() {
      segments.push(std::mem::replace(&mut current, Segment {
        start: offset,
        text:  String::new(),
      }));
      used = 0;
    }
    current.text.push(c);
    used += w;
  }
  segments.push(current);
  segments
}

/// Row and column of the char `offset` within wrapped `segments`.
pub fn locate(segments: &[Segment], offset: usize) -> (usize, usize) {
  let row = segments
    .iter()
    .rposition(|segment| segment.start <= offset)
    .unwrap_or(0);
  let Some(segment) = segments.get(row) else {
    return (0, 0);
  };
  let col = segment
    .text
    .chars()
    .take(offset - segment.start)
    .map(char_width)
    .sum();
  (row, col)
}

fn display_width(text: &str) -> usize {
  text.chars().map(char_width).sum()
}

/// Longest prefix of `text` fitting in `width` columns.
pub fn truncate(text: &str, width: usize) -> &str {
  let mut used = 0;
  for (idx, c) in text.char_indices() {
    used += char_width(c);
    if used > width {
      return &text[..idx];
    }
  }
  text
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Layout {
  pub rows:    Vec<String>,
  /// (row, col) of the caret in the active block.
  pub cursor:  Option<(usize, usize)>,
  /// (row, col) right after the active block's text, where the suggestion
  /// overlay goes.
  pub overlay: Option<(usize, usize)>,
}

/// Blocks become paragraphs separated by one blank row.
pub fn layout(editor: &BlockEditor<MemorySurfaces>, width: usize) -> Layout {
  let mut out = Layout::default();
  let surfaces = editor.surfaces();

  for (idx, block) in editor.blocks().iter().enumerate() {
    if idx > 0 {
      out.rows.push(String::new());
    }
    let text = editor.live_text(block.id()).unwrap_or_default();
    let segments = wrap(&text, width);
    let first_row = out.rows.len();

    if editor.active() == Some(block.id()) {
      let caret = block
        .surface()
        .and_then(|surface| surfaces.caret_offset(*surface));
      if let Some(offset) = caret {
        let (row, col) = locate(&segments, offset);
        out.cursor = Some((first_row + row, col));
      }
      let last = segments.len() - 1;
      out.overlay = Some((first_row + last, display_width(&segments[last].text)));
    }

    out.rows.extend(segments.into_iter().map(|segment| segment.text));
  }
  out
}

/// Adjust `scroll` so `row` is within a viewport of `height` rows.
pub fn scroll_to(scroll: usize, row: usize, height: usize) -> usize {
  let height = height.max(1);
  if row < scroll {
    row
  } else if row >= scroll + height {
    row + 1 - height
  } else {
    scroll
  }
}

/// Render the current document state to the terminal.
pub fn render(ctx: &mut Ctx, terminal: &mut Terminal) -> Result<()> {
  let (cols, rows) = terminal.size()?;
  let width = usize::from(cols.max(1));
  let body_height = usize::from(rows.saturating_sub(CHROME_ROWS).max(1));

  let editor = ctx.editor();
  let title_focused = editor.title().is_focused();
  let layout = layout(editor, width);
  if let Some((row, _)) = layout.cursor {
    ctx.scroll = scroll_to(ctx.scroll, row, body_height);
  }
  let scroll = ctx.scroll;
  let editor = ctx.editor();

  terminal.clear()?;

  // Title
  let title = editor.title().text();
  terminal.draw_str(0, 0, truncate(title, width), None, Some(Attribute::Bold))?;
  terminal.draw_str(1, 0, &"─".repeat(width), Some(Color::DarkGrey), None)?;

  // Blocks
  for (screen_row, text) in layout.rows.iter().skip(scroll).take(body_height).enumerate() {
    terminal.draw_str(screen_row as u16 + 2, 0, text, None, None)?;
  }

  // Suggestion overlay
  if let Some(suggestion) = editor.overlay()
    && let Some((row, col)) = layout.overlay
    && row >= scroll
    && row < scroll + body_height
    && col < width
  {
    let mut overlay = suggestion.to_string();
    if editor.config().accept_hint {
      overlay.push(' ');
      overlay.push_str(ACCEPT_HINT);
    }
    let visible = truncate(&overlay, width - col);
    let screen_row = (row - scroll) as u16 + 2;
    terminal.draw_str(
      screen_row,
      col as u16,
      visible,
      Some(Color::DarkGrey),
      Some(Attribute::Dim),
    )?;
  }

  // Status line
  let status_row = rows.saturating_sub(1);
  match editor.messages().active() {
    Some(message) => {
      let color = match message.level {
        MessageLevel::Error => Color::Red,
        MessageLevel::Warning => Color::Yellow,
        MessageLevel::Info => Color::Reset,
      };
      terminal.draw_str(status_row, 0, truncate(&message.text, width), Some(color), None)?;
    },
    None => {
      let id = ctx.session.id.as_str();
      let help = format!("{HELP}  [{id}]");
      terminal.draw_str(
        status_row,
        0,
        truncate(&help, width),
        Some(Color::DarkGrey),
        None,
      )?;
    },
  }

  // Cursor
  if title_focused {
    let col = display_width(title).min(width.saturating_sub(1));
    terminal.set_cursor(0, col as u16)?;
  } else if let Some((row, col)) = layout.cursor
    && row >= scroll
  {
    let col = col.min(width.saturating_sub(1));
    terminal.set_cursor((row - scroll) as u16 + 2, col as u16)?;
  } else {
    terminal.hide_cursor()?;
  }

  terminal.flush()?;
  Ok(())
}
