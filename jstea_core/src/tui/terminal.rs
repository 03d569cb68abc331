//! Terminal mode save/restore.

use crossterm::cursor;
use crossterm::event::DisableBracketedPaste;
use crossterm::event::DisableFocusChange;
use crossterm::event::DisableMouseCapture;
use crossterm::terminal;
use crossterm::terminal::LeaveAlternateScreen;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The terminal mode cookie saved before a program takes over, compared and
/// restored on every exit path.
pub struct TerminalState {
  raw_mode: bool,
}

impl TerminalState {
  pub fn raw_mode(&self) -> bool {
    self.raw_mode
  }
}

/// Snapshots the current terminal mode.
pub fn snapshot() -> TerminalState {
  TerminalState {
    raw_mode: terminal::is_raw_mode_enabled().unwrap_or(false),
  }
}

/// Best-effort restore to `state`. Runs on normal exit, on signal shutdown
/// and on the panic path, so every step tolerates failure.
pub fn restore(mut out: &mut dyn Write, state: TerminalState) {
  let _ = crossterm::execute!(
    &mut out,
    DisableBracketedPaste,
    DisableFocusChange,
    DisableMouseCapture,
    LeaveAlternateScreen,
    cursor::Show,
  );
  if !state.raw_mode() {
    let _ = terminal::disable_raw_mode();
  }
}
