//! Native renderer commands.

use compact_str::CompactString;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A side effect a program's `update`/`init` hands back to the renderer.
pub enum Cmd {
  Quit,
  ClearScreen,
  HideCursor,
  ShowCursor,
  EnterAltScreen,
  ExitAltScreen,
  EnableBracketedPaste,
  DisableBracketedPaste,
  EnableReportFocus,
  DisableReportFocus,
  /// Query the terminal size, answered with a `WindowSize` message.
  WindowSize,
  SetWindowTitle(String),
  /// Sleep `duration`, then deliver a `Tick` message carrying `id`.
  Tick {
    duration: Duration,
    id: CompactString,
  },
  /// Run all contained commands concurrently.
  Batch(Vec<Cmd>),
  /// Run contained commands one at a time, preserving nesting.
  Sequence(Vec<Cmd>),
}
