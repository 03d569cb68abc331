//! Messages between the renderer loop and the bridge.

use compact_str::CompactString;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A key press, including pasted text delivered as key input.
pub struct KeyMsg {
  /// Printable rune sequence, empty for special keys.
  pub runes: CompactString,
  /// Canonical key name, e.g. `"a"`, `"enter"`, `"ctrl+c"`.
  pub name: CompactString,
  pub alt: bool,
  pub ctrl: bool,
  pub paste: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A mouse press/release/motion event.
pub struct MouseMsg {
  pub x: u16,
  pub y: u16,
  /// Named button, see [`crate::tui::mouse`].
  pub button: CompactString,
  /// Named action: `"press"`, `"release"` or `"motion"`.
  pub action: CompactString,
  pub alt: bool,
  pub ctrl: bool,
  pub shift: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// External event delivered to a program's `update`.
pub enum Msg {
  Key(KeyMsg),
  Mouse(MouseMsg),
  WindowSize { width: u16, height: u16 },
  Focus,
  Blur,
  Tick { id: CompactString, time_ms: u64 },
  Quit,
  ClearScreen,
  /// A shared-state value changed outside the renderer, `key` names it.
  StateRefresh { key: String },
  /// Produced only by the render throttle, never visible to script.
  RenderRefresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Discriminant-only mirror of [`Msg`].
pub enum MsgKind {
  Key,
  Mouse,
  WindowSize,
  Focus,
  Blur,
  Tick,
  Quit,
  ClearScreen,
  StateRefresh,
  RenderRefresh,
}

impl Msg {
  pub fn kind(&self) -> MsgKind {
    match self {
      Msg::Key(_) => MsgKind::Key,
      Msg::Mouse(_) => MsgKind::Mouse,
      Msg::WindowSize { .. } => MsgKind::WindowSize,
      Msg::Focus => MsgKind::Focus,
      Msg::Blur => MsgKind::Blur,
      Msg::Tick { .. } => MsgKind::Tick,
      Msg::Quit => MsgKind::Quit,
      Msg::ClearScreen => MsgKind::ClearScreen,
      Msg::StateRefresh { .. } => MsgKind::StateRefresh,
      Msg::RenderRefresh => MsgKind::RenderRefresh,
    }
  }
}

impl MsgKind {
  /// The script-visible `type` discriminant.
  pub fn name(&self) -> &'static str {
    match self {
      MsgKind::Key => "Key",
      MsgKind::Mouse => "Mouse",
      MsgKind::WindowSize => "WindowSize",
      MsgKind::Focus => "Focus",
      MsgKind::Blur => "Blur",
      MsgKind::Tick => "Tick",
      MsgKind::Quit => "Quit",
      MsgKind::ClearScreen => "ClearScreen",
      MsgKind::StateRefresh => "StateRefresh",
      MsgKind::RenderRefresh => "RenderRefresh",
    }
  }

  pub fn from_name(name: &str) -> Option<MsgKind> {
    let kind = match name {
      "Key" => MsgKind::Key,
      "Mouse" => MsgKind::Mouse,
      "WindowSize" => MsgKind::WindowSize,
      "Focus" => MsgKind::Focus,
      "Blur" => MsgKind::Blur,
      "Tick" => MsgKind::Tick,
      "Quit" => MsgKind::Quit,
      "ClearScreen" => MsgKind::ClearScreen,
      "StateRefresh" => MsgKind::StateRefresh,
      "RenderRefresh" => MsgKind::RenderRefresh,
      _ => return None,
    };
    Some(kind)
  }
}
