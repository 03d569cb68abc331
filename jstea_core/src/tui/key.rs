//! Canonical key names.

use crate::msg::KeyMsg;
use compact_str::CompactString;
use compact_str::ToCompactString;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;

/// Key names whose canonical type is a control type. Membership here is what
/// makes the codec report `ctrl: true` for a key object.
pub const CONTROL_KEY_NAMES: [&str; 32] = [
  "ctrl+@", "ctrl+a", "ctrl+b", "ctrl+c", "ctrl+d", "ctrl+e", "ctrl+f",
  "ctrl+g", "ctrl+h", "ctrl+i", "ctrl+j", "ctrl+k", "ctrl+l", "ctrl+m",
  "ctrl+n", "ctrl+o", "ctrl+p", "ctrl+q", "ctrl+r", "ctrl+s", "ctrl+t",
  "ctrl+u", "ctrl+v", "ctrl+w", "ctrl+x", "ctrl+y", "ctrl+z", "ctrl+[",
  "ctrl+\\", "ctrl+]", "ctrl+^", "ctrl+_",
];

pub fn is_control_name(name: &str) -> bool {
  CONTROL_KEY_NAMES.contains(&name)
}

fn keycode_name(code: KeyCode) -> Option<CompactString> {
  let name = match code {
    KeyCode::Enter => "enter",
    KeyCode::Tab => "tab",
    KeyCode::BackTab => "shift+tab",
    KeyCode::Backspace => "backspace",
    KeyCode::Delete => "delete",
    KeyCode::Insert => "insert",
    KeyCode::Esc => "esc",
    KeyCode::Up => "up",
    KeyCode::Down => "down",
    KeyCode::Left => "left",
    KeyCode::Right => "right",
    KeyCode::Home => "home",
    KeyCode::End => "end",
    KeyCode::PageUp => "pgup",
    KeyCode::PageDown => "pgdown",
    KeyCode::F(n) => return Some(format!("f{n}").to_compact_string()),
    KeyCode::Char(' ') => "space",
    KeyCode::Char(c) => return Some(c.to_compact_string()),
    _ => return None,
  };
  Some(name.to_compact_string())
}

/// Converts a crossterm key event into a [`KeyMsg`], or `None` for key codes
/// without a canonical name.
pub fn key_event_to_msg(event: KeyEvent) -> Option<KeyMsg> {
  let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
  let alt = event.modifiers.contains(KeyModifiers::ALT);

  let name = keycode_name(event.code)?;
  let name = if ctrl {
    format!("ctrl+{name}").to_compact_string()
  } else {
    name
  };

  let runes = match event.code {
    KeyCode::Char(c) if !ctrl => c.to_compact_string(),
    _ => CompactString::const_new(""),
  };

  Some(KeyMsg {
    runes,
    name,
    alt,
    ctrl,
    paste: false,
  })
}

/// Wraps pasted text as a key message carrying the whole paste as its rune
/// sequence.
pub fn paste_to_msg(text: String) -> KeyMsg {
  KeyMsg {
    runes: text.to_compact_string(),
    name: CompactString::const_new(""),
    alt: false,
    ctrl: false,
    paste: true,
  }
}
