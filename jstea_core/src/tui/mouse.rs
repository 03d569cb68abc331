//! Mouse button/action names.

use crate::msg::MouseMsg;
use compact_str::ToCompactString;
use crossterm::event::KeyModifiers;
use crossterm::event::MouseButton;
use crossterm::event::MouseEvent;
use crossterm::event::MouseEventKind;

pub const BUTTON_LEFT: &str = "left";
pub const BUTTON_MIDDLE: &str = "middle";
pub const BUTTON_RIGHT: &str = "right";
pub const BUTTON_WHEEL_UP: &str = "wheel-up";
pub const BUTTON_WHEEL_DOWN: &str = "wheel-down";
pub const BUTTON_WHEEL_LEFT: &str = "wheel-left";
pub const BUTTON_WHEEL_RIGHT: &str = "wheel-right";
pub const BUTTON_NONE: &str = "none";

pub const ACTION_PRESS: &str = "press";
pub const ACTION_RELEASE: &str = "release";
pub const ACTION_MOTION: &str = "motion";

fn button_name(button: MouseButton) -> &'static str {
  match button {
    MouseButton::Left => BUTTON_LEFT,
    MouseButton::Middle => BUTTON_MIDDLE,
    MouseButton::Right => BUTTON_RIGHT,
  }
}

/// Converts a crossterm mouse event into a [`MouseMsg`].
pub fn mouse_event_to_msg(event: MouseEvent) -> MouseMsg {
  let (button, action): (&str, &str) = match event.kind {
    MouseEventKind::Down(b) => (button_name(b), ACTION_PRESS),
    MouseEventKind::Up(b) => (button_name(b), ACTION_RELEASE),
    MouseEventKind::Drag(b) => (button_name(b), ACTION_MOTION),
    MouseEventKind::Moved => (BUTTON_NONE, ACTION_MOTION),
    MouseEventKind::ScrollUp => (BUTTON_WHEEL_UP, ACTION_PRESS),
    MouseEventKind::ScrollDown => (BUTTON_WHEEL_DOWN, ACTION_PRESS),
    MouseEventKind::ScrollLeft => (BUTTON_WHEEL_LEFT, ACTION_PRESS),
    MouseEventKind::ScrollRight => (BUTTON_WHEEL_RIGHT, ACTION_PRESS),
  };

  MouseMsg {
    x: event.column,
    y: event.row,
    button: button.to_compact_string(),
    action: action.to_compact_string(),
    alt: event.modifiers.contains(KeyModifiers::ALT),
    ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
    shift: event.modifiers.contains(KeyModifiers::SHIFT),
  }
}
