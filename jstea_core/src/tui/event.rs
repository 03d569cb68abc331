//! Terminal event to message conversion.

use crate::msg::Msg;
use crate::tui::key;
use crate::tui::mouse;
use crossterm::event::Event;
use crossterm::event::KeyEventKind;

/// Converts a polled terminal event into a renderer message. Key release
/// events and unnameable keys are dropped.
pub fn event_to_msg(event: Event) -> Option<Msg> {
  match event {
    Event::Key(key_event) => match key_event.kind {
      KeyEventKind::Press | KeyEventKind::Repeat => {
        key::key_event_to_msg(key_event).map(Msg::Key)
      }
      KeyEventKind::Release => None,
    },
    Event::Mouse(mouse_event) => {
      Some(Msg::Mouse(mouse::mouse_event_to_msg(mouse_event)))
    }
    Event::Resize(width, height) => Some(Msg::WindowSize { width, height }),
    Event::FocusGained => Some(Msg::Focus),
    Event::FocusLost => Some(Msg::Blur),
    Event::Paste(text) => Some(Msg::Key(key::paste_to_msg(text))),
  }
}
