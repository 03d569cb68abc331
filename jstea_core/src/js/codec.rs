//! Message and command translation between renderer and script values.
//!
//! External events become plain script objects with a `type` discriminant;
//! script-returned command descriptors (`_cmdType`/`_cmdID` objects minted by
//! the facade) decode back into renderer [`Cmd`]s.

use crate::is_v8_nil;
use crate::js::JsRuntime;
use crate::js::binding::set_property_to;
use crate::js::converter::*;
use crate::js::next_cmd_id;
use crate::msg::KeyMsg;
use crate::msg::MouseMsg;
use crate::msg::Msg;
use crate::msg::MsgKind;
use crate::prelude::*;
use crate::tui::Cmd;
use crate::tui::key::is_control_name;
use compact_str::ToCompactString;
use std::time::Duration;

pub const CMD_TYPE_KEY: &str = "_cmdType";
pub const CMD_ID_KEY: &str = "_cmdID";
pub const NATIVE_CMD_ID_KEY: &str = "_nativeCmdID";

fn get_prop<'s>(
  scope: &mut v8::HandleScope<'s>,
  obj: v8::Local<v8::Object>,
  name: &str,
) -> Option<v8::Local<'s, v8::Value>> {
  let key = v8::String::new(scope, name).unwrap();
  obj.get(scope, key.into())
}

fn get_bool(
  scope: &mut v8::HandleScope,
  obj: v8::Local<v8::Object>,
  name: &str,
) -> bool {
  get_prop(scope, obj, name)
    .map(|v| v.boolean_value(scope))
    .unwrap_or(false)
}

fn get_string(
  scope: &mut v8::HandleScope,
  obj: v8::Local<v8::Object>,
  name: &str,
) -> Option<String> {
  let value = get_prop(scope, obj, name)?;
  if value.is_string() {
    Some(value.to_rust_string_lossy(scope))
  } else {
    None
  }
}

fn get_number(
  scope: &mut v8::HandleScope,
  obj: v8::Local<v8::Object>,
  name: &str,
) -> Option<f64> {
  let value = get_prop(scope, obj, name)?;
  if value.is_number() {
    value.number_value(scope)
  } else {
    None
  }
}

/// Converts a renderer message into a plain script object.
///
/// `RenderRefresh` yields `None`: it is handled before the codec and never
/// visible to script.
pub fn msg_to_v8<'s>(
  scope: &mut v8::HandleScope<'s>,
  msg: &Msg,
) -> Option<v8::Local<'s, v8::Value>> {
  if matches!(msg, Msg::RenderRefresh) {
    return None;
  }

  let obj = v8::Object::new(scope);
  let type_name = msg.kind().name().to_v8(scope);
  set_property_to(scope, obj, "type", type_name.into());

  match msg {
    Msg::Key(key) => {
      let name = key.name.to_v8(scope);
      set_property_to(scope, obj, "key", name.into());

      let mut runes: Vec<v8::Local<v8::Value>> = vec![];
      for c in key.runes.chars() {
        let rune = v8::String::new(scope, &c.to_string()).unwrap();
        runes.push(rune.into());
      }
      let runes = v8::Array::new_with_elements(scope, &runes);
      set_property_to(scope, obj, "runes", runes.into());

      let ctrl = key.ctrl || is_control_name(&key.name);
      let alt = key.alt.to_v8(scope);
      set_property_to(scope, obj, "alt", alt.into());
      let ctrl = ctrl.to_v8(scope);
      set_property_to(scope, obj, "ctrl", ctrl.into());
      let paste = key.paste.to_v8(scope);
      set_property_to(scope, obj, "paste", paste.into());
    }
    Msg::Mouse(mouse) => {
      let x = (mouse.x as u32).to_v8(scope);
      set_property_to(scope, obj, "x", x.into());
      let y = (mouse.y as u32).to_v8(scope);
      set_property_to(scope, obj, "y", y.into());
      let button = mouse.button.to_v8(scope);
      set_property_to(scope, obj, "button", button.into());
      let action = mouse.action.to_v8(scope);
      set_property_to(scope, obj, "action", action.into());
      let alt = mouse.alt.to_v8(scope);
      set_property_to(scope, obj, "alt", alt.into());
      let ctrl = mouse.ctrl.to_v8(scope);
      set_property_to(scope, obj, "ctrl", ctrl.into());
      let shift = mouse.shift.to_v8(scope);
      set_property_to(scope, obj, "shift", shift.into());
    }
    Msg::WindowSize { width, height } => {
      let width = (*width as u32).to_v8(scope);
      set_property_to(scope, obj, "width", width.into());
      let height = (*height as u32).to_v8(scope);
      set_property_to(scope, obj, "height", height.into());
    }
    Msg::Tick { id, time_ms } => {
      let id = id.to_v8(scope);
      set_property_to(scope, obj, "id", id.into());
      let time = (*time_ms as f64).to_v8(scope);
      set_property_to(scope, obj, "time", time.into());
    }
    Msg::StateRefresh { key } => {
      let key = key.to_v8(scope);
      set_property_to(scope, obj, "key", key.into());
    }
    Msg::Focus | Msg::Blur | Msg::Quit | Msg::ClearScreen => {}
    Msg::RenderRefresh => unreachable!(),
  }

  Some(obj.into())
}

/// Converts a script-built message object back into a renderer message.
/// `RenderRefresh` cannot be built from script.
pub fn value_to_msg(
  scope: &mut v8::HandleScope,
  value: v8::Local<v8::Value>,
) -> Option<Msg> {
  if is_v8_nil!(value) {
    return None;
  }
  let obj = value.to_object(scope)?;
  let kind = get_string(scope, obj, "type")?;
  let kind = MsgKind::from_name(&kind)?;

  let msg = match kind {
    MsgKind::Key => {
      let name = get_string(scope, obj, "key").unwrap_or_default();
      let runes = match get_prop(scope, obj, "runes")
        .and_then(|v| v8::Local::<v8::Array>::try_from(v).ok())
      {
        Some(arr) => {
          let mut runes = String::new();
          for i in 0..arr.length() {
            if let Some(el) = arr.get_index(scope, i) {
              runes.push_str(&el.to_rust_string_lossy(scope));
            }
          }
          runes
        }
        // A bare printable key carries itself as its rune sequence.
        None if name.chars().count() == 1 => name.clone(),
        None => String::new(),
      };
      let ctrl = get_bool(scope, obj, "ctrl") || is_control_name(&name);
      Msg::Key(KeyMsg {
        runes: runes.to_compact_string(),
        name: name.to_compact_string(),
        alt: get_bool(scope, obj, "alt"),
        ctrl,
        paste: get_bool(scope, obj, "paste"),
      })
    }
    MsgKind::Mouse => Msg::Mouse(MouseMsg {
      x: get_number(scope, obj, "x").unwrap_or(0.0) as u16,
      y: get_number(scope, obj, "y").unwrap_or(0.0) as u16,
      button: get_string(scope, obj, "button")
        .unwrap_or_default()
        .to_compact_string(),
      action: get_string(scope, obj, "action")
        .unwrap_or_default()
        .to_compact_string(),
      alt: get_bool(scope, obj, "alt"),
      ctrl: get_bool(scope, obj, "ctrl"),
      shift: get_bool(scope, obj, "shift"),
    }),
    MsgKind::WindowSize => Msg::WindowSize {
      width: get_number(scope, obj, "width").unwrap_or(0.0) as u16,
      height: get_number(scope, obj, "height").unwrap_or(0.0) as u16,
    },
    MsgKind::Focus => Msg::Focus,
    MsgKind::Blur => Msg::Blur,
    MsgKind::Tick => Msg::Tick {
      id: get_string(scope, obj, "id")
        .unwrap_or_default()
        .to_compact_string(),
      time_ms: get_number(scope, obj, "time").unwrap_or(0.0) as u64,
    },
    MsgKind::Quit => Msg::Quit,
    MsgKind::ClearScreen => Msg::ClearScreen,
    MsgKind::StateRefresh => Msg::StateRefresh {
      key: get_string(scope, obj, "key").unwrap_or_default(),
    },
    MsgKind::RenderRefresh => return None,
  };
  Some(msg)
}

/// Decodes a script value into a renderer command, per the descriptor
/// protocol. Unknown or malformed values decode to no command.
pub fn value_to_cmd(
  scope: &mut v8::HandleScope,
  value: v8::Local<v8::Value>,
) -> Option<Cmd> {
  if is_v8_nil!(value) {
    return None;
  }
  let Some(obj) = value.to_object(scope) else {
    warn!("Command value is not an object, ignoring");
    return None;
  };

  // A held native renderer command passes through as-is.
  if let Some(id) = get_number(scope, obj, NATIVE_CMD_ID_KEY) {
    let id = id as u64;
    let state_rc = JsRuntime::state(scope);
    let cmd = state_rc.borrow_mut().held_cmds.remove(&id);
    if cmd.is_none() {
      warn!("Unknown held native command id: {id}");
    }
    return cmd;
  }

  let Some(cmd_type) = get_string(scope, obj, CMD_TYPE_KEY) else {
    // Most likely a foreign value wandered into a command position.
    warn!("Command descriptor without {CMD_TYPE_KEY}, ignoring");
    return None;
  };

  match cmd_type.as_str() {
    "quit" => Some(Cmd::Quit),
    "clearScreen" => Some(Cmd::ClearScreen),
    "hideCursor" => Some(Cmd::HideCursor),
    "showCursor" => Some(Cmd::ShowCursor),
    "enterAltScreen" => Some(Cmd::EnterAltScreen),
    "exitAltScreen" => Some(Cmd::ExitAltScreen),
    "enableBracketedPaste" => Some(Cmd::EnableBracketedPaste),
    "disableBracketedPaste" => Some(Cmd::DisableBracketedPaste),
    "enableReportFocus" => Some(Cmd::EnableReportFocus),
    "disableReportFocus" => Some(Cmd::DisableReportFocus),
    "windowSize" => Some(Cmd::WindowSize),
    "setWindowTitle" => {
      let title = get_string(scope, obj, "title")?;
      Some(Cmd::SetWindowTitle(title))
    }
    "tick" => {
      let duration = get_number(scope, obj, "duration")?;
      // NaN is not a usable duration either.
      if !(duration > 0.0) {
        return None;
      }
      let id = get_string(scope, obj, "id").unwrap_or_default();
      Some(Cmd::Tick {
        duration: Duration::from_millis(duration as u64),
        id: id.to_compact_string(),
      })
    }
    "batch" => Some(Cmd::Batch(decode_cmd_list(scope, obj))),
    "sequence" => Some(Cmd::Sequence(decode_cmd_list(scope, obj))),
    other => {
      warn!("Unknown command type: {other:?}");
      None
    }
  }
}

fn decode_cmd_list(
  scope: &mut v8::HandleScope,
  obj: v8::Local<v8::Object>,
) -> Vec<Cmd> {
  let mut cmds = vec![];
  let Some(list) = get_prop(scope, obj, "cmds") else {
    return cmds;
  };
  let Ok(list) = v8::Local::<v8::Array>::try_from(list) else {
    return cmds;
  };
  for i in 0..list.length() {
    if let Some(el) = list.get_index(scope, i) {
      if let Some(cmd) = value_to_cmd(scope, el) {
        cmds.push(cmd);
      }
    }
  }
  cmds
}

/// Unpacks an `init` return: either the initial state directly, or a
/// two-element sequence `[state, command]`.
pub fn decode_init_return(
  scope: &mut v8::HandleScope,
  value: v8::Local<v8::Value>,
) -> (v8::Global<v8::Value>, Option<Cmd>) {
  if let Ok(arr) = v8::Local::<v8::Array>::try_from(value) {
    if arr.length() >= 1 {
      let state = arr
        .get_index(scope, 0)
        .unwrap_or_else(|| v8::Object::new(scope).into());
      let cmd = if arr.length() >= 2 {
        arr
          .get_index(scope, 1)
          .and_then(|v| value_to_cmd(scope, v))
      } else {
        None
      };
      return (v8::Global::new(scope, state), cmd);
    }
  }
  (v8::Global::new(scope, value), None)
}

/// Unpacks an `update` return. Anything but a two-element sequence keeps the
/// previous state and produces no command.
pub fn decode_update_return(
  scope: &mut v8::HandleScope,
  value: v8::Local<v8::Value>,
  prev_state: v8::Global<v8::Value>,
) -> (v8::Global<v8::Value>, Option<Cmd>) {
  match v8::Local::<v8::Array>::try_from(value) {
    Ok(arr) if arr.length() == 2 => {
      let state = match arr.get_index(scope, 0) {
        Some(state) => v8::Global::new(scope, state),
        None => prev_state,
      };
      let cmd = arr
        .get_index(scope, 1)
        .and_then(|v| value_to_cmd(scope, v));
      (state, cmd)
    }
    _ => {
      warn!("update must return [newState, command], keeping previous state");
      (prev_state, None)
    }
  }
}

/// Parks a native renderer command for a script round trip and returns the
/// opaque wrapper object referring to it.
pub fn hold_cmd<'s>(
  scope: &mut v8::HandleScope<'s>,
  cmd: Cmd,
) -> v8::Local<'s, v8::Object> {
  let id = next_cmd_id();
  let state_rc = JsRuntime::state(scope);
  state_rc.borrow_mut().held_cmds.insert(id, cmd);

  let obj = v8::Object::new(scope);
  let id_value = (id as f64).to_v8(scope);
  set_property_to(scope, obj, NATIVE_CMD_ID_KEY, id_value.into());
  obj
}
