//! APIs for the `Tea` namespace.
//!
//! These natives are the only place command descriptors are minted, which is
//! what makes script-fabricated descriptors detectable downstream.

use crate::bridge::model::BridgeModel;
use crate::bridge::throttle::ThrottleConfig;
use crate::bridge::throttle::ThrottleState;
use crate::is_v8_func;
use crate::is_v8_int;
use crate::is_v8_str;
use crate::js::JsRuntime;
use crate::js::ScriptModel;
use crate::js::binding::error_object;
use crate::js::binding::set_constant_to;
use crate::js::binding::set_property_to;
use crate::js::codec::CMD_ID_KEY;
use crate::js::codec::CMD_TYPE_KEY;
use crate::js::converter::*;
use crate::js::next_cmd_id;
use crate::msg::MsgKind;
use crate::prelude::*;
use crate::tui::ProgramOptions;
use std::time::Duration;

/// The `_type` tag stamped on model wrapper objects.
pub const MODEL_TYPE_TAG: &str = "bubbleteaModel";

/// Command types that take no arguments.
pub const SIMPLE_CMD_TYPES: [&str; 11] = [
  "quit",
  "clearScreen",
  "hideCursor",
  "showCursor",
  "enterAltScreen",
  "exitAltScreen",
  "enableBracketedPaste",
  "disableBracketedPaste",
  "enableReportFocus",
  "disableReportFocus",
  "windowSize",
];

fn get_prop<'s>(
  scope: &mut v8::HandleScope<'s>,
  obj: v8::Local<v8::Object>,
  name: &str,
) -> Option<v8::Local<'s, v8::Value>> {
  let key = v8::String::new(scope, name).unwrap();
  obj.get(scope, key.into())
}

fn get_function<'s>(
  scope: &mut v8::HandleScope<'s>,
  obj: v8::Local<v8::Object>,
  name: &str,
) -> Option<v8::Local<'s, v8::Function>> {
  let value = get_prop(scope, obj, name)?;
  if !is_v8_func!(value) {
    return None;
  }
  v8::Local::<v8::Function>::try_from(value).ok()
}

fn set_error(
  scope: &mut v8::HandleScope,
  rv: &mut v8::ReturnValue,
  error: TheErr,
) {
  let obj = error_object(scope, &error);
  rv.set(obj.into());
}

fn make_descriptor<'s>(
  scope: &mut v8::HandleScope<'s>,
  cmd_type: &str,
) -> v8::Local<'s, v8::Object> {
  let obj = v8::Object::new(scope);
  let cmd_type = cmd_type.to_v8(scope);
  set_constant_to(scope, obj, CMD_TYPE_KEY, cmd_type.into());
  let id = (next_cmd_id() as f64).to_v8(scope);
  set_constant_to(scope, obj, CMD_ID_KEY, id.into());
  obj
}

fn parse_throttle(
  scope: &mut v8::HandleScope,
  def: v8::Local<v8::Object>,
) -> TheResult<ThrottleConfig> {
  let mut config = ThrottleConfig::default();
  let Some(value) = get_prop(scope, def, "renderThrottle") else {
    return Ok(config);
  };
  if value.is_null_or_undefined() {
    return Ok(config);
  }
  let Some(obj) = value.to_object(scope) else {
    return Err(TheErr::InvalidArguments(
      "renderThrottle must be an object".to_string(),
    ));
  };

  if let Some(enabled) = get_prop(scope, obj, "enabled") {
    config.enabled = enabled.boolean_value(scope);
  }

  if let Some(interval) = get_prop(scope, obj, "minIntervalMs") {
    if !interval.is_undefined() {
      let millis = interval.number_value(scope).unwrap_or(0.0);
      if !interval.is_number() || millis < 1.0 {
        return Err(TheErr::InvalidArguments(
          "renderThrottle.minIntervalMs must be an integer >= 1".to_string(),
        ));
      }
      config.min_interval = Duration::from_millis(millis as u64);
    }
  }

  if let Some(kinds) = get_prop(scope, obj, "alwaysRenderTypes") {
    if !kinds.is_undefined() {
      let Ok(kinds) = v8::Local::<v8::Array>::try_from(kinds) else {
        return Err(TheErr::InvalidArguments(
          "renderThrottle.alwaysRenderTypes must be an array".to_string(),
        ));
      };
      let mut always_render = HashSet::new();
      for i in 0..kinds.length() {
        let Some(name) = kinds.get_index(scope, i) else {
          continue;
        };
        let name = name.to_rust_string_lossy(scope);
        match MsgKind::from_name(&name) {
          Some(kind) => {
            always_render.insert(kind);
          }
          None => {
            return Err(TheErr::InvalidArguments(format!(
              "unknown message type in alwaysRenderTypes: {name:?}"
            )));
          }
        }
      }
      config.always_render = always_render;
    }
  }

  Ok(config)
}

/// `Tea.newModel({init, update, view, renderThrottle?})`.
pub fn new_model(
  scope: &mut v8::HandleScope,
  args: v8::FunctionCallbackArguments,
  mut rv: v8::ReturnValue,
) {
  let def = args.get(0);
  let Some(def) = def.to_object(scope).filter(|_| def.is_object()) else {
    set_error(
      scope,
      &mut rv,
      TheErr::InvalidArguments(
        "newModel expects {init, update, view}".to_string(),
      ),
    );
    return;
  };

  let callables = (
    get_function(scope, def, "init"),
    get_function(scope, def, "update"),
    get_function(scope, def, "view"),
  );
  let (Some(init), Some(update), Some(view)) = callables else {
    set_error(
      scope,
      &mut rv,
      TheErr::InvalidArguments(
        "newModel requires init, update and view to be functions".to_string(),
      ),
    );
    return;
  };

  let throttle = match parse_throttle(scope, def) {
    Ok(config) => config,
    Err(e) => {
      set_error(scope, &mut rv, e);
      return;
    }
  };

  let state_rc = JsRuntime::state(scope);
  let registry = state_rc.borrow().registry.clone();
  let record = registry.insert(ThrottleState {
    config: throttle,
    ..Default::default()
  });
  let model_id = record.id();

  let script_model = ScriptModel {
    init: v8::Global::new(scope, init),
    update: v8::Global::new(scope, update),
    view: v8::Global::new(scope, view),
    state: {
      let undefined: v8::Local<v8::Value> = v8::undefined(scope).into();
      v8::Global::new(scope, undefined)
    },
  };
  state_rc.borrow_mut().models.insert(model_id, script_model);
  trace!("Registered model: {model_id:?}");

  let wrapper = v8::Object::new(scope);
  let id = v8::Integer::new(scope, model_id);
  set_constant_to(scope, wrapper, "_modelID", id.into());
  let tag = MODEL_TYPE_TAG.to_v8(scope);
  set_constant_to(scope, wrapper, "_type", tag.into());
  rv.set(wrapper.into());
}

fn parse_options(
  scope: &mut v8::HandleScope,
  value: v8::Local<v8::Value>,
) -> TheResult<ProgramOptions> {
  let mut options = ProgramOptions::default();
  if value.is_null_or_undefined() {
    return Ok(options);
  }
  let Some(obj) = value.to_object(scope).filter(|_| value.is_object()) else {
    return Err(TheErr::InvalidArguments(
      "run options must be an object".to_string(),
    ));
  };

  if let Some(v) = get_prop(scope, obj, "altScreen") {
    let b = v.to_boolean(scope);
    options.alt_screen = bool::from_v8(scope, b);
  }
  if let Some(v) = get_prop(scope, obj, "mouse") {
    let b = v.to_boolean(scope);
    options.mouse = bool::from_v8(scope, b);
  }
  if let Some(v) = get_prop(scope, obj, "mouseCellMotion") {
    let b = v.to_boolean(scope);
    options.mouse_cell_motion = bool::from_v8(scope, b);
  }
  if let Some(v) = get_prop(scope, obj, "reportFocus") {
    let b = v.to_boolean(scope);
    options.report_focus = bool::from_v8(scope, b);
  }
  // Bracketed paste stays on unless explicitly disabled.
  if let Some(v) = get_prop(scope, obj, "bracketedPaste") {
    if v.is_false() {
      options.bracketed_paste = false;
    }
  }

  Ok(options)
}

/// `Tea.run(model, options?)`. Blocks until the program exits; returns
/// undefined on success, an error object on failure.
pub fn run(
  scope: &mut v8::HandleScope,
  args: v8::FunctionCallbackArguments,
  mut rv: v8::ReturnValue,
) {
  let wrapper = args.get(0);
  let model_id = wrapper
    .to_object(scope)
    .filter(|_| wrapper.is_object())
    .and_then(|obj| {
      let tag = get_prop(scope, obj, "_type")?;
      if !is_v8_str!(tag)
        || tag.to_rust_string_lossy(scope) != MODEL_TYPE_TAG
      {
        return None;
      }
      let id = get_prop(scope, obj, "_modelID")?;
      if !is_v8_int!(id) {
        return None;
      }
      let id_int = id.to_integer(scope).unwrap();
      Some(i32::from_v8(scope, id_int))
    });
  let Some(model_id) = model_id else {
    set_error(
      scope,
      &mut rv,
      TheErr::InvalidModel("not a model wrapper".to_string()),
    );
    return;
  };

  let state_rc = JsRuntime::state(scope);
  let (js_loop, manager, registry) = {
    let state = state_rc.borrow();
    (
      state.js_loop.clone(),
      state.manager.clone(),
      state.registry.clone(),
    )
  };

  let Some(record) = registry.get(model_id) else {
    set_error(
      scope,
      &mut rv,
      TheErr::InvalidModel(format!("unknown model id {model_id}")),
    );
    return;
  };

  let options = match parse_options(scope, args.get(1)) {
    Ok(options) => options,
    Err(e) => {
      set_error(scope, &mut rv, e);
      return;
    }
  };

  let model = BridgeModel::new(model_id, record.clone(), js_loop.handle());
  debug!("Run model: {model_id:?}, options: {options:?}");
  match manager.run(scope, &js_loop, record, Box::new(model), options) {
    Ok(()) => { /* undefined */ }
    Err(e) => set_error(scope, &mut rv, e),
  }
}

/// Zero-argument command constructors, dispatched on the type name.
pub fn cmd(
  scope: &mut v8::HandleScope,
  args: v8::FunctionCallbackArguments,
  mut rv: v8::ReturnValue,
) {
  let kind = args.get(0);
  if !is_v8_str!(kind) {
    set_error(
      scope,
      &mut rv,
      TheErr::InvalidArguments("command type must be a string".to_string()),
    );
    return;
  }
  let kind_str = kind.to_string(scope).unwrap();
  let kind = String::from_v8(scope, kind_str);
  if !SIMPLE_CMD_TYPES.contains(&kind.as_str()) {
    set_error(
      scope,
      &mut rv,
      TheErr::InvalidArguments(format!("unknown command type {kind:?}")),
    );
    return;
  }
  let descriptor = make_descriptor(scope, &kind);
  rv.set(descriptor.into());
}

fn grouped_cmd(
  scope: &mut v8::HandleScope,
  args: v8::FunctionCallbackArguments,
  rv: &mut v8::ReturnValue,
  kind: &str,
) {
  let cmds = args.get(0);
  let Ok(cmds) = v8::Local::<v8::Array>::try_from(cmds) else {
    set_error(
      scope,
      rv,
      TheErr::InvalidArguments(format!("{kind} expects command descriptors")),
    );
    return;
  };
  let descriptor = make_descriptor(scope, kind);
  set_property_to(scope, descriptor, "cmds", cmds.into());
  rv.set(descriptor.into());
}

/// `Tea.batch(...cmds)`.
pub fn batch(
  scope: &mut v8::HandleScope,
  args: v8::FunctionCallbackArguments,
  mut rv: v8::ReturnValue,
) {
  grouped_cmd(scope, args, &mut rv, "batch");
}

/// `Tea.sequence(...cmds)`.
pub fn sequence(
  scope: &mut v8::HandleScope,
  args: v8::FunctionCallbackArguments,
  mut rv: v8::ReturnValue,
) {
  grouped_cmd(scope, args, &mut rv, "sequence");
}

/// `Tea.tick(durationMs, id?)`.
pub fn tick(
  scope: &mut v8::HandleScope,
  args: v8::FunctionCallbackArguments,
  mut rv: v8::ReturnValue,
) {
  let duration = args.get(0);
  let millis = if duration.is_number() {
    let duration_num = duration.to_number(scope).unwrap();
    f64::from_v8(scope, duration_num)
  } else {
    0.0
  };
  // NaN must fail validation too, so test the positive side.
  if !(millis > 0.0) {
    set_error(scope, &mut rv, TheErr::InvalidDuration(millis as i64));
    return;
  }

  let descriptor = make_descriptor(scope, "tick");
  let millis = millis.to_v8(scope);
  set_property_to(scope, descriptor, "duration", millis.into());

  let id = args.get(1);
  if id.is_string() {
    set_property_to(scope, descriptor, "id", id);
  }
  rv.set(descriptor.into());
}

/// `Tea.setWindowTitle(title)`.
pub fn set_window_title(
  scope: &mut v8::HandleScope,
  args: v8::FunctionCallbackArguments,
  mut rv: v8::ReturnValue,
) {
  let title = args.get(0);
  if title.is_undefined() {
    set_error(
      scope,
      &mut rv,
      TheErr::InvalidArguments("setWindowTitle requires a title".to_string()),
    );
    return;
  }
  let descriptor = make_descriptor(scope, "setWindowTitle");
  let title = title.to_rust_string_lossy(scope).to_v8(scope);
  set_property_to(scope, descriptor, "title", title.into());
  rv.set(descriptor.into());
}

/// `Tea.isTTY()`.
pub fn is_tty(
  scope: &mut v8::HandleScope,
  _args: v8::FunctionCallbackArguments,
  mut rv: v8::ReturnValue,
) {
  let state_rc = JsRuntime::state(scope);
  let is_tty = state_rc.borrow().manager.is_tty();
  rv.set_bool(is_tty);
}
