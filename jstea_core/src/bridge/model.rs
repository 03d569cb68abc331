//! The adapter between a script `{init, update, view}` triple and the
//! renderer's lifecycle contract.
//!
//! Every callback is marshalled onto the script thread through the event
//! loop; constructing a [`BridgeModel`] without a loop handle is impossible,
//! which is what keeps script values off the renderer thread.

use crate::bridge::registry::ModelId;
use crate::bridge::registry::ModelRecord;
use crate::bridge::throttle;
use crate::bridge::throttle::ViewGate;
use crate::evloop::JsLoopHandle;
use crate::js::JsRuntime;
use crate::js::codec;
use crate::js::err::JsError;
use crate::msg::Msg;
use crate::prelude::*;
use crate::tui::Cmd;
use crate::tui::ProgramModel;
use std::sync::Arc;

pub struct BridgeModel {
  model_id: ModelId,
  record: Arc<ModelRecord>,
  js_loop: JsLoopHandle,
}

impl BridgeModel {
  pub fn new(
    model_id: ModelId,
    record: Arc<ModelRecord>,
    js_loop: JsLoopHandle,
  ) -> Self {
    BridgeModel {
      model_id,
      record,
      js_loop,
    }
  }
}

impl ProgramModel for BridgeModel {
  fn init(&mut self) -> Option<Cmd> {
    let model_id = self.model_id;
    let result = self
      .js_loop
      .run_js_sync(move |scope| call_init(scope, model_id));
    match result {
      Ok(cmd) => cmd,
      Err(e) => {
        error!("Model init failed: {e}");
        self.record.set_init_error(e.to_string());
        None
      }
    }
  }

  fn update(&mut self, msg: Msg) -> Option<Cmd> {
    // The deferred refresh never reaches script.
    if matches!(msg, Msg::RenderRefresh) {
      throttle::on_render_refresh(&self.record);
      return None;
    }
    throttle::mark_always_render(&self.record, msg.kind());

    let model_id = self.model_id;
    let result = self
      .js_loop
      .run_js_sync(move |scope| call_update(scope, model_id, msg));
    match result {
      Ok(cmd) => cmd,
      Err(TheErr::EventLoopStopped) => {
        // Without the script loop there is nothing left to pump updates
        // through; the UI is stuck from here on.
        error!("Event loop stopped during update, update pump is broken");
        None
      }
      Err(e) => {
        error!("Model update failed: {e}");
        None
      }
    }
  }

  fn view(&mut self) -> String {
    if let Some(e) = self.record.init_error() {
      return format!("model init failed: {e}");
    }

    match throttle::gate_view(&self.record) {
      ViewGate::Cached(view) => view,
      ViewGate::Render => {
        let model_id = self.model_id;
        let result = self
          .js_loop
          .run_js_sync(move |scope| call_view(scope, model_id));
        match result {
          Ok(view) => {
            throttle::store_view(&self.record, &view);
            view
          }
          Err(e) => {
            error!("Model view failed: {e}");
            format!("view error: {e}")
          }
        }
      }
    }
  }
}

/// Runs the script `init` on the script thread and stores the initial state.
fn call_init(
  scope: &mut v8::HandleScope,
  model_id: ModelId,
) -> TheResult<Option<Cmd>> {
  let state_rc = JsRuntime::state(scope);
  let init = {
    let state = state_rc.borrow();
    let model = state.models.get(&model_id).ok_or_else(|| {
      TheErr::InvalidModel(format!("unknown model id {model_id}"))
    })?;
    model.init.clone()
  };

  let init = v8::Local::new(scope, init);
  let undefined: v8::Local<v8::Value> = v8::undefined(scope).into();
  let tc_scope = &mut v8::TryCatch::new(scope);

  let ret = init.call(tc_scope, undefined, &[]);

  if tc_scope.has_caught() {
    let exception = tc_scope.exception().unwrap();
    let exception = JsError::from_v8_exception(tc_scope, exception, None);
    reset_state(tc_scope, &state_rc, model_id);
    return Err(TheErr::ScriptRaised(exception.to_string()));
  }

  let ret = match ret {
    Some(ret) if !ret.is_null_or_undefined() => ret,
    _ => {
      reset_state(tc_scope, &state_rc, model_id);
      return Err(TheErr::ScriptRaised(
        "init returned nothing".to_string(),
      ));
    }
  };

  let (state, cmd) = codec::decode_init_return(tc_scope, ret);
  if let Some(model) = state_rc.borrow_mut().models.get_mut(&model_id) {
    model.state = state;
  }
  Ok(cmd)
}

/// A failed init leaves a fresh empty state behind.
fn reset_state(
  scope: &mut v8::HandleScope,
  state_rc: &std::rc::Rc<std::cell::RefCell<crate::js::JsRuntimeState>>,
  model_id: ModelId,
) {
  let empty: v8::Local<v8::Value> = v8::Object::new(scope).into();
  let empty = v8::Global::new(scope, empty);
  if let Some(model) = state_rc.borrow_mut().models.get_mut(&model_id) {
    model.state = empty;
  }
}

/// Runs the script `update` on the script thread, updating the stored state
/// and decoding the returned command.
fn call_update(
  scope: &mut v8::HandleScope,
  model_id: ModelId,
  msg: Msg,
) -> TheResult<Option<Cmd>> {
  // Conversion yielding nothing means nothing to tell the script.
  let Some(msg_value) = codec::msg_to_v8(scope, &msg) else {
    return Ok(None);
  };

  let state_rc = JsRuntime::state(scope);
  let (update, prev_state) = {
    let state = state_rc.borrow();
    let model = state.models.get(&model_id).ok_or_else(|| {
      TheErr::InvalidModel(format!("unknown model id {model_id}"))
    })?;
    (model.update.clone(), model.state.clone())
  };

  let update = v8::Local::new(scope, update);
  let state_value = v8::Local::new(scope, prev_state.clone());
  let undefined: v8::Local<v8::Value> = v8::undefined(scope).into();
  let tc_scope = &mut v8::TryCatch::new(scope);

  let ret = update.call(tc_scope, undefined, &[msg_value, state_value]);

  if tc_scope.has_caught() {
    let exception = tc_scope.exception().unwrap();
    let exception = JsError::from_v8_exception(tc_scope, exception, None);
    return Err(TheErr::ScriptRaised(exception.to_string()));
  }

  let ret = match ret {
    Some(ret) => ret,
    None => return Err(TheErr::ScriptRaised("update returned nothing".to_string())),
  };

  let (new_state, cmd) = codec::decode_update_return(tc_scope, ret, prev_state);
  if let Some(model) = state_rc.borrow_mut().models.get_mut(&model_id) {
    model.state = new_state;
  }
  Ok(cmd)
}

/// Runs the script `view` on the script thread.
fn call_view(
  scope: &mut v8::HandleScope,
  model_id: ModelId,
) -> TheResult<String> {
  let state_rc = JsRuntime::state(scope);
  let (view, state) = {
    let state = state_rc.borrow();
    let model = state.models.get(&model_id).ok_or_else(|| {
      TheErr::InvalidModel(format!("unknown model id {model_id}"))
    })?;
    (model.view.clone(), model.state.clone())
  };

  let view = v8::Local::new(scope, view);
  let state_value = v8::Local::new(scope, state);
  let undefined: v8::Local<v8::Value> = v8::undefined(scope).into();
  let tc_scope = &mut v8::TryCatch::new(scope);

  let ret = view.call(tc_scope, undefined, &[state_value]);

  if tc_scope.has_caught() {
    let exception = tc_scope.exception().unwrap();
    let exception = JsError::from_v8_exception(tc_scope, exception, None);
    return Err(TheErr::ScriptRaised(exception.to_string()));
  }

  match ret {
    Some(ret) => Ok(ret.to_rust_string_lossy(tc_scope)),
    None => Err(TheErr::ScriptRaised("view returned nothing".to_string())),
  }
}
