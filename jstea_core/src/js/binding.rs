//! Js runtime bindings.

pub mod global_tea;

use crate::prelude::*;

/// Adds a property with the given name and value, into the given object.
pub fn set_property_to(
  scope: &mut v8::HandleScope<'_>,
  target: v8::Local<v8::Object>,
  name: &str,
  value: v8::Local<v8::Value>,
) {
  let key = v8::String::new(scope, name).unwrap();
  target.set(scope, key.into(), value);
}

/// Adds a read-only property with the given name and value, into the given
/// object.
pub fn set_constant_to(
  scope: &mut v8::HandleScope<'_>,
  target: v8::Local<v8::Object>,
  name: &str,
  value: v8::Local<v8::Value>,
) {
  let key = v8::String::new(scope, name).unwrap();
  target.define_own_property(
    scope,
    key.into(),
    value,
    v8::PropertyAttribute::READ_ONLY,
  );
}

/// Adds a `Function` object which calls the given Rust function.
pub fn set_function_to(
  scope: &mut v8::HandleScope<'_>,
  target: v8::Local<v8::Object>,
  name: &'static str,
  callback: impl v8::MapFnTo<v8::FunctionCallback>,
) {
  let key = v8::String::new(scope, name).unwrap();
  let template = v8::FunctionTemplate::new(scope, callback);
  let val = template.get_function(scope).unwrap();

  target.set(scope, key.into(), val.into());
}

/// Creates an object with a given name under a `target` object.
pub fn create_object_under<'s>(
  scope: &mut v8::HandleScope<'s>,
  target: v8::Local<v8::Object>,
  name: &'static str,
) -> v8::Local<'s, v8::Object> {
  let template = v8::ObjectTemplate::new(scope);
  let key = v8::String::new(scope, name).unwrap();
  let value = template.new_instance(scope).unwrap();

  target.set(scope, key.into(), value.into());
  value
}

/// Populates a new JavaScript context with low-level Rust bindings.
pub fn create_new_context<'s>(
  scope: &mut v8::HandleScope<'s, ()>,
) -> v8::Local<'s, v8::Context> {
  // Here we need an EscapableHandleScope so V8 doesn't drop the
  // newly created HandleScope on return.
  // (https://v8.dev/docs/embed#handles-and-garbage-collection)
  let scope = &mut v8::EscapableHandleScope::new(scope);

  // Create and enter a new JavaScript context.
  let context = v8::Context::new(scope, Default::default());
  let global = context.global(scope);
  let scope = &mut v8::ContextScope::new(scope, context);

  // Register the `__InternalJsteaGlobalObject` global object.
  let tea = create_object_under(scope, global, "__InternalJsteaGlobalObject");

  // For `Tea`
  {
    set_function_to(scope, tea, "tui_new_model", global_tea::new_model);
    set_function_to(scope, tea, "tui_run", global_tea::run);
    set_function_to(scope, tea, "tui_cmd", global_tea::cmd);
    set_function_to(scope, tea, "tui_batch", global_tea::batch);
    set_function_to(scope, tea, "tui_sequence", global_tea::sequence);
    set_function_to(scope, tea, "tui_tick", global_tea::tick);
    set_function_to(
      scope,
      tea,
      "tui_set_window_title",
      global_tea::set_window_title,
    );
    set_function_to(scope, tea, "tui_is_tty", global_tea::is_tty);
  }

  scope.escape(context)
}

/// Builds the script-visible error object `{error, errorCode}` for a bridge
/// error. Validation failures are returned, never thrown.
pub fn error_object<'s>(
  scope: &mut v8::HandleScope<'s>,
  error: &TheErr,
) -> v8::Local<'s, v8::Object> {
  let obj = v8::Object::new(scope);
  let message = v8::String::new(scope, &format!("{}: {}", error.code(), error))
    .unwrap();
  set_property_to(scope, obj, "error", message.into());
  let code = v8::String::new(scope, error.code()).unwrap();
  set_property_to(scope, obj, "errorCode", code.into());
  obj
}
