//! JavaScript runtime.

use crate::bridge::manager::ProgramManager;
use crate::bridge::registry::ModelId;
use crate::bridge::registry::ModelRegistry;
use crate::evloop::JsLoop;
use crate::js::err::JsError;
use crate::prelude::*;
use crate::tui::Cmd;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

pub mod binding;
pub mod codec;
pub mod converter;
pub mod err;

/// Next command descriptor id. Process-wide, monotonically increasing.
///
/// NOTE: Start from 1.
pub fn next_cmd_id() -> u64 {
  static GLOBAL: AtomicU64 = AtomicU64::new(1);
  GLOBAL.fetch_add(1, Ordering::Relaxed)
}

/// Script-side callables and current state of one registered model. Lives
/// only on the script thread, keyed by the same id as the shared registry.
pub struct ScriptModel {
  pub init: v8::Global<v8::Function>,
  pub update: v8::Global<v8::Function>,
  pub view: v8::Global<v8::Function>,
  pub state: v8::Global<v8::Value>,
}

pub struct JsRuntimeState {
  /// A sand-boxed execution context with its own set of built-in objects and
  /// functions.
  pub context: v8::Global<v8::Context>,
  /// Script-side model halves, see [`ScriptModel`].
  pub models: HashMap<ModelId, ScriptModel>,
  /// Native renderer commands parked for a script round trip, keyed by
  /// opaque id.
  pub held_cmds: HashMap<u64, Cmd>,

  // Data access for the bridge {
  pub js_loop: Rc<JsLoop>,
  pub manager: Arc<ProgramManager>,
  pub registry: Arc<ModelRegistry>,
  // Data access for the bridge }
}

// Initialize V8 platform.
pub fn init_v8_platform() {
  static V8_INIT: Once = Once::new();
  V8_INIT.call_once(move || {
    let platform = v8::new_default_platform(0, false).make_shared();
    v8::V8::initialize_platform(platform);
    v8::V8::initialize();
  });
}

pub struct JsRuntime {
  // V8 isolate.
  isolate: v8::OwnedIsolate,

  /// The state of the runtime.
  pub state: Rc<RefCell<JsRuntimeState>>,
}

impl JsRuntime {
  /// Creates a new JsRuntime. [`init_v8_platform`] must have run first.
  pub fn new(
    js_loop: Rc<JsLoop>,
    manager: Arc<ProgramManager>,
    registry: Arc<ModelRegistry>,
  ) -> Self {
    init_v8_platform();

    let mut isolate = v8::Isolate::new(v8::CreateParams::default());
    isolate.set_capture_stack_trace_for_uncaught_exceptions(true, 10);

    let context = {
      let scope = &mut v8::HandleScope::new(&mut *isolate);
      let context = binding::create_new_context(scope);
      v8::Global::new(scope, context)
    };

    // Store state inside the v8 isolate slot.
    let state = Rc::new(RefCell::new(JsRuntimeState {
      context,
      models: HashMap::new(),
      held_cmds: HashMap::new(),
      js_loop,
      manager,
      registry,
    }));

    isolate.set_slot(state.clone());

    let mut runtime = JsRuntime { isolate, state };
    runtime.init_environment();
    runtime
  }

  /// Initializes synchronously the core environment (see js/runtime/*.js).
  fn init_environment(&mut self) {
    let name = "jstea:runtime/50__tea.js";
    let source = include_str!("./js/runtime/50__tea.js");
    self.init_builtin_script(name, source);
  }

  /// Synchronously load a builtin script.
  fn init_builtin_script(&mut self, name: &str, source: &str) {
    if let Err(e) = self.execute_script(name, source) {
      error!("Failed to evaluate builtin script: {name}, error: {e:?}");
      eprintln!("Failed to evaluate builtin script: {name}, error: {e:?}");
      std::process::exit(1);
    }
  }

  /// Executes traditional JavaScript code (traditional = not ES modules).
  /// Returns the script's completion value.
  pub fn execute_script(
    &mut self,
    filename: &str,
    source: &str,
  ) -> AnyResult<Option<v8::Global<v8::Value>>> {
    // Get the handle-scope.
    let scope = &mut self.handle_scope();

    let origin = create_origin(scope, filename, false);
    let source = v8::String::new(scope, source).unwrap();

    // The `TryCatch` scope allows us to catch runtime errors rather than
    // panicking.
    let tc_scope = &mut v8::TryCatch::new(scope);

    let script = match v8::Script::compile(tc_scope, source, Some(&origin)) {
      Some(script) => script,
      None => {
        debug_assert!(tc_scope.has_caught());
        let exception = tc_scope.exception().unwrap();
        let exception = JsError::from_v8_exception(tc_scope, exception, None);
        anyhow::bail!(exception);
      }
    };

    match script.run(tc_scope) {
      Some(value) => Ok(Some(v8::Global::new(tc_scope, value))),
      None => {
        debug_assert!(tc_scope.has_caught());
        let exception = tc_scope.exception().unwrap();
        let exception = JsError::from_v8_exception(tc_scope, exception, None);
        anyhow::bail!(exception);
      }
    }
  }
}

// State management specific methods.
impl JsRuntime {
  /// Returns the runtime state stored in the given isolate.
  pub fn state(isolate: &v8::Isolate) -> Rc<RefCell<JsRuntimeState>> {
    isolate
      .get_slot::<Rc<RefCell<JsRuntimeState>>>()
      .unwrap()
      .clone()
  }

  /// Returns the runtime's state.
  pub fn get_state(&self) -> Rc<RefCell<JsRuntimeState>> {
    Self::state(&self.isolate)
  }

  /// Returns a v8 handle scope for the runtime.
  pub fn handle_scope(&mut self) -> v8::HandleScope {
    let context = self.context();
    v8::HandleScope::with_context(&mut self.isolate, context)
  }

  /// Returns the context created for the runtime.
  pub fn context(&mut self) -> v8::Global<v8::Context> {
    let state = self.get_state();
    let state = state.borrow();
    state.context.clone()
  }
}

/// Creates a script origin for compilation.
pub fn create_origin<'s>(
  scope: &mut v8::HandleScope<'s, ()>,
  name: &str,
  is_module: bool,
) -> v8::ScriptOrigin<'s> {
  let name = v8::String::new(scope, name).unwrap();
  let source_map = v8::undefined(scope);

  v8::ScriptOrigin::new(
    scope,
    name.into(),
    0,
    0,
    false,
    0,
    Some(source_map.into()),
    false,
    false,
    is_module,
    None,
  )
}
