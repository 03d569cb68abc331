use crate::bridge::manager::BridgeStreams;
use crate::bridge::manager::SharedWriter;
use crate::bridge::registry::ModelRecord;
use crate::bridge::throttle::ThrottleState;
use crate::msg::KeyMsg;
use crate::msg::Msg;
use crate::prelude::*;
use crate::test::js::eval_to_json;
use crate::test::js::eval_to_string;
use crate::test::js::make_bridge;
use crate::test::js::make_bridge_full;
use crate::test::js::make_bridge_with_streams;
use crate::test::log::init as test_log_init;
use crate::tui::Cmd;
use crate::tui::ProgramHandle;
use crate::tui::ProgramModel;
use crate::tui::ProgramOptions;
use compact_str::ToCompactString;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

fn key(name: &str) -> Msg {
  Msg::Key(KeyMsg {
    runes: name.to_compact_string(),
    name: name.to_compact_string(),
    alt: false,
    ctrl: false,
    paste: false,
  })
}

fn wait_for_program(record: &Arc<ModelRecord>) -> ProgramHandle {
  let deadline = Instant::now() + Duration::from_secs(5);
  loop {
    if let Some(handle) = record.program() {
      return handle;
    }
    assert!(Instant::now() < deadline, "program did not start");
    std::thread::sleep(Duration::from_millis(1));
  }
}

const COUNTER_MODEL: &str = r#"
globalThis.seen = [];
globalThis.model = Tea.newModel({
  init: () => ({ count: 0 }),
  update: (msg, state) => {
    globalThis.seen.push(msg.type);
    if (msg.type === "Key" && msg.key === "q") {
      return [state, Tea.quit()];
    }
    if (msg.type === "Key") {
      return [{ count: state.count + 1 }, null];
    }
    return [state, null];
  },
  view: (state) => `count: ${state.count}`,
});
"#;

#[test]
fn quit_on_key1() {
  test_log_init();
  let mut bridge = make_bridge();
  bridge
    .runtime
    .execute_script("<test>", COUNTER_MODEL)
    .unwrap();
  let record = bridge.registry.get(1).unwrap();

  let driver = {
    let record = record.clone();
    std::thread::spawn(move || {
      let handle = wait_for_program(&record);
      assert!(handle.send(key("a")));
      assert!(handle.send(key("q")));
    })
  };

  assert_eq!(
    eval_to_string(&mut bridge.runtime, "Tea.run(globalThis.model)"),
    "undefined"
  );
  driver.join().unwrap();

  assert_eq!(
    eval_to_json(&mut bridge.runtime, "globalThis.seen"),
    r#"["Key","Key"]"#
  );
  assert!(!bridge.manager.is_running());
  assert!(record.program().is_none());
}

#[test]
fn init_error_latched1() {
  test_log_init();
  let mut bridge = make_bridge();
  bridge
    .runtime
    .execute_script(
      "<test>",
      r#"
globalThis.model = Tea.newModel({
  init: () => { throw new Error("bad init"); },
  update: (msg, state) => [state, null],
  view: (state) => "never",
});
"#,
    )
    .unwrap();
  let record = bridge.registry.get(1).unwrap();

  let driver = {
    let record = record.clone();
    std::thread::spawn(move || {
      let handle = wait_for_program(&record);
      assert!(handle.send(Msg::Quit));
    })
  };

  assert_eq!(
    eval_to_string(&mut bridge.runtime, "Tea.run(globalThis.model)"),
    "undefined"
  );
  driver.join().unwrap();

  let init_error = record.init_error().unwrap();
  assert!(init_error.contains("bad init"), "got: {init_error}");
}

#[test]
fn already_running1() {
  test_log_init();
  let mut bridge = make_bridge();
  bridge
    .runtime
    .execute_script(
      "<test>",
      r#"
globalThis.secondResult = null;
globalThis.model = Tea.newModel({
  init: () => ({}),
  update: (msg, state) => {
    if (msg.type === "Key" && msg.key === "x") {
      globalThis.secondResult = Tea.run(globalThis.model);
      return [state, Tea.quit()];
    }
    return [state, null];
  },
  view: (state) => "",
});
"#,
    )
    .unwrap();
  let record = bridge.registry.get(1).unwrap();

  let driver = {
    let record = record.clone();
    std::thread::spawn(move || {
      let handle = wait_for_program(&record);
      assert!(handle.send(key("x")));
    })
  };

  assert_eq!(
    eval_to_string(&mut bridge.runtime, "Tea.run(globalThis.model)"),
    "undefined"
  );
  driver.join().unwrap();

  assert_eq!(
    eval_to_string(&mut bridge.runtime, "globalThis.secondResult.errorCode"),
    "BT004"
  );
  let message =
    eval_to_string(&mut bridge.runtime, "globalThis.secondResult.error");
  assert!(message.contains("already running"), "got: {message}");
}

#[test]
fn state_refresh1() {
  test_log_init();
  let mut bridge = make_bridge();

  // No-op while idle.
  assert!(!bridge.manager.send_state_refresh("nope"));

  bridge
    .runtime
    .execute_script(
      "<test>",
      r#"
globalThis.refreshKeys = [];
globalThis.model = Tea.newModel({
  init: () => ({}),
  update: (msg, state) => {
    if (msg.type === "StateRefresh") {
      globalThis.refreshKeys.push(msg.key);
    }
    if (msg.type === "Key" && msg.key === "q") {
      return [state, Tea.quit()];
    }
    return [state, null];
  },
  view: (state) => "",
});
"#,
    )
    .unwrap();
  let record = bridge.registry.get(1).unwrap();

  let driver = {
    let record = record.clone();
    let manager = bridge.manager.clone();
    std::thread::spawn(move || {
      let handle = wait_for_program(&record);
      assert!(manager.send_state_refresh("cursor"));
      assert!(handle.send(key("q")));
    })
  };

  assert_eq!(
    eval_to_string(&mut bridge.runtime, "Tea.run(globalThis.model)"),
    "undefined"
  );
  driver.join().unwrap();

  assert_eq!(
    eval_to_json(&mut bridge.runtime, "globalThis.refreshKeys"),
    r#"["cursor"]"#
  );
}

#[derive(Clone)]
struct VecWriter(Arc<Mutex<Vec<u8>>>);

impl Write for VecWriter {
  fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
    self.0.lock().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> IoResult<()> {
    Ok(())
  }
}

struct PanicOnUpdate;

impl ProgramModel for PanicOnUpdate {
  fn init(&mut self) -> Option<Cmd> {
    None
  }

  fn update(&mut self, _msg: Msg) -> Option<Cmd> {
    panic!("update exploded");
  }

  fn view(&mut self) -> String {
    String::new()
  }
}

#[test]
fn panic_containment1() {
  test_log_init();
  let stderr_buf: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(vec![]));
  let mut bridge = make_bridge_with_streams(BridgeStreams::Custom {
    output: SharedWriter::new(Box::new(std::io::sink())),
    error: SharedWriter::new(Box::new(VecWriter(stderr_buf.clone()))),
  });

  let record = bridge.registry.insert(ThrottleState::default());
  let driver = {
    let record = record.clone();
    std::thread::spawn(move || {
      let handle = wait_for_program(&record);
      assert!(handle.send(key("a")));
    })
  };

  let result = {
    let scope = &mut bridge.runtime.handle_scope();
    bridge.manager.run(
      scope,
      &bridge.js_loop,
      record.clone(),
      Box::new(PanicOnUpdate),
      ProgramOptions::default(),
    )
  };
  driver.join().unwrap();

  match result {
    Err(TheErr::Panic(payload)) => {
      assert_eq!(payload, "update exploded");
      assert_eq!(TheErr::Panic(payload).code(), "BT007");
    }
    other => panic!("expected panic error, got {other:?}"),
  }

  let stderr = String::from_utf8(stderr_buf.lock().clone()).unwrap();
  assert!(stderr.contains("BT007"), "got: {stderr}");
  assert!(stderr.contains("update exploded"), "got: {stderr}");
  assert!(!bridge.manager.is_running());
  assert!(record.program().is_none());
}

#[test]
fn signal_quits_program1() {
  test_log_init();

  fn delayed_quit_signals(quit: CancellationToken) {
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(20)).await;
      quit.cancel();
    });
  }

  let mut bridge =
    make_bridge_full(BridgeStreams::None, delayed_quit_signals);
  bridge
    .runtime
    .execute_script(
      "<test>",
      r#"
globalThis.model = Tea.newModel({
  init: () => ({}),
  update: (msg, state) => [state, null],
  view: (state) => "",
});
"#,
    )
    .unwrap();

  // The model never quits itself; the stubbed signal delivery must end the
  // run.
  let started = Instant::now();
  assert_eq!(
    eval_to_string(&mut bridge.runtime, "Tea.run(globalThis.model)"),
    "undefined"
  );
  assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn throttle_coalescing1() {
  test_log_init();
  let mut bridge = make_bridge();
  bridge
    .runtime
    .execute_script(
      "<test>",
      r#"
globalThis.views = 0;
globalThis.seen = [];
globalThis.model = Tea.newModel({
  init: () => ({ n: 0 }),
  update: (msg, state) => {
    globalThis.seen.push(msg.type);
    if (msg.type === "Key" && msg.key === "q") {
      return [state, Tea.quit()];
    }
    if (msg.type === "Key") {
      return [{ n: state.n + 1 }, null];
    }
    return [state, null];
  },
  view: (state) => {
    globalThis.views++;
    return `n: ${state.n}`;
  },
  renderThrottle: { enabled: true, minIntervalMs: 50 },
});
"#,
    )
    .unwrap();
  let record = bridge.registry.get(1).unwrap();

  let driver = {
    let record = record.clone();
    std::thread::spawn(move || {
      let handle = wait_for_program(&record);
      for _ in 0..20 {
        assert!(handle.send(key("a")));
      }
      // Let the deferred refresh land, then stop.
      std::thread::sleep(Duration::from_millis(150));
      assert!(handle.send(key("q")));
    })
  };

  assert_eq!(
    eval_to_string(&mut bridge.runtime, "Tea.run(globalThis.model)"),
    "undefined"
  );
  driver.join().unwrap();

  // One render for the initial frame, one deferred refresh after the burst,
  // one final frame; far fewer than the 20 updates.
  let views: usize = eval_to_string(&mut bridge.runtime, "globalThis.views")
    .parse()
    .unwrap();
  assert!((2..=5).contains(&views), "got {views} view invocations");

  // The last state was eventually rendered.
  assert_eq!(record.throttle.lock().cached_view, "n: 20");

  // The deferred refresh is internal and never reaches script.
  assert_eq!(
    eval_to_string(
      &mut bridge.runtime,
      r#"globalThis.seen.includes("RenderRefresh")"#
    ),
    "false"
  );
}
