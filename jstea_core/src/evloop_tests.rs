use crate::prelude::*;
use crate::test::js::make_bridge;
use crate::test::log::init as test_log_init;
use crossbeam_channel::bounded;
use parking_lot::Mutex;
use std::sync::Arc;

#[test]
fn run_js_sync1() {
  test_log_init();
  let mut bridge = make_bridge();
  let js_loop = bridge.js_loop.clone();
  let handle = js_loop.handle();
  let (done_tx, done_rx) = bounded(1);

  let worker = std::thread::spawn(move || {
    let result = handle.run_js_sync(|scope| {
      let value = v8::Integer::new(scope, 21);
      Ok(value.int32_value(scope).unwrap() * 2)
    });
    done_tx.send(result).unwrap();
  });

  let scope = &mut bridge.runtime.handle_scope();
  let result = js_loop.serve_until(scope, &done_rx).unwrap();
  worker.join().unwrap();
  assert_eq!(result.unwrap(), 42);
}

#[test]
fn callbacks_run_in_enqueue_order1() {
  test_log_init();
  let mut bridge = make_bridge();
  let js_loop = bridge.js_loop.clone();
  let handle = js_loop.handle();
  let order: Arc<Mutex<Vec<i32>>> = Arc::new(Mutex::new(vec![]));
  let (done_tx, done_rx) = bounded(1);

  let worker = {
    let order = order.clone();
    std::thread::spawn(move || {
      for i in 0..100 {
        let order = order.clone();
        handle
          .run_js_sync(move |_scope| {
            order.lock().push(i);
            Ok(())
          })
          .unwrap();
      }
      done_tx.send(()).unwrap();
    })
  };

  let scope = &mut bridge.runtime.handle_scope();
  js_loop.serve_until(scope, &done_rx).unwrap();
  worker.join().unwrap();

  let order = order.lock();
  assert_eq!(*order, (0..100).collect::<Vec<i32>>());
}

#[test]
fn error_propagates1() {
  test_log_init();
  let mut bridge = make_bridge();
  let js_loop = bridge.js_loop.clone();
  let handle = js_loop.handle();
  let (done_tx, done_rx) = bounded(1);

  let worker = std::thread::spawn(move || {
    let result: TheResult<()> = handle
      .run_js_sync(|_scope| Err(TheErr::ScriptRaised("boom".to_string())));
    done_tx.send(result).unwrap();
  });

  let scope = &mut bridge.runtime.handle_scope();
  let result = js_loop.serve_until(scope, &done_rx).unwrap();
  worker.join().unwrap();
  assert!(matches!(result, Err(TheErr::ScriptRaised(_))));
}

#[test]
fn stopped_loop1() {
  test_log_init();
  let bridge = make_bridge();
  let handle = bridge.js_loop.handle();
  drop(bridge);

  let result: TheResult<()> = handle.run_js_sync(|_scope| Ok(()));
  assert!(matches!(result, Err(TheErr::EventLoopStopped)));
  assert!(!handle.run_on_loop(|_scope| {}));
}

#[test]
fn run_on_loop1() {
  test_log_init();
  let mut bridge = make_bridge();
  let js_loop = bridge.js_loop.clone();
  let handle = js_loop.handle();
  let ran: Arc<Mutex<bool>> = Arc::new(Mutex::new(false));

  {
    let ran = ran.clone();
    assert!(handle.run_on_loop(move |_scope| {
      *ran.lock() = true;
    }));
  }

  let scope = &mut bridge.runtime.handle_scope();
  js_loop.drain(scope);
  assert!(*ran.lock());
}
