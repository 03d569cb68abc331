//! The script-thread event loop.
//!
//! All V8 access funnels through here: the loop is owned by the thread that
//! owns the isolate, other threads schedule callbacks onto it. While a script
//! sits blocked inside `Tea.run(...)`, [`JsLoop::serve_until`] keeps draining
//! the queue, so the renderer thread can keep calling back into script.

use crate::prelude::*;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::bounded;
use crossbeam_channel::unbounded;
use std::cell::Cell;
use std::thread::ThreadId;

/// A callback scheduled onto the script thread.
pub type JsJob = Box<dyn FnOnce(&mut v8::HandleScope) + Send + 'static>;

thread_local! {
  // The scope a `serve_until` call is currently lending out, so an on-loop
  // `run_js_sync` can execute inline instead of deadlocking on itself.
  static ACTIVE_SCOPE: Cell<*mut ()> = const { Cell::new(std::ptr::null_mut()) };
}

fn erase_scope<'s>(scope: &mut v8::HandleScope<'s>) -> *mut () {
  scope as *mut v8::HandleScope<'s> as *mut ()
}

// SAFETY: only called with a pointer produced by [`erase_scope`] that is
// still lent out by the active `serve_until` frame on this thread.
unsafe fn scope_from_ptr<'a, 's>(ptr: *mut ()) -> &'a mut v8::HandleScope<'s> {
  unsafe { &mut *ptr.cast::<v8::HandleScope<'s>>() }
}

struct ActiveScopeGuard {
  prev: *mut (),
}

impl ActiveScopeGuard {
  fn new(ptr: *mut ()) -> Self {
    let prev = ACTIVE_SCOPE.with(|slot| slot.replace(ptr));
    ActiveScopeGuard { prev }
  }
}

impl Drop for ActiveScopeGuard {
  fn drop(&mut self) {
    ACTIVE_SCOPE.with(|slot| slot.set(self.prev));
  }
}

/// The queue consumer. Owned by the script thread, dropped when the host
/// shuts down; dropping it fails every pending and future schedule with
/// [`TheErr::EventLoopStopped`].
pub struct JsLoop {
  rx: Receiver<JsJob>,
  handle: JsLoopHandle,
}

#[derive(Debug, Clone)]
/// The producer side, safe to clone into any thread.
pub struct JsLoopHandle {
  tx: Sender<JsJob>,
  owner: ThreadId,
}

impl Default for JsLoop {
  fn default() -> Self {
    Self::new()
  }
}

impl JsLoop {
  /// Creates the loop, bound to the calling thread.
  pub fn new() -> Self {
    let (tx, rx) = unbounded();
    let handle = JsLoopHandle {
      tx,
      owner: std::thread::current().id(),
    };
    JsLoop { rx, handle }
  }

  pub fn handle(&self) -> JsLoopHandle {
    self.handle.clone()
  }

  /// Drains scheduled callbacks in enqueue order until `done` yields a
  /// value, lending `scope` to each callback. This is what lets a blocked
  /// script-side `run()` keep servicing renderer-thread callbacks.
  pub fn serve_until<T>(
    &self,
    scope: &mut v8::HandleScope,
    done: &Receiver<T>,
  ) -> TheResult<T> {
    let _guard = ActiveScopeGuard::new(erase_scope(scope));
    loop {
      crossbeam_channel::select! {
        recv(self.rx) -> job => match job {
          Ok(job) => job(scope),
          Err(_) => return Err(TheErr::EventLoopStopped),
        },
        recv(done) -> result => {
          return result.map_err(|_| TheErr::EventLoopStopped);
        }
      }
    }
  }

  /// Runs every callback already in the queue, without blocking.
  pub fn drain(&self, scope: &mut v8::HandleScope) {
    let _guard = ActiveScopeGuard::new(erase_scope(scope));
    while let Ok(job) = self.rx.try_recv() {
      job(scope);
    }
  }
}

impl JsLoopHandle {
  /// Whether the calling thread is the one that owns the loop.
  pub fn on_loop(&self) -> bool {
    std::thread::current().id() == self.owner
  }

  /// Schedules `f` on the script thread and blocks until it ran, propagating
  /// its result. Fails with [`TheErr::EventLoopStopped`] when the loop shut
  /// down before `f` executed.
  ///
  /// Called from the loop thread itself while a callback is being served,
  /// `f` executes inline against the active scope.
  pub fn run_js_sync<T, F>(&self, f: F) -> TheResult<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut v8::HandleScope) -> TheResult<T> + Send + 'static,
  {
    if self.on_loop() {
      return ACTIVE_SCOPE.with(|slot| {
        let ptr = slot.get();
        if ptr.is_null() {
          // On the loop thread but nothing is serving, so no callback can
          // be awaiting us either: nothing will ever run the job.
          return Err(TheErr::EventLoopStopped);
        }
        let scope = unsafe { scope_from_ptr(ptr) };
        f(scope)
      });
    }

    let (done_tx, done_rx) = bounded(1);
    let job: JsJob = Box::new(move |scope| {
      let _ = done_tx.send(f(scope));
    });
    if self.tx.send(job).is_err() {
      return Err(TheErr::EventLoopStopped);
    }
    match done_rx.recv() {
      Ok(result) => result,
      // The job was dropped unexecuted at shutdown.
      Err(_) => Err(TheErr::EventLoopStopped),
    }
  }

  /// Schedules `f` without waiting. Returns false when the loop is stopped.
  pub fn run_on_loop<F>(&self, f: F) -> bool
  where
    F: FnOnce(&mut v8::HandleScope) + Send + 'static,
  {
    self.tx.send(Box::new(f)).is_ok()
  }
}
