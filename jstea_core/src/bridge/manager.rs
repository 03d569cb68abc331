//! Program lifecycle management.
//!
//! Owns the terminal streams and the single-program slot. `run` spawns the
//! renderer thread, keeps the script event loop serviced while the script
//! side stays blocked, and guarantees terminal restoration on every exit
//! path, panics included.

use crate::bridge::registry::ModelRecord;
use crate::evloop::JsLoop;
use crate::msg::Msg;
use crate::prelude::*;
use crate::tui::program::InputSource;
use crate::tui::program::Program;
use crate::tui::program::ProgramHandle;
use crate::tui::program::ProgramModel;
use crate::tui::program::ProgramOptions;
use crate::tui::terminal;
use crossterm::tty::IsTty;
use parking_lot::Mutex;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Installs signal-to-quit wiring on the renderer runtime. A function
/// pointer so tests can stub signal handling out.
pub type SignalInstallFn = fn(CancellationToken);

#[derive(Clone)]
/// Cloneable writer over a shared sink.
pub struct SharedWriter(Arc<Mutex<Box<dyn Write + Send>>>);

impl SharedWriter {
  pub fn new(inner: Box<dyn Write + Send>) -> Self {
    SharedWriter(Arc::new(Mutex::new(inner)))
  }
}

impl Write for SharedWriter {
  fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
    self.0.lock().write(buf)
  }

  fn flush(&mut self) -> IoResult<()> {
    self.0.lock().flush()
  }
}

impl std::fmt::Debug for SharedWriter {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("SharedWriter { .. }")
  }
}

/// Where the manager binds its terminal streams.
pub enum BridgeStreams {
  /// Real stdio, with TTY probing.
  Stdio,
  /// Caller-provided sinks, never a terminal.
  Custom {
    output: SharedWriter,
    error: SharedWriter,
  },
  /// No streams bound at all; TTY probing is skipped entirely so creating a
  /// non-interactive bridge never touches stdin.
  None,
}

enum RunOutcome {
  Finished(AnyResult<()>),
  Panicked(String),
}

/// Restores the previously installed panic hook when dropped.
struct PanicHookGuard {
  prev: Option<Box<dyn Fn(&std::panic::PanicHookInfo<'_>) + Sync + Send>>,
}

impl PanicHookGuard {
  /// Routes panic reports into `slot` instead of stderr; the manager prints
  /// them itself, after the terminal is restored.
  fn install(slot: Arc<Mutex<Option<String>>>) -> Self {
    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
      let backtrace = std::backtrace::Backtrace::force_capture();
      *slot.lock() = Some(format!("{info}\nstack backtrace:\n{backtrace}"));
    }));
    PanicHookGuard { prev: Some(prev) }
  }
}

impl Drop for PanicHookGuard {
  fn drop(&mut self) {
    if let Some(prev) = self.prev.take() {
      std::panic::set_hook(prev);
    }
  }
}

fn panic_payload(payload: Box<dyn std::any::Any + Send>) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    s.to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic".to_string()
  }
}

pub struct ProgramManager {
  output: Option<SharedWriter>,
  error: Option<SharedWriter>,
  is_tty: bool,
  base_token: CancellationToken,
  signal_install: SignalInstallFn,
  current: Mutex<Option<ProgramHandle>>,
}

impl ProgramManager {
  pub fn new(streams: BridgeStreams) -> Self {
    Self::with_signals(streams, install_signal_watcher)
  }

  pub fn with_signals(
    streams: BridgeStreams,
    signal_install: SignalInstallFn,
  ) -> Self {
    let (output, error, is_tty) = match streams {
      BridgeStreams::Stdio => {
        // Probe input first, output second; record the first success.
        let is_tty = std::io::stdin().is_tty() || std::io::stdout().is_tty();
        (
          Some(SharedWriter::new(Box::new(std::io::stdout()))),
          Some(SharedWriter::new(Box::new(std::io::stderr()))),
          is_tty,
        )
      }
      BridgeStreams::Custom { output, error } => {
        (Some(output), Some(error), false)
      }
      BridgeStreams::None => (None, None, false),
    };

    ProgramManager {
      output,
      error,
      is_tty,
      base_token: CancellationToken::new(),
      signal_install,
      current: Mutex::new(None),
    }
  }

  pub fn is_tty(&self) -> bool {
    self.is_tty
  }

  pub fn is_running(&self) -> bool {
    self.current.lock().is_some()
  }

  /// Cancelling this token shuts the current (and any future) program down.
  pub fn cancellation_token(&self) -> CancellationToken {
    self.base_token.clone()
  }

  /// Posts a `StateRefresh` message to the running program. Thread-safe,
  /// no-op while idle.
  pub fn send_state_refresh(&self, key: &str) -> bool {
    match self.current.lock().as_ref() {
      Some(handle) => handle.send(Msg::StateRefresh {
        key: key.to_string(),
      }),
      None => false,
    }
  }

  /// Runs `record`'s program to completion. Blocks the calling (script)
  /// thread, but keeps `js_loop` serviced so the renderer can marshal
  /// callbacks back in. Exactly one program may run at a time.
  pub fn run(
    &self,
    scope: &mut v8::HandleScope,
    js_loop: &JsLoop,
    record: Arc<ModelRecord>,
    model: Box<dyn ProgramModel>,
    mut options: ProgramOptions,
  ) -> TheResult<()> {
    if self.is_running() {
      return Err(TheErr::AlreadyRunning);
    }

    let interactive = self.is_tty;
    options.input = if interactive {
      InputSource::Tty
    } else {
      InputSource::Null
    };

    let saved = terminal::snapshot();
    let run_token = self.base_token.child_token();

    let output: Box<dyn Write + Send> = match &self.output {
      Some(output) => Box::new(output.clone()),
      None => Box::new(std::io::sink()),
    };

    let rt = tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .map_err(|e| TheErr::ProgramFailed(e.to_string()))?;

    let mut program = Program::new(model, options, output, saved, run_token.clone());
    let handle = program.handle(rt.handle().clone());

    // Publish while holding the lock, so overlapping runs race on it
    // deterministically.
    {
      let mut current = self.current.lock();
      if current.is_some() {
        return Err(TheErr::AlreadyRunning);
      }
      *current = Some(handle.clone());
    }
    record.bind_program(handle.clone());

    // Panic reports are parked until the terminal is restored.
    let panic_report: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let hook_guard = PanicHookGuard::install(panic_report.clone());

    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    let signal_install = self.signal_install;
    let watcher_token = run_token.clone();
    let thread = std::thread::Builder::new()
      .name("jstea-render".to_string())
      .spawn(move || {
        let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| {
          rt.block_on(async {
            signal_install(watcher_token);
            program.run().await
          })
        })) {
          Ok(result) => RunOutcome::Finished(result),
          Err(payload) => RunOutcome::Panicked(panic_payload(payload)),
        };
        let _ = done_tx.send(outcome);
      });

    let thread = match thread {
      Ok(thread) => thread,
      Err(e) => {
        record.unbind_program();
        *self.current.lock() = None;
        return Err(TheErr::ProgramFailed(e.to_string()));
      }
    };

    // Service script callbacks until the renderer thread reports back.
    let outcome = js_loop.serve_until(scope, &done_rx);
    let _ = thread.join();

    record.unbind_program();
    run_token.cancel();
    *self.current.lock() = None;
    drop(hook_guard);

    match outcome? {
      RunOutcome::Finished(Ok(())) => Ok(()),
      RunOutcome::Finished(Err(e)) => {
        let message = e.to_string();
        self.write_error(&format!("program failed: {message}"));
        Err(TheErr::ProgramFailed(message))
      }
      RunOutcome::Panicked(payload) => {
        // Restore the terminal before any logging of the panic.
        if interactive {
          if let Some(output) = &self.output {
            let mut output = output.clone();
            terminal::restore(&mut output, saved);
          }
        }
        let report = panic_report
          .lock()
          .take()
          .unwrap_or_else(|| payload.clone());
        self.write_error(&format!("BT007: panic recovered: {payload}\n{report}"));
        Err(TheErr::Panic(payload))
      }
    }
  }

  fn write_error(&self, message: &str) {
    error!("{message}");
    match &self.error {
      Some(error) => {
        let mut error = error.clone();
        let _ = writeln!(error, "{message}");
      }
      None => eprintln!("{message}"),
    }
  }
}

/// Default signal wiring: any installed signal requests an idempotent quit.
fn install_signal_watcher(quit: CancellationToken) {
  tokio::spawn(async move {
    wait_for_signal(&quit).await;
    quit.cancel();
  });
}

#[cfg(unix)]
async fn wait_for_signal(quit: &CancellationToken) {
  use tokio::signal::unix::SignalKind;
  use tokio::signal::unix::signal;

  let interrupt = signal(SignalKind::interrupt());
  let terminate = signal(SignalKind::terminate());
  let quit_signal = signal(SignalKind::quit());
  let (Ok(mut interrupt), Ok(mut terminate), Ok(mut quit_signal)) =
    (interrupt, terminate, quit_signal)
  else {
    error!("Failed to install signal handlers");
    return quit.cancelled().await;
  };

  tokio::select! {
    _ = interrupt.recv() => trace!("Recv SIGINT"),
    _ = terminate.recv() => trace!("Recv SIGTERM"),
    _ = quit_signal.recv() => trace!("Recv SIGQUIT"),
    _ = quit.cancelled() => {}
  }
}

#[cfg(windows)]
async fn wait_for_signal(quit: &CancellationToken) {
  tokio::select! {
    _ = tokio::signal::ctrl_c() => trace!("Recv ctrl-c"),
    _ = quit.cancelled() => {}
  }
}
