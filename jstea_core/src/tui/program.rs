//! The renderer run loop.

use crate::msg::Msg;
use crate::prelude::*;
use crate::tui::cmd::Cmd;
use crate::tui::event::event_to_msg;
use crate::tui::terminal;
use crate::tui::terminal::TerminalState;
use crossterm::cursor;
use crossterm::event::DisableBracketedPaste;
use crossterm::event::DisableFocusChange;
use crossterm::event::EnableBracketedPaste;
use crossterm::event::EnableFocusChange;
use crossterm::event::EnableMouseCapture;
use crossterm::event::Event;
use crossterm::event::EventStream;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::Clear;
use crossterm::terminal::ClearType;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use crossterm::terminal::SetTitle;
use futures::StreamExt;
use futures::future::BoxFuture;
use std::io::Write;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// The model lifecycle contract the renderer drives.
///
/// `init` runs once before the first message, `update` once per message,
/// `view` after every processed message. All three run on the renderer
/// thread.
pub trait ProgramModel: Send {
  fn init(&mut self) -> Option<Cmd>;
  fn update(&mut self, msg: Msg) -> Option<Cmd>;
  fn view(&mut self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where terminal events come from.
pub enum InputSource {
  /// Poll the controlling terminal.
  Tty,
  /// No terminal events, messages arrive only through the inbox.
  Null,
}

#[derive(Debug, Clone)]
/// Renderer construction options.
pub struct ProgramOptions {
  pub alt_screen: bool,
  /// Report all mouse motion.
  pub mouse: bool,
  /// Report mouse motion only while a button is held.
  pub mouse_cell_motion: bool,
  pub report_focus: bool,
  pub bracketed_paste: bool,
  pub input: InputSource,
}

impl Default for ProgramOptions {
  fn default() -> Self {
    ProgramOptions {
      alt_screen: false,
      mouse: false,
      mouse_cell_motion: false,
      report_focus: false,
      bracketed_paste: true,
      input: InputSource::Tty,
    }
  }
}

#[derive(Debug, Clone)]
/// Thread-safe handle to a running program.
///
/// `send` is a no-op after the program exits, `quit` is idempotent.
pub struct ProgramHandle {
  inbox: UnboundedSender<Msg>,
  quit_token: CancellationToken,
  rt: tokio::runtime::Handle,
  tracker: TaskTracker,
}

impl ProgramHandle {
  pub fn send(&self, msg: Msg) -> bool {
    self.inbox.send(msg).is_ok()
  }

  pub fn quit(&self) {
    self.quit_token.cancel();
  }

  pub fn cancelled_token(&self) -> &CancellationToken {
    &self.quit_token
  }

  pub fn runtime(&self) -> &tokio::runtime::Handle {
    &self.rt
  }

  /// Spawns a task tied to the program's lifetime.
  pub fn spawn<F>(&self, fut: F)
  where
    F: std::future::Future<Output = ()> + Send + 'static,
  {
    let _ = self.tracker.spawn_on(fut, &self.rt);
  }
}

#[derive(Clone)]
/// What a spawned command task needs to do its job.
struct CmdContext {
  inbox: UnboundedSender<Msg>,
  cmds: UnboundedSender<Cmd>,
  quit_token: CancellationToken,
}

fn unix_now_millis() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}

/// Executes one command asynchronously. Batches fan out concurrently,
/// sequences await one element at a time, nested structure preserved.
/// Synchronous screen commands are posted back to the renderer loop.
fn run_cmd(cmd: Cmd, ctx: CmdContext) -> BoxFuture<'static, ()> {
  Box::pin(async move {
    match cmd {
      Cmd::Tick { duration, id } => {
        tokio::select! {
          _ = tokio::time::sleep(duration) => {
            let _ = ctx.inbox.send(Msg::Tick {
              id,
              time_ms: unix_now_millis(),
            });
          }
          _ = ctx.quit_token.cancelled() => {}
        }
      }
      Cmd::Batch(cmds) => {
        let tasks = cmds.into_iter().map(|c| run_cmd(c, ctx.clone()));
        futures::future::join_all(tasks).await;
      }
      Cmd::Sequence(cmds) => {
        for c in cmds {
          run_cmd(c, ctx.clone()).await;
        }
      }
      other => {
        let _ = ctx.cmds.send(other);
      }
    }
  })
}

/// The renderer: one event loop over terminal input, the message inbox and
/// spawned command tasks, rendering the model's view after every message.
pub struct Program {
  model: Box<dyn ProgramModel>,
  options: ProgramOptions,
  output: Box<dyn Write + Send>,
  saved: TerminalState,

  inbox_tx: UnboundedSender<Msg>,
  inbox_rx: UnboundedReceiver<Msg>,
  cmd_tx: UnboundedSender<Cmd>,
  cmd_rx: UnboundedReceiver<Cmd>,
  quit_token: CancellationToken,
  tracker: TaskTracker,

  interactive: bool,
  alt_active: bool,
  last_view: String,
}

impl Program {
  pub fn new(
    model: Box<dyn ProgramModel>,
    options: ProgramOptions,
    output: Box<dyn Write + Send>,
    saved: TerminalState,
    quit_token: CancellationToken,
  ) -> Self {
    let (inbox_tx, inbox_rx) = unbounded_channel();
    let (cmd_tx, cmd_rx) = unbounded_channel();
    let interactive = options.input == InputSource::Tty;
    Program {
      model,
      options,
      output,
      saved,
      inbox_tx,
      inbox_rx,
      cmd_tx,
      cmd_rx,
      quit_token,
      tracker: TaskTracker::new(),
      interactive,
      alt_active: false,
      last_view: String::new(),
    }
  }

  /// Builds the thread-safe handle, `rt` being the runtime the loop runs on.
  pub fn handle(&self, rt: tokio::runtime::Handle) -> ProgramHandle {
    ProgramHandle {
      inbox: self.inbox_tx.clone(),
      quit_token: self.quit_token.clone(),
      rt,
      tracker: self.tracker.clone(),
    }
  }

  fn cmd_context(&self) -> CmdContext {
    CmdContext {
      inbox: self.inbox_tx.clone(),
      cmds: self.cmd_tx.clone(),
      quit_token: self.quit_token.clone(),
    }
  }

  /// Runs the loop until a quit command, a quit message or cancellation.
  pub async fn run(&mut self) -> AnyResult<()> {
    self.enter_terminal()?;

    if self.interactive {
      if let Ok((width, height)) = crossterm::terminal::size() {
        let _ = self.inbox_tx.send(Msg::WindowSize { width, height });
      }
    }

    if let Some(cmd) = self.model.init() {
      self.exec_cmd(cmd);
    }
    self.render()?;

    let mut reader = match self.options.input {
      InputSource::Tty => Some(EventStream::new()),
      InputSource::Null => None,
    };

    loop {
      tokio::select! {
        event = next_event(&mut reader) => {
          match event {
            Some(Ok(event)) => {
              if self.process_event(event) {
                break;
              }
            }
            Some(Err(e)) => {
              error!("Polled terminal event error: {e:?}");
            }
            None => {
              error!("Terminal event stream is exhausted");
              break;
            }
          }
        }
        msg = self.inbox_rx.recv() => {
          match msg {
            Some(msg) => {
              if self.process_msg(msg) {
                break;
              }
            }
            None => break,
          }
        }
        cmd = self.cmd_rx.recv() => {
          if let Some(cmd) = cmd {
            self.apply_screen_cmd(cmd);
          }
        }
        _ = self.quit_token.cancelled() => {
          break;
        }
      }

      self.render()?;
    }

    // Final frame, then wind down spawned command tasks.
    self.render()?;
    self.quit_token.cancel();
    self.tracker.close();
    self.tracker.wait().await;

    self.exit_terminal();
    Ok(())
  }

  fn process_event(&mut self, event: Event) -> bool {
    trace!("Polled terminal event: {event:?}");
    match event_to_msg(event) {
      Some(msg) => self.process_msg(msg),
      None => false,
    }
  }

  /// Feeds one message through `update`. Returns true when the loop should
  /// stop.
  fn process_msg(&mut self, msg: Msg) -> bool {
    if matches!(msg, Msg::Quit) {
      return true;
    }
    if matches!(msg, Msg::ClearScreen) {
      self.clear_screen();
    }
    if let Some(cmd) = self.model.update(msg) {
      self.exec_cmd(cmd);
    }
    self.quit_token.is_cancelled()
  }

  fn exec_cmd(&mut self, cmd: Cmd) {
    trace!("Exec command: {cmd:?}");
    match cmd {
      Cmd::Tick { .. } | Cmd::Batch(_) | Cmd::Sequence(_) => {
        let ctx = self.cmd_context();
        let _ = self.tracker.spawn(run_cmd(cmd, ctx));
      }
      other => self.apply_screen_cmd(other),
    }
  }

  /// Applies a synchronous command on the renderer thread.
  fn apply_screen_cmd(&mut self, cmd: Cmd) {
    match cmd {
      Cmd::Quit => self.quit_token.cancel(),
      Cmd::ClearScreen => self.clear_screen(),
      Cmd::HideCursor => self.queue_interactive(|out| {
        queue!(out, cursor::Hide)
      }),
      Cmd::ShowCursor => self.queue_interactive(|out| {
        queue!(out, cursor::Show)
      }),
      Cmd::EnterAltScreen => {
        if self.interactive && !self.alt_active {
          let _ = crossterm::execute!(
            self.output,
            EnterAlternateScreen,
            Clear(ClearType::All),
            cursor::MoveTo(0, 0)
          );
          self.alt_active = true;
          self.last_view.clear();
        }
      }
      Cmd::ExitAltScreen => {
        if self.interactive && self.alt_active {
          let _ = crossterm::execute!(self.output, LeaveAlternateScreen);
          self.alt_active = false;
          self.last_view.clear();
        }
      }
      Cmd::EnableBracketedPaste => self.queue_interactive(|out| {
        queue!(out, EnableBracketedPaste)
      }),
      Cmd::DisableBracketedPaste => self.queue_interactive(|out| {
        queue!(out, DisableBracketedPaste)
      }),
      Cmd::EnableReportFocus => self.queue_interactive(|out| {
        queue!(out, EnableFocusChange)
      }),
      Cmd::DisableReportFocus => self.queue_interactive(|out| {
        queue!(out, DisableFocusChange)
      }),
      Cmd::WindowSize => {
        if self.interactive {
          if let Ok((width, height)) = crossterm::terminal::size() {
            let _ = self.inbox_tx.send(Msg::WindowSize { width, height });
          }
        }
      }
      Cmd::SetWindowTitle(title) => self.queue_interactive(move |out| {
        queue!(out, SetTitle(title))
      }),
      Cmd::Tick { .. } | Cmd::Batch(_) | Cmd::Sequence(_) => {
        // Async commands posted back from a task context.
        let ctx = self.cmd_context();
        let _ = self.tracker.spawn(run_cmd(cmd, ctx));
      }
    }
  }

  fn queue_interactive<F>(&mut self, f: F)
  where
    F: FnOnce(&mut Box<dyn Write + Send>) -> IoResult<()>,
  {
    if self.interactive {
      if let Err(e) = f(&mut self.output).and_then(|_| self.output.flush()) {
        error!("Terminal command failed: {e:?}");
      }
    }
  }

  fn clear_screen(&mut self) {
    if self.interactive {
      let _ = crossterm::execute!(
        self.output,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0)
      );
    }
    self.last_view.clear();
  }

  /// Renders the current view if it changed since the last frame.
  fn render(&mut self) -> AnyResult<()> {
    let view = self.model.view();
    if view == self.last_view {
      return Ok(());
    }

    if self.interactive {
      if self.alt_active {
        queue!(
          self.output,
          cursor::MoveTo(0, 0),
          Clear(ClearType::FromCursorDown)
        )?;
      } else {
        let prev_lines = self.last_view.lines().count() as u16;
        queue!(self.output, cursor::MoveToColumn(0))?;
        if prev_lines > 1 {
          queue!(self.output, cursor::MoveUp(prev_lines - 1))?;
        }
        queue!(self.output, Clear(ClearType::FromCursorDown))?;
      }

      let mut first = true;
      for line in view.lines() {
        if !first {
          queue!(self.output, Print("\r\n"))?;
        }
        queue!(self.output, Print(line))?;
        first = false;
      }
      self.output.flush()?;
    }

    self.last_view = view;
    Ok(())
  }

  fn enter_terminal(&mut self) -> AnyResult<()> {
    if !self.interactive {
      return Ok(());
    }
    crossterm::terminal::enable_raw_mode()?;
    queue!(self.output, cursor::Hide)?;
    if self.options.alt_screen {
      queue!(
        self.output,
        EnterAlternateScreen,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0)
      )?;
      self.alt_active = true;
    }
    if self.options.mouse || self.options.mouse_cell_motion {
      queue!(self.output, EnableMouseCapture)?;
    }
    if self.options.report_focus {
      queue!(self.output, EnableFocusChange)?;
    }
    if self.options.bracketed_paste {
      queue!(self.output, EnableBracketedPaste)?;
    }
    self.output.flush()?;
    Ok(())
  }

  fn exit_terminal(&mut self) {
    if !self.interactive {
      return;
    }
    terminal::restore(&mut *self.output, self.saved);
  }
}

async fn next_event(
  reader: &mut Option<EventStream>,
) -> Option<IoResult<Event>> {
  match reader {
    Some(reader) => reader.next().await,
    None => std::future::pending().await,
  }
}
