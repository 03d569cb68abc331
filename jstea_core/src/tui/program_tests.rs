use super::cmd::Cmd;
use super::program::*;
use crate::msg::KeyMsg;
use crate::msg::Msg;
use crate::test::log::init as test_log_init;
use crate::tui::terminal;
use compact_str::ToCompactString;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn null_options() -> ProgramOptions {
  ProgramOptions {
    input: InputSource::Null,
    ..Default::default()
  }
}

fn key(name: &str) -> Msg {
  Msg::Key(KeyMsg {
    runes: name.to_compact_string(),
    name: name.to_compact_string(),
    alt: false,
    ctrl: false,
    paste: false,
  })
}

struct QuitOnQ {
  updates: Arc<AtomicUsize>,
}

impl ProgramModel for QuitOnQ {
  fn init(&mut self) -> Option<Cmd> {
    None
  }

  fn update(&mut self, msg: Msg) -> Option<Cmd> {
    self.updates.fetch_add(1, Ordering::SeqCst);
    match msg {
      Msg::Key(k) if k.name == "q" => Some(Cmd::Quit),
      _ => None,
    }
  }

  fn view(&mut self) -> String {
    "bye".to_string()
  }
}

#[tokio::test]
async fn quit_on_key1() {
  test_log_init();
  let updates = Arc::new(AtomicUsize::new(0));
  let mut program = Program::new(
    Box::new(QuitOnQ {
      updates: updates.clone(),
    }),
    null_options(),
    Box::new(std::io::sink()),
    terminal::snapshot(),
    CancellationToken::new(),
  );
  let handle = program.handle(tokio::runtime::Handle::current());

  assert!(handle.send(key("q")));
  tokio::time::timeout(Duration::from_millis(100), program.run())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn quit_token1() {
  test_log_init();
  let token = CancellationToken::new();
  let mut program = Program::new(
    Box::new(QuitOnQ {
      updates: Arc::new(AtomicUsize::new(0)),
    }),
    null_options(),
    Box::new(std::io::sink()),
    terminal::snapshot(),
    token.clone(),
  );
  token.cancel();
  tokio::time::timeout(Duration::from_millis(100), program.run())
    .await
    .unwrap()
    .unwrap();
}

struct TickModel {
  seen: Arc<Mutex<Vec<(String, u64)>>>,
  limit: usize,
  startup: Vec<Cmd>,
}

impl ProgramModel for TickModel {
  fn init(&mut self) -> Option<Cmd> {
    let cmds = std::mem::take(&mut self.startup);
    Some(Cmd::Batch(cmds))
  }

  fn update(&mut self, msg: Msg) -> Option<Cmd> {
    if let Msg::Tick { id, time_ms } = msg {
      let mut seen = self.seen.lock();
      seen.push((id.to_string(), time_ms));
      if seen.len() >= self.limit {
        return Some(Cmd::Quit);
      }
    }
    None
  }

  fn view(&mut self) -> String {
    String::new()
  }
}

#[tokio::test]
async fn tick1() {
  test_log_init();
  let seen = Arc::new(Mutex::new(vec![]));
  let mut program = Program::new(
    Box::new(TickModel {
      seen: seen.clone(),
      limit: 1,
      startup: vec![Cmd::Tick {
        duration: Duration::from_millis(16),
        id: "gameTick".to_compact_string(),
      }],
    }),
    null_options(),
    Box::new(std::io::sink()),
    terminal::snapshot(),
    CancellationToken::new(),
  );
  tokio::time::timeout(Duration::from_secs(1), program.run())
    .await
    .unwrap()
    .unwrap();

  let seen = seen.lock();
  assert_eq!(seen.len(), 1);
  assert_eq!(seen[0].0, "gameTick");
  assert!(seen[0].1 > 0);
}

#[tokio::test]
async fn sequence_preserves_order1() {
  test_log_init();
  let seen = Arc::new(Mutex::new(vec![]));
  // In a sequence the slower first tick must land before the faster second.
  let mut program = Program::new(
    Box::new(TickModel {
      seen: seen.clone(),
      limit: 2,
      startup: vec![Cmd::Sequence(vec![
        Cmd::Tick {
          duration: Duration::from_millis(30),
          id: "first".to_compact_string(),
        },
        Cmd::Tick {
          duration: Duration::from_millis(5),
          id: "second".to_compact_string(),
        },
      ])],
    }),
    null_options(),
    Box::new(std::io::sink()),
    terminal::snapshot(),
    CancellationToken::new(),
  );
  tokio::time::timeout(Duration::from_secs(1), program.run())
    .await
    .unwrap()
    .unwrap();

  let seen = seen.lock();
  let ids: Vec<&str> = seen.iter().map(|(id, _)| id.as_str()).collect();
  assert_eq!(ids, ["first", "second"]);
}

#[tokio::test]
async fn batch_runs_concurrently1() {
  test_log_init();
  let seen = Arc::new(Mutex::new(vec![]));
  // Batched ticks race independently, the faster one lands first.
  let mut program = Program::new(
    Box::new(TickModel {
      seen: seen.clone(),
      limit: 2,
      startup: vec![Cmd::Batch(vec![
        Cmd::Tick {
          duration: Duration::from_millis(50),
          id: "slow".to_compact_string(),
        },
        Cmd::Tick {
          duration: Duration::from_millis(5),
          id: "fast".to_compact_string(),
        },
      ])],
    }),
    null_options(),
    Box::new(std::io::sink()),
    terminal::snapshot(),
    CancellationToken::new(),
  );
  tokio::time::timeout(Duration::from_secs(1), program.run())
    .await
    .unwrap()
    .unwrap();

  let seen = seen.lock();
  let ids: Vec<&str> = seen.iter().map(|(id, _)| id.as_str()).collect();
  assert_eq!(ids, ["fast", "slow"]);
}

struct RecordKeys {
  seen: Arc<Mutex<Vec<Msg>>>,
}

impl ProgramModel for RecordKeys {
  fn init(&mut self) -> Option<Cmd> {
    None
  }

  fn update(&mut self, msg: Msg) -> Option<Cmd> {
    if matches!(msg, Msg::StateRefresh { .. }) {
      self.seen.lock().push(msg);
      return Some(Cmd::Quit);
    }
    self.seen.lock().push(msg);
    None
  }

  fn view(&mut self) -> String {
    String::new()
  }
}

#[tokio::test]
async fn state_refresh_delivered1() {
  test_log_init();
  let seen = Arc::new(Mutex::new(vec![]));
  let mut program = Program::new(
    Box::new(RecordKeys { seen: seen.clone() }),
    null_options(),
    Box::new(std::io::sink()),
    terminal::snapshot(),
    CancellationToken::new(),
  );
  let handle = program.handle(tokio::runtime::Handle::current());
  handle.send(Msg::StateRefresh {
    key: "cursor".to_string(),
  });
  tokio::time::timeout(Duration::from_millis(200), program.run())
    .await
    .unwrap()
    .unwrap();

  let seen = seen.lock();
  assert_eq!(
    *seen,
    vec![Msg::StateRefresh {
      key: "cursor".to_string()
    }]
  );
}
