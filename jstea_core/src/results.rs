//! Results and errors.

use thiserror::Error as ThisError;

// anyhow {

/// [`anyhow::Error`]
pub type AnyErr = anyhow::Error;

/// [`anyhow::Result`] with `T` if ok, [`AnyErr`]([`anyhow::Error`]) if error.
pub type AnyResult<T> = anyhow::Result<T>;

// anyhow }

// std::io {

/// [`std::io::Error`]
pub type IoErr = std::io::Error;

/// [`std::io::ErrorKind`]
pub type IoErrKind = std::io::ErrorKind;

/// [`std::io::Result`] with `T` if ok.
pub type IoResult<T> = std::io::Result<T>;

// std::io }

// Bridge {

#[derive(Debug, Clone, ThisError)]
/// Error code implemented by [`thiserror::Error`].
///
/// Variants that surface to scripts carry a stable `BT` code, see
/// [`TheErr::code`].
pub enum TheErr {
  /// Tick command with a missing or non-positive duration.
  #[error("invalid duration: {0}")]
  InvalidDuration(i64),

  /// The renderer program failed to start or exited with an error.
  #[error("program execution failed: {0}")]
  ProgramFailed(String),

  /// A program is already running on this manager.
  #[error("program execution failed: already running")]
  AlreadyRunning,

  /// The value passed where a model wrapper was expected is not one.
  #[error("invalid model: {0}")]
  InvalidModel(String),

  /// A facade function received arguments it cannot work with.
  #[error("invalid arguments: {0}")]
  InvalidArguments(String),

  /// A panic was recovered during a program run.
  #[error("panic recovered: {0}")]
  Panic(String),

  /// The script event loop stopped before the scheduled callback ran.
  #[error("event loop stopped")]
  EventLoopStopped,

  /// A script callable raised inside a marshalled callback.
  #[error("script error: {0}")]
  ScriptRaised(String),
}

impl TheErr {
  /// The stable script-visible error code.
  pub fn code(&self) -> &'static str {
    match self {
      TheErr::InvalidDuration(_) => "BT001",
      TheErr::ProgramFailed(_) | TheErr::AlreadyRunning => "BT004",
      TheErr::InvalidModel(_) => "BT005",
      TheErr::InvalidArguments(_) => "BT006",
      TheErr::Panic(_) => "BT007",
      // Infrastructure failures surface to scripts as a failed run.
      TheErr::EventLoopStopped | TheErr::ScriptRaised(_) => "BT004",
    }
  }
}

/// [`std::result::Result`] with `T` if ok, [`TheErr`] if error.
pub type TheResult<T> = std::result::Result<T, TheErr>;

// Bridge }
