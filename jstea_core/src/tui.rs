//! The terminal renderer.
//!
//! The bridge consumes this module only through [`Program`],
//! [`ProgramHandle`] and [`Cmd`]; everything else is renderer detail.

pub mod cmd;
pub mod event;
pub mod key;
pub mod mouse;
pub mod program;
pub mod terminal;

#[cfg(test)]
mod program_tests;

pub use cmd::Cmd;
pub use program::{
  InputSource, Program, ProgramHandle, ProgramModel, ProgramOptions,
};
