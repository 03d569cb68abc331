//! Command line options.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
  name = "jstea",
  about = "Terminal-UI script host for javascript programs"
)]
/// Command line options for the `jstea` binary.
pub struct CliOptions {
  /// The javascript file to run.
  pub file: PathBuf,

  /// Run without taking over the terminal, for non-interactive use.
  #[arg(long)]
  pub headless: bool,
}

impl CliOptions {
  pub fn new(file: PathBuf, headless: bool) -> Self {
    CliOptions { file, headless }
  }

  pub fn file(&self) -> &PathBuf {
    &self.file
  }

  pub fn headless(&self) -> bool {
    self.headless
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse1() {
    let opts = CliOptions::parse_from(["jstea", "app.js"]);
    assert_eq!(opts.file(), &PathBuf::from("app.js"));
    assert!(!opts.headless());
  }

  #[test]
  fn parse2() {
    let opts = CliOptions::parse_from(["jstea", "--headless", "app.js"]);
    assert!(opts.headless());
  }
}
