//! Terminal-UI programs scripted in JavaScript.

use clap::Parser;
use jstea_core::bridge::manager::BridgeStreams;
use jstea_core::bridge::manager::ProgramManager;
use jstea_core::bridge::registry::ModelRegistry;
use jstea_core::cli::CliOptions;
use jstea_core::evloop::JsLoop;
use jstea_core::js;
use jstea_core::js::JsRuntime;
use jstea_core::log as logging;
use log::debug;
use std::process::ExitCode;
use std::rc::Rc;
use std::sync::Arc;

fn main() -> ExitCode {
  logging::init();
  let cli_opts = CliOptions::parse();
  debug!("Cli options: {cli_opts:?}");

  let source = match std::fs::read_to_string(cli_opts.file()) {
    Ok(source) => source,
    Err(e) => {
      eprintln!("jstea: cannot read {:?}: {e}", cli_opts.file());
      return ExitCode::FAILURE;
    }
  };

  js::init_v8_platform();

  let streams = if cli_opts.headless() {
    BridgeStreams::None
  } else {
    BridgeStreams::Stdio
  };

  // The main thread owns the isolate and doubles as the script event loop;
  // renderer threads are spawned per program run.
  let js_loop = Rc::new(JsLoop::new());
  let manager = Arc::new(ProgramManager::new(streams));
  let registry = Arc::new(ModelRegistry::new());
  let mut runtime = JsRuntime::new(js_loop, manager, registry);

  let filename = cli_opts.file().to_string_lossy().to_string();
  match runtime.execute_script(&filename, &source) {
    Ok(_) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("jstea: {e}");
      ExitCode::FAILURE
    }
  }
}
