//! Render throttling.
//!
//! Rate-limits script `view` invocations to one per interval. When a view is
//! suppressed, a single-shot sleeper is armed that posts `RenderRefresh`
//! into the program's inbox, so the last state always gets rendered. The
//! sleeper here is the only producer of `RenderRefresh`.

use crate::bridge::registry::ModelRecord;
use crate::msg::Msg;
use crate::msg::MsgKind;
use crate::prelude::*;
use std::time::Duration;
use std::time::Instant;

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone)]
pub struct ThrottleConfig {
  pub enabled: bool,
  pub min_interval: Duration,
  /// Message kinds whose updates always render, bypassing the throttle.
  pub always_render: HashSet<MsgKind>,
}

impl Default for ThrottleConfig {
  fn default() -> Self {
    let mut always_render = HashSet::new();
    always_render.insert(MsgKind::Tick);
    always_render.insert(MsgKind::WindowSize);
    ThrottleConfig {
      enabled: false,
      min_interval: DEFAULT_MIN_INTERVAL,
      always_render,
    }
  }
}

#[derive(Debug, Default)]
pub struct ThrottleState {
  pub config: ThrottleConfig,
  pub cached_view: String,
  pub last_render: Option<Instant>,
  pub force_next: bool,
  pub timer_armed: bool,
}

/// What a `view` call should do.
pub enum ViewGate {
  /// Run the script view.
  Render,
  /// Suppressed; return the cached view.
  Cached(String),
}

/// The throttle decision. On suppression, arms the deferred refresh if no
/// timer is armed yet, a program is bound and its run is still live.
pub fn gate_view(record: &ModelRecord) -> ViewGate {
  let mut throttle = record.throttle.lock();
  let now = Instant::now();
  let elapsed = throttle.last_render.map(|at| now.duration_since(at));

  let throttled = throttle.config.enabled
    && !throttle.force_next
    && matches!(elapsed, Some(e) if e < throttle.config.min_interval)
    && !throttle.cached_view.is_empty();

  if !throttled {
    throttle.force_next = false;
    throttle.last_render = Some(now);
    return ViewGate::Render;
  }

  if !throttle.timer_armed {
    if let Some(handle) = record.program() {
      let token = handle.cancelled_token().clone();
      if !token.is_cancelled() {
        throttle.timer_armed = true;
        let remaining = throttle.config.min_interval - elapsed.unwrap();
        trace!("Arm render refresh in {remaining:?}");
        let sender = handle.clone();
        handle.spawn(async move {
          tokio::select! {
            _ = tokio::time::sleep(remaining) => {
              sender.send(Msg::RenderRefresh);
            }
            _ = token.cancelled() => {}
          }
        });
      }
    }
  }

  ViewGate::Cached(throttle.cached_view.clone())
}

pub fn store_view(record: &ModelRecord, view: &str) {
  record.throttle.lock().cached_view = view.to_string();
}

/// The armed refresh landed: let the next view through.
pub fn on_render_refresh(record: &ModelRecord) {
  let mut throttle = record.throttle.lock();
  throttle.timer_armed = false;
  throttle.force_next = true;
}

/// Bypass the throttle for the next view if `kind` is configured to always
/// render.
pub fn mark_always_render(record: &ModelRecord, kind: MsgKind) {
  let mut throttle = record.throttle.lock();
  if throttle.config.always_render.contains(&kind) {
    throttle.force_next = true;
  }
}
