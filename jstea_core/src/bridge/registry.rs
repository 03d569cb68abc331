//! Registered model records.

use crate::bridge::throttle::ThrottleState;
use crate::prelude::*;
use crate::tui::ProgramHandle;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::AtomicI32;
use std::sync::atomic::Ordering;

pub type ModelId = i32;

/// The thread-shared half of a registered model. The script-side callables
/// and state live with the runtime state on the script thread, keyed by the
/// same id.
pub struct ModelRecord {
  id: ModelId,
  /// Guarded by its own lock, accessed from the renderer thread and the
  /// refresh sleeper.
  pub throttle: Mutex<ThrottleState>,
  init_error: Mutex<Option<String>>,
  program: Mutex<Option<ProgramHandle>>,
}

impl ModelRecord {
  pub fn id(&self) -> ModelId {
    self.id
  }

  /// The bound running program, if any.
  pub fn program(&self) -> Option<ProgramHandle> {
    self.program.lock().clone()
  }

  pub fn bind_program(&self, handle: ProgramHandle) {
    *self.program.lock() = Some(handle);
  }

  pub fn unbind_program(&self) {
    *self.program.lock() = None;
  }

  pub fn init_error(&self) -> Option<String> {
    self.init_error.lock().clone()
  }

  pub fn set_init_error(&self, error: String) {
    *self.init_error.lock() = Some(error);
  }
}

/// Id-indexed registry of model records, one per `newModel` invocation,
/// owned for the life of the bridge.
pub struct ModelRegistry {
  models: Mutex<HashMap<ModelId, Arc<ModelRecord>>>,
  next_id: AtomicI32,
}

impl Default for ModelRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl ModelRegistry {
  pub fn new() -> Self {
    ModelRegistry {
      models: Mutex::new(HashMap::new()),
      next_id: AtomicI32::new(1),
    }
  }

  pub fn insert(&self, throttle: ThrottleState) -> Arc<ModelRecord> {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    let record = Arc::new(ModelRecord {
      id,
      throttle: Mutex::new(throttle),
      init_error: Mutex::new(None),
      program: Mutex::new(None),
    });
    self.models.lock().insert(id, record.clone());
    record
  }

  pub fn get(&self, id: ModelId) -> Option<Arc<ModelRecord>> {
    self.models.lock().get(&id).cloned()
  }

  pub fn len(&self) -> usize {
    self.models.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.models.lock().is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bridge::throttle::ThrottleState;

  #[test]
  fn insert1() {
    let registry = ModelRegistry::new();
    assert!(registry.is_empty());

    let record = registry.insert(ThrottleState::default());
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get(record.id()).unwrap().id(), record.id());
    assert!(registry.get(record.id() + 1).is_none());
  }

  #[test]
  fn init_error1() {
    let registry = ModelRegistry::new();
    let record = registry.insert(ThrottleState::default());
    assert!(record.init_error().is_none());
    record.set_init_error("boom".to_string());
    assert_eq!(record.init_error().unwrap(), "boom");
  }
}
