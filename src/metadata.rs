// src/metadata.rs

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// String-keyed store of arbitrary typed per-session state.
///
/// Values are kept as `Arc<dyn Any>` and recovered by downcast, so callers can
/// attach whatever the upgrade layer or handlers need (user ids, auth claims,
/// counters) without the session knowing the types. Reads vastly outnumber
/// writes, hence the reader/writer lock.
#[derive(Default, Clone)]
pub struct Metadata {
  inner: Arc<RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>>,
}

// Values are opaque; show only the keys.
impl std::fmt::Debug for Metadata {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let guard = self.inner.read();
    f.debug_struct("Metadata")
      .field("keys", &guard.keys().collect::<Vec<_>>())
      .finish()
  }
}

impl Metadata {
  pub fn new() -> Self {
    Self::default()
  }

  /// Stores `value` under `key`, replacing any previous value.
  pub fn insert<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
    self.inner.write().insert(key.into(), Arc::new(value));
  }

  /// Retrieves the value under `key`, if present and of type `T`.
  pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
    let guard = self.inner.read();
    let entry = guard.get(key)?.clone();
    drop(guard);
    entry.downcast::<T>().ok()
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.inner.read().contains_key(key)
  }

  /// Removes the value under `key`, returning whether one was present.
  pub fn remove(&self, key: &str) -> bool {
    self.inner.write().remove(key).is_some()
  }

  pub fn len(&self) -> usize {
    self.inner.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.read().is_empty()
  }
}
