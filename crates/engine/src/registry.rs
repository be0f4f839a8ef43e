use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use monitor_core::{MonitorError, MonitorResult};
use tokio::sync::Mutex;

use crate::state::EntityHandle;

/// Removed ids remembered so their health can still be reported.
const TOMBSTONE_CAPACITY: usize = 1024;

/// Result of registering an entity id.
pub enum AddOutcome {
    Created(Arc<EntityHandle>),
    AlreadyExists(Arc<EntityHandle>),
}

impl AddOutcome {
    pub fn handle(&self) -> &Arc<EntityHandle> {
        match self {
            AddOutcome::Created(handle) | AddOutcome::AlreadyExists(handle) => handle,
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    entities: HashMap<String, Arc<EntityHandle>>,
    tombstones: VecDeque<String>,
    closed: bool,
}

impl RegistryInner {
    fn forget_tombstone(&mut self, entity_id: &str) {
        self.tombstones.retain(|id| id != entity_id);
    }

    fn push_tombstone(&mut self, entity_id: String) {
        self.forget_tombstone(&entity_id);
        if self.tombstones.len() == TOMBSTONE_CAPACITY {
            self.tombstones.pop_front();
        }
        self.tombstones.push_back(entity_id);
    }
}

/// The set of monitored entities. All mutations are serialized by one lock,
/// so concurrent adds of the same id yield exactly one handle.
pub struct EntityRegistry {
    inner: Mutex<RegistryInner>,
    max_entities: usize,
}

impl EntityRegistry {
    pub fn new(max_entities: usize) -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
            max_entities,
        }
    }

    /// Registers `entity_id`, building its handle with `create` only if the
    /// id is new. Fails with `EngineStopped` once the registry is drained.
    pub async fn add<F>(&self, entity_id: &str, create: F) -> MonitorResult<AddOutcome>
    where
        F: FnOnce() -> EntityHandle,
    {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(MonitorError::EngineStopped);
        }
        if let Some(existing) = inner.entities.get(entity_id) {
            return Ok(AddOutcome::AlreadyExists(existing.clone()));
        }
        if inner.entities.len() >= self.max_entities {
            return Err(MonitorError::CapacityExceeded {
                limit: self.max_entities,
            });
        }

        let handle = Arc::new(create());
        inner.forget_tombstone(entity_id);
        inner
            .entities
            .insert(entity_id.to_string(), handle.clone());
        Ok(AddOutcome::Created(handle))
    }

    /// Cancels and unregisters `entity_id`. Returns whether it was registered.
    pub async fn remove(&self, entity_id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.entities.remove(entity_id) {
            Some(handle) => {
                handle.cancel();
                inner.push_tombstone(entity_id.to_string());
                true
            }
            None => false,
        }
    }

    /// Removes `entity_id` only while it still maps to `handle`, so a task
    /// of an old registration can never remove a newer one.
    pub async fn remove_if_current(&self, entity_id: &str, handle: &Arc<EntityHandle>) -> bool {
        let mut inner = self.inner.lock().await;
        let is_current = inner
            .entities
            .get(entity_id)
            .is_some_and(|current| Arc::ptr_eq(current, handle));
        if !is_current {
            return false;
        }

        inner.entities.remove(entity_id);
        handle.cancel();
        inner.push_tombstone(entity_id.to_string());
        true
    }

    pub async fn get(&self, entity_id: &str) -> Option<Arc<EntityHandle>> {
        self.inner.lock().await.entities.get(entity_id).cloned()
    }

    /// Registered handles ordered by registration time.
    pub async fn list(&self) -> Vec<Arc<EntityHandle>> {
        let inner = self.inner.lock().await;
        let mut handles: Vec<_> = inner.entities.values().cloned().collect();
        handles.sort_by(|a, b| {
            a.registered_at()
                .cmp(&b.registered_at())
                .then_with(|| a.entity_id().cmp(b.entity_id()))
        });
        handles
    }

    pub async fn is_tombstoned(&self, entity_id: &str) -> bool {
        self.inner
            .lock()
            .await
            .tombstones
            .iter()
            .any(|id| id == entity_id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entities.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Cancels and returns every handle and closes the registry to new adds.
    /// Used at shutdown; ids are not tombstoned.
    pub async fn drain(&self) -> Vec<Arc<EntityHandle>> {
        let mut inner = self.inner.lock().await;
        inner.closed = true;
        let handles: Vec<_> = inner.entities.drain().map(|(_, handle)| handle).collect();
        for handle in &handles {
            handle.cancel();
        }
        handles
    }
}
