use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{ChildKind, ChildResource, ChildStore, StoreError, StoreResult};

type Key = (ChildKind, String, String);

/// In-memory store used by tests and local experiments. Faults can be
/// injected per kind to simulate an unavailable backend on the read or the
/// write path.
#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<HashMap<Key, ChildResource>>>,
    fail_reads: Arc<RwLock<HashSet<ChildKind>>>,
    fail_writes: Arc<RwLock<HashSet<ChildKind>>>,
    write_log: Arc<RwLock<Vec<(ChildKind, String)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing the write log. Used to model
    /// resources placed by another actor.
    pub async fn insert(&self, resource: ChildResource) {
        let key = (
            resource.kind(),
            resource.namespace().to_string(),
            resource.name().to_string(),
        );
        self.objects.write().await.insert(key, resource);
    }

    pub async fn stored(
        &self,
        namespace: &str,
        name: &str,
        kind: ChildKind,
    ) -> Option<ChildResource> {
        self.objects
            .read()
            .await
            .get(&(kind, namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub async fn contains(
        &self,
        namespace: &str,
        name: &str,
        kind: ChildKind,
    ) -> bool {
        self.stored(namespace, name, kind).await.is_some()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn snapshot(&self) -> HashMap<Key, ChildResource> {
        self.objects.read().await.clone()
    }

    /// Ordered record of every `create_or_update` that reached the store.
    pub async fn write_log(&self) -> Vec<(ChildKind, String)> {
        self.write_log.read().await.clone()
    }

    pub async fn fail_reads_for(&self, kind: ChildKind) {
        self.fail_reads.write().await.insert(kind);
    }

    pub async fn fail_writes_for(&self, kind: ChildKind) {
        self.fail_writes.write().await.insert(kind);
    }

    pub async fn clear_faults(&self) {
        self.fail_reads.write().await.clear();
        self.fail_writes.write().await.clear();
    }
}

#[async_trait]
impl ChildStore for MemoryStore {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
        kind: ChildKind,
    ) -> StoreResult<Option<ChildResource>> {
        if self.fail_reads.read().await.contains(&kind) {
            return Err(StoreError::Backend(format!(
                "injected read fault for {kind}"
            )));
        }
        Ok(self.stored(namespace, name, kind).await)
    }

    async fn create_or_update(
        &self,
        resource: &ChildResource,
    ) -> StoreResult<()> {
        let kind = resource.kind();
        if self.fail_writes.read().await.contains(&kind) {
            return Err(StoreError::Backend(format!(
                "injected write fault for {kind}"
            )));
        }
        let key = (
            kind,
            resource.namespace().to_string(),
            resource.name().to_string(),
        );
        self.objects.write().await.insert(key, resource.clone());
        self.write_log
            .write()
            .await
            .push((kind, resource.name().to_string()));
        Ok(())
    }
}
