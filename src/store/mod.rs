pub mod kube;
pub mod memory;
pub mod resource;

pub use self::kube::KubeStore;
pub use self::memory::MemoryStore;
pub use self::resource::{ChildKind, ChildResource};

use async_trait::async_trait;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("kubernetes api error: {0}")]
    Api(#[source] ::kube::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Flat object store the reconcile pipeline runs against. "Not found" is
/// `Ok(None)`, never an error; everything else a lookup can fail with is a
/// `StoreError` the caller must treat as retryable.
#[async_trait]
pub trait ChildStore: Send + Sync {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
        kind: ChildKind,
    ) -> StoreResult<Option<ChildResource>>;

    /// Create the resource when absent, update it in place otherwise.
    async fn create_or_update(&self, resource: &ChildResource) -> StoreResult<()>;
}
