use tracing::{debug, instrument};

use crate::builder::{BuildError, ChildBuilder};
use crate::crd::GatewayIdentity;
use crate::store::{ChildKind, ChildResource, ChildStore, StoreError};

use super::merge::merge_service;
use super::ownership::{NotOwned, ensure_owned};

#[derive(Debug, thiserror::Error)]
pub enum UpsertError {
    #[error(transparent)]
    NotOwned(#[from] NotOwned),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Pipeline failure, tagged with the step it happened at. Steps before the
/// failing one stay committed; a later reconcile re-converges them
/// idempotently.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("building {kind}: {source}")]
    Build {
        kind: ChildKind,
        source: BuildError,
    },

    #[error("applying {kind}: {source}")]
    Apply {
        kind: ChildKind,
        source: UpsertError,
    },
}

impl PipelineError {
    pub fn kind(&self) -> ChildKind {
        match self {
            PipelineError::Build { kind, .. } => *kind,
            PipelineError::Apply { kind, .. } => *kind,
        }
    }

    /// True when the failing step hit a foreign object at its target key.
    /// Retrying cannot fix that; the caller must surface it rather than
    /// requeue it like a transient store error.
    pub fn is_not_owned(&self) -> bool {
        matches!(
            self,
            PipelineError::Apply {
                source: UpsertError::NotOwned(_),
                ..
            }
        )
    }
}

/// Upsert all children of one gateway in dependency order: ServiceAccount,
/// Role, RoleBinding, Service, Deployment. The first failure aborts the
/// remaining kinds for this invocation. The Deployment is built before its
/// upsert so an invalid class config never reaches the write path.
pub async fn apply_gateway<S>(
    store: &S,
    identity: &GatewayIdentity,
    builder: &dyn ChildBuilder,
) -> Result<(), PipelineError>
where
    S: ChildStore + ?Sized,
{
    upsert_owned(
        store,
        identity,
        ChildResource::ServiceAccount(builder.service_account()),
        |_, desired| desired,
    )
    .await
    .map_err(|source| PipelineError::Apply {
        kind: ChildKind::ServiceAccount,
        source,
    })?;

    upsert_owned(
        store,
        identity,
        ChildResource::Role(builder.role()),
        |_, desired| desired,
    )
    .await
    .map_err(|source| PipelineError::Apply {
        kind: ChildKind::Role,
        source,
    })?;

    upsert_owned(
        store,
        identity,
        ChildResource::RoleBinding(builder.role_binding()),
        |_, desired| desired,
    )
    .await
    .map_err(|source| PipelineError::Apply {
        kind: ChildKind::RoleBinding,
        source,
    })?;

    upsert_owned(
        store,
        identity,
        ChildResource::Service(builder.service()),
        |observed, desired| match desired {
            ChildResource::Service(svc) => ChildResource::Service(
                merge_service(observed.and_then(|o| o.as_service()), svc),
            ),
            other => other,
        },
    )
    .await
    .map_err(|source| PipelineError::Apply {
        kind: ChildKind::Service,
        source,
    })?;

    let deployment =
        builder
            .deployment()
            .map_err(|source| PipelineError::Build {
                kind: ChildKind::Deployment,
                source,
            })?;
    upsert_owned(
        store,
        identity,
        ChildResource::Deployment(deployment),
        |observed, desired| match desired {
            ChildResource::Deployment(dep) => {
                ChildResource::Deployment(builder.merge_deployment(
                    observed.and_then(|o| o.as_deployment()),
                    dep,
                ))
            }
            other => other,
        },
    )
    .await
    .map_err(|source| PipelineError::Apply {
        kind: ChildKind::Deployment,
        source,
    })?;

    Ok(())
}

/// One ownership-safe upsert. In order: stamp the owner reference
/// (unconditionally, the create path needs it too), read the observed state
/// at the target key, run the ownership guard, merge, write. A read failure
/// other than "not found" aborts before the guard; a guard denial aborts
/// before the write.
#[instrument(skip_all, fields(gateway = %identity, kind = %desired.kind(), name = %desired.name()))]
pub async fn upsert_owned<S, M>(
    store: &S,
    identity: &GatewayIdentity,
    mut desired: ChildResource,
    merge: M,
) -> Result<(), UpsertError>
where
    S: ChildStore + ?Sized,
    M: FnOnce(Option<&ChildResource>, ChildResource) -> ChildResource,
{
    desired.set_owner(identity);

    let namespace = desired.namespace().to_string();
    let name = desired.name().to_string();
    let kind = desired.kind();

    let observed = store.get(&namespace, &name, kind).await?;
    ensure_owned(identity, observed.as_ref())?;

    let merged = merge(observed.as_ref(), desired);
    debug!(existed = observed.is_some(), "upsert: writing child");
    store.create_or_update(&merged).await?;
    Ok(())
}
