use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

use crate::crd::GatewayIdentity;
use crate::store::{ChildKind, ChildResource};

/// A resource already sits at the target key and none of its owner
/// references point at the reconciling gateway. Mutating it would clobber
/// someone else's object, so the upsert refuses.
#[derive(Debug, Clone, thiserror::Error)]
#[error("existing {kind} {namespace}/{name} is not owned by gateway {gateway}")]
pub struct NotOwned {
    pub kind: ChildKind,
    pub namespace: String,
    pub name: String,
    pub gateway: String,
}

/// Pure admission decision for one upsert. Absence always allows: a child
/// that was never observed is safe to create. Presence allows only when an
/// owner entry matches the gateway's `{uid, name}` pair.
pub fn ensure_owned(
    identity: &GatewayIdentity,
    observed: Option<&ChildResource>,
) -> Result<(), NotOwned> {
    let Some(existing) = observed else {
        return Ok(());
    };
    if is_owned_by(existing.owner_references(), identity) {
        return Ok(());
    }
    Err(NotOwned {
        kind: existing.kind(),
        namespace: existing.namespace().to_string(),
        name: existing.name().to_string(),
        gateway: identity.to_string(),
    })
}

pub fn is_owned_by(
    refs: &[OwnerReference],
    identity: &GatewayIdentity,
) -> bool {
    refs.iter()
        .any(|r| r.uid == identity.uid && r.name == identity.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Service;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn identity() -> GatewayIdentity {
        GatewayIdentity {
            namespace: "default".into(),
            name: "gw-a".into(),
            uid: "u1".into(),
        }
    }

    fn service_with_refs(refs: Option<Vec<OwnerReference>>) -> ChildResource {
        ChildResource::Service(Service {
            metadata: ObjectMeta {
                name: Some("gw-a".into()),
                namespace: Some("default".into()),
                owner_references: refs,
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn owner_ref(uid: &str, name: &str) -> OwnerReference {
        OwnerReference {
            api_version: "oaas.io/v1alpha1".into(),
            kind: "EdgeGateway".into(),
            name: name.into(),
            uid: uid.into(),
            controller: Some(true),
            block_owner_deletion: None,
        }
    }

    #[test]
    fn absent_resource_is_always_allowed() {
        assert!(ensure_owned(&identity(), None).is_ok());
    }

    #[test]
    fn matching_uid_and_name_allows() {
        let svc = service_with_refs(Some(vec![owner_ref("u1", "gw-a")]));
        assert!(ensure_owned(&identity(), Some(&svc)).is_ok());
    }

    #[test]
    fn any_matching_entry_in_list_allows() {
        let svc = service_with_refs(Some(vec![
            owner_ref("other", "other"),
            owner_ref("u1", "gw-a"),
        ]));
        assert!(ensure_owned(&identity(), Some(&svc)).is_ok());
    }

    #[test]
    fn uid_mismatch_denies() {
        let svc = service_with_refs(Some(vec![owner_ref("u2", "gw-a")]));
        let err = ensure_owned(&identity(), Some(&svc)).unwrap_err();
        assert_eq!(err.kind, ChildKind::Service);
    }

    #[test]
    fn name_mismatch_denies() {
        let svc = service_with_refs(Some(vec![owner_ref("u1", "gw-b")]));
        assert!(ensure_owned(&identity(), Some(&svc)).is_err());
    }

    #[test]
    fn no_owner_references_denies() {
        let svc = service_with_refs(None);
        assert!(ensure_owned(&identity(), Some(&svc)).is_err());
    }
}
