use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    ObjectMeta, OwnerReference,
};

use crate::crd::GatewayIdentity;

/// The closed set of children a gateway owns. `ORDERED` is the dependency
/// order reconciles walk: RBAC before the Service, the Deployment last
/// because it references the ServiceAccount by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChildKind {
    ServiceAccount,
    Role,
    RoleBinding,
    Service,
    Deployment,
}

impl ChildKind {
    pub const ORDERED: [ChildKind; 5] = [
        ChildKind::ServiceAccount,
        ChildKind::Role,
        ChildKind::RoleBinding,
        ChildKind::Service,
        ChildKind::Deployment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChildKind::ServiceAccount => "ServiceAccount",
            ChildKind::Role => "Role",
            ChildKind::RoleBinding => "RoleBinding",
            ChildKind::Service => "Service",
            ChildKind::Deployment => "Deployment",
        }
    }
}

impl std::fmt::Display for ChildKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed child object, either desired (built this reconcile) or observed
/// (read back from the store).
#[derive(Clone, Debug, PartialEq)]
pub enum ChildResource {
    ServiceAccount(ServiceAccount),
    Role(Role),
    RoleBinding(RoleBinding),
    Service(Service),
    Deployment(Deployment),
}

impl ChildResource {
    pub fn kind(&self) -> ChildKind {
        match self {
            ChildResource::ServiceAccount(_) => ChildKind::ServiceAccount,
            ChildResource::Role(_) => ChildKind::Role,
            ChildResource::RoleBinding(_) => ChildKind::RoleBinding,
            ChildResource::Service(_) => ChildKind::Service,
            ChildResource::Deployment(_) => ChildKind::Deployment,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            ChildResource::ServiceAccount(o) => &o.metadata,
            ChildResource::Role(o) => &o.metadata,
            ChildResource::RoleBinding(o) => &o.metadata,
            ChildResource::Service(o) => &o.metadata,
            ChildResource::Deployment(o) => &o.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            ChildResource::ServiceAccount(o) => &mut o.metadata,
            ChildResource::Role(o) => &mut o.metadata,
            ChildResource::RoleBinding(o) => &mut o.metadata,
            ChildResource::Service(o) => &mut o.metadata,
            ChildResource::Deployment(o) => &mut o.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or("")
    }

    pub fn namespace(&self) -> &str {
        self.metadata().namespace.as_deref().unwrap_or("default")
    }

    pub fn owner_references(&self) -> &[OwnerReference] {
        self.metadata()
            .owner_references
            .as_deref()
            .unwrap_or(&[])
    }

    /// Stamp the controller owner reference, replacing any entry a previous
    /// build left behind for the same gateway.
    pub fn set_owner(&mut self, identity: &GatewayIdentity) {
        let oref = identity.owner_reference();
        let refs = self
            .metadata_mut()
            .owner_references
            .get_or_insert_with(Vec::new);
        refs.retain(|r| r.uid != oref.uid);
        refs.push(oref);
    }

    pub fn as_service(&self) -> Option<&Service> {
        match self {
            ChildResource::Service(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_deployment(&self) -> Option<&Deployment> {
        match self {
            ChildResource::Deployment(d) => Some(d),
            _ => None,
        }
    }
}
