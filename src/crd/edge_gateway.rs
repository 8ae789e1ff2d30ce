use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{CustomResource, Resource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "oaas.io",
    version = "v1alpha1",
    kind = "EdgeGateway",
    plural = "edgegateways",
    namespaced
)]
pub struct EdgeGatewaySpec {
    /// Name of the cluster-scoped GatewayClass this gateway instantiates.
    pub gateway_class_name: String,
    /// Ports the gateway Service and Deployment expose. A single default
    /// listener is assumed when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listeners: Vec<ListenerSpec>,
    /// Kubernetes Service type (ClusterIP when omitted)
    pub service_type: Option<String>,
    /// Replica hint; GatewayClassConfig bounds still apply
    pub replicas: Option<i32>,
    /// Annotations propagated onto the gateway Service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
pub struct ListenerSpec {
    pub name: Option<String>,
    pub port: i32,
    /// TCP when omitted
    #[serde(default)]
    pub protocol: Option<String>,
}

/// Identity of the gateway a reconcile runs for. Every child written on the
/// gateway's behalf is stamped with an owner reference derived from this, and
/// the ownership guard only matches against `{uid, name}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayIdentity {
    pub namespace: String,
    pub name: String,
    pub uid: String,
}

impl EdgeGateway {
    /// None when the object carries no uid (e.g., constructed locally and
    /// never persisted); children must not be written for such an object.
    pub fn identity(&self) -> Option<GatewayIdentity> {
        let uid = self.meta().uid.clone()?;
        Some(GatewayIdentity {
            namespace: self.namespace().unwrap_or_else(|| "default".into()),
            name: self.name_any(),
            uid,
        })
    }
}

impl GatewayIdentity {
    pub fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: EdgeGateway::api_version(&()).into_owned(),
            kind: EdgeGateway::kind(&()).into_owned(),
            name: self.name.clone(),
            uid: self.uid.clone(),
            controller: Some(true),
            block_owner_deletion: None,
        }
    }
}

impl std::fmt::Display for GatewayIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
