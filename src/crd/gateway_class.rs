use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "oaas.io",
    version = "v1alpha1",
    kind = "GatewayClass",
    plural = "gatewayclasses"
)]
pub struct GatewayClassSpec {
    /// Controller expected to act on gateways of this class (informational)
    pub controller_name: Option<String>,
    /// Reference to a GatewayClassConfig carrying deployment policy.
    /// A missing or foreign reference means defaults apply.
    pub parameters_ref: Option<ParametersRef>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
pub struct ParametersRef {
    pub group: String,
    pub kind: String,
    pub name: String,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[kube(
    group = "oaas.io",
    version = "v1alpha1",
    kind = "GatewayClassConfig",
    plural = "gatewayclassconfigs"
)]
pub struct GatewayClassConfigSpec {
    /// Gateway container image override
    pub image: Option<String>,
    /// Replicas used when the EdgeGateway gives no hint (default 1)
    pub default_instances: Option<i32>,
    /// Lower bound applied to any replica count, observed or desired
    pub min_instances: Option<i32>,
    /// Upper bound applied to any replica count, observed or desired
    pub max_instances: Option<i32>,
    /// Annotations placed on gateway pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_annotations: Option<BTreeMap<String, String>>,
}
