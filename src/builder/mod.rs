use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, Service,
    ServiceAccount, ServicePort, ServiceSpec,
};
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

use crate::config::GwmConfig;
use crate::crd::{EdgeGateway, GatewayClassConfigSpec, ListenerSpec};

pub const OWNER_LABEL: &str = "oaas.io/owner";

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid gateway class config: {0}")]
    InvalidClassConfig(String),
}

/// Constructs the desired form of each child for one gateway. Injected into
/// the pipeline so tests can substitute builders that fail on demand.
pub trait ChildBuilder: Send + Sync {
    fn service_account(&self) -> ServiceAccount;
    fn role(&self) -> Role;
    fn role_binding(&self) -> RoleBinding;
    fn service(&self) -> Service;
    /// Fallible: class-config validation happens here, before any write.
    fn deployment(&self) -> Result<Deployment, BuildError>;
    /// Class-config-aware reconciliation of an observed Deployment against
    /// the freshly built one.
    fn merge_deployment(
        &self,
        observed: Option<&Deployment>,
        desired: Deployment,
    ) -> Deployment;
}

pub struct GatewayBuilder<'a> {
    gateway: &'a EdgeGateway,
    class_config: &'a GatewayClassConfigSpec,
    config: &'a GwmConfig,
}

impl<'a> GatewayBuilder<'a> {
    pub fn new(
        gateway: &'a EdgeGateway,
        class_config: &'a GatewayClassConfigSpec,
        config: &'a GwmConfig,
    ) -> Self {
        Self {
            gateway,
            class_config,
            config,
        }
    }

    fn name(&self) -> String {
        self.gateway.name_any()
    }

    fn namespace(&self) -> String {
        self.gateway.namespace().unwrap_or_else(|| "default".into())
    }

    fn labels(&self) -> BTreeMap<String, String> {
        let mut lbls = BTreeMap::new();
        lbls.insert("app".to_string(), self.name());
        lbls.insert(OWNER_LABEL.to_string(), self.name());
        lbls
    }

    fn object_meta(&self) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.name()),
            namespace: Some(self.namespace()),
            labels: Some(self.labels()),
            ..Default::default()
        }
    }

    fn listeners(&self) -> Vec<ListenerSpec> {
        if self.gateway.spec.listeners.is_empty() {
            vec![ListenerSpec {
                name: Some("default".into()),
                port: self.config.default_listener_port,
                protocol: None,
            }]
        } else {
            self.gateway.spec.listeners.clone()
        }
    }

    fn replica_bounds(&self) -> (i32, i32) {
        let min = self.class_config.min_instances.unwrap_or(0).max(0);
        let max = self.class_config.max_instances.unwrap_or(i32::MAX);
        (min, max)
    }

    fn clamp_replicas(&self, n: i32) -> i32 {
        let (min, max) = self.replica_bounds();
        n.max(min).min(max.max(min))
    }
}

impl ChildBuilder for GatewayBuilder<'_> {
    fn service_account(&self) -> ServiceAccount {
        ServiceAccount {
            metadata: self.object_meta(),
            ..Default::default()
        }
    }

    fn role(&self) -> Role {
        Role {
            metadata: self.object_meta(),
            rules: Some(vec![PolicyRule {
                api_groups: Some(vec!["".into()]),
                resources: Some(vec![
                    "services".into(),
                    "endpoints".into(),
                    "pods".into(),
                ]),
                verbs: vec!["get".into(), "list".into(), "watch".into()],
                ..Default::default()
            }]),
        }
    }

    fn role_binding(&self) -> RoleBinding {
        RoleBinding {
            metadata: self.object_meta(),
            role_ref: RoleRef {
                api_group: "rbac.authorization.k8s.io".into(),
                kind: "Role".into(),
                name: self.name(),
            },
            subjects: Some(vec![Subject {
                kind: "ServiceAccount".into(),
                name: self.name(),
                namespace: Some(self.namespace()),
                ..Default::default()
            }]),
        }
    }

    fn service(&self) -> Service {
        let ports = self
            .listeners()
            .into_iter()
            .map(|l| ServicePort {
                name: l.name,
                port: l.port,
                protocol: l.protocol,
                target_port: Some(IntOrString::Int(l.port)),
                ..Default::default()
            })
            .collect();

        let mut metadata = self.object_meta();
        metadata.annotations = self.gateway.spec.annotations.clone();

        Service {
            metadata,
            spec: Some(ServiceSpec {
                selector: Some(self.labels()),
                ports: Some(ports),
                type_: self.gateway.spec.service_type.clone(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn deployment(&self) -> Result<Deployment, BuildError> {
        let (min, max) = self.replica_bounds();
        if min > max {
            return Err(BuildError::InvalidClassConfig(format!(
                "minInstances {min} exceeds maxInstances {max}"
            )));
        }
        let image = self
            .class_config
            .image
            .as_deref()
            .unwrap_or(&self.config.gateway_image);
        if image.trim().is_empty() {
            return Err(BuildError::InvalidClassConfig(
                "image must not be blank".into(),
            ));
        }

        let replicas = self.clamp_replicas(
            self.gateway
                .spec
                .replicas
                .or(self.class_config.default_instances)
                .unwrap_or(1),
        );

        let container_ports = self
            .listeners()
            .into_iter()
            .map(|l| ContainerPort {
                container_port: l.port,
                protocol: l.protocol,
                ..Default::default()
            })
            .collect();

        let labels = self.labels();
        let mut pod_meta = ObjectMeta {
            labels: Some(labels.clone()),
            ..Default::default()
        };
        pod_meta.annotations = self.class_config.pod_annotations.clone();

        Ok(Deployment {
            metadata: self.object_meta(),
            spec: Some(DeploymentSpec {
                replicas: Some(replicas),
                selector: LabelSelector {
                    match_labels: Some(labels),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(pod_meta),
                    spec: Some(PodSpec {
                        service_account_name: Some(self.name()),
                        containers: vec![Container {
                            name: "gateway".to_string(),
                            image: Some(image.to_string()),
                            ports: Some(container_ports),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn merge_deployment(
        &self,
        observed: Option<&Deployment>,
        desired: Deployment,
    ) -> Deployment {
        let Some(existing) = observed else {
            return desired;
        };
        // An external scaler may have adjusted replicas since the last
        // reconcile; keep the observed count, clamped to class bounds, so we
        // don't fight it.
        let mut merged = desired;
        if let Some(observed_replicas) =
            existing.spec.as_ref().and_then(|s| s.replicas)
        {
            if let Some(spec) = merged.spec.as_mut() {
                spec.replicas = Some(self.clamp_replicas(observed_replicas));
            }
        }
        merged
    }
}
