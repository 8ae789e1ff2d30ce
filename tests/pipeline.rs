use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use oprc_gwm::builder::GatewayBuilder;
use oprc_gwm::config::GwmConfig;
use oprc_gwm::controller::pipeline::{self, PipelineError, UpsertError};
use oprc_gwm::crd::{
    EdgeGateway, EdgeGatewaySpec, GatewayClassConfigSpec, GatewayIdentity,
    ListenerSpec,
};
use oprc_gwm::store::{ChildKind, ChildResource, MemoryStore};

fn gateway(name: &str, uid: &str, ports: &[i32]) -> EdgeGateway {
    let listeners = ports
        .iter()
        .map(|p| ListenerSpec {
            name: Some(format!("l{p}")),
            port: *p,
            protocol: Some("TCP".into()),
        })
        .collect();
    let mut gw = EdgeGateway::new(
        name,
        EdgeGatewaySpec {
            gateway_class_name: "edge".into(),
            listeners,
            service_type: None,
            replicas: None,
            annotations: None,
        },
    );
    gw.metadata.namespace = Some("default".into());
    gw.metadata.uid = Some(uid.into());
    gw
}

fn identity(gw: &EdgeGateway) -> GatewayIdentity {
    gw.identity().expect("test gateway has a uid")
}

async fn apply(
    store: &MemoryStore,
    gw: &EdgeGateway,
    class_config: &GatewayClassConfigSpec,
) -> Result<(), PipelineError> {
    let cfg = GwmConfig::default();
    let builder = GatewayBuilder::new(gw, class_config, &cfg);
    pipeline::apply_gateway(store, &identity(gw), &builder).await
}

fn owned_by(child: &ChildResource, uid: &str, name: &str) -> bool {
    child
        .owner_references()
        .iter()
        .any(|r| r.uid == uid && r.name == name)
}

#[tokio::test]
async fn new_gateway_creates_all_children_in_dependency_order() {
    let store = MemoryStore::new();
    let gw = gateway("gw-a", "u1", &[8080]);

    apply(&store, &gw, &GatewayClassConfigSpec::default())
        .await
        .expect("pipeline converges");

    let kinds: Vec<ChildKind> = store
        .write_log()
        .await
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(kinds, ChildKind::ORDERED.to_vec());

    for kind in ChildKind::ORDERED {
        let child = store
            .stored("default", "gw-a", kind)
            .await
            .unwrap_or_else(|| panic!("{kind} was not written"));
        assert!(owned_by(&child, "u1", "gw-a"), "{kind} missing owner ref");
    }

    let svc = store
        .stored("default", "gw-a", ChildKind::Service)
        .await
        .unwrap();
    let ports = svc
        .as_service()
        .unwrap()
        .spec
        .as_ref()
        .unwrap()
        .ports
        .clone()
        .unwrap();
    assert_eq!(ports.iter().map(|p| p.port).collect::<Vec<_>>(), vec![8080]);
}

#[tokio::test]
async fn second_reconcile_leaves_stored_state_identical() {
    let store = MemoryStore::new();
    let gw = gateway("gw-a", "u1", &[8080, 9090]);
    let cc = GatewayClassConfigSpec::default();

    apply(&store, &gw, &cc).await.unwrap();
    let first = store.snapshot().await;

    apply(&store, &gw, &cc).await.unwrap();
    let second = store.snapshot().await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn foreign_service_is_refused_and_left_untouched() {
    let store = MemoryStore::new();
    let manual = ChildResource::Service(Service {
        metadata: ObjectMeta {
            name: Some("gw-a".into()),
            namespace: Some("default".into()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                port: 9999,
                protocol: Some("TCP".into()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    });
    store.insert(manual.clone()).await;

    let gw = gateway("gw-a", "u1", &[8080]);
    let err = apply(&store, &gw, &GatewayClassConfigSpec::default())
        .await
        .unwrap_err();

    assert!(err.is_not_owned(), "expected ownership refusal, got {err}");
    assert_eq!(err.kind(), ChildKind::Service);
    assert!(matches!(
        err,
        PipelineError::Apply {
            source: UpsertError::NotOwned(_),
            ..
        }
    ));

    // Earlier kinds were already applied; the foreign object is untouched
    // and nothing after it ran.
    for kind in [ChildKind::ServiceAccount, ChildKind::Role, ChildKind::RoleBinding] {
        assert!(store.contains("default", "gw-a", kind).await);
    }
    assert_eq!(
        store.stored("default", "gw-a", ChildKind::Service).await,
        Some(manual)
    );
    assert!(!store.contains("default", "gw-a", ChildKind::Deployment).await);
}

#[tokio::test]
async fn role_failure_skips_all_later_kinds() {
    let store = MemoryStore::new();
    store.fail_writes_for(ChildKind::Role).await;
    let gw = gateway("gw-a", "u1", &[8080]);

    let err = apply(&store, &gw, &GatewayClassConfigSpec::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ChildKind::Role);

    assert!(store.contains("default", "gw-a", ChildKind::ServiceAccount).await);
    for kind in [
        ChildKind::RoleBinding,
        ChildKind::Service,
        ChildKind::Deployment,
    ] {
        assert!(
            !store.contains("default", "gw-a", kind).await,
            "{kind} must not be attempted after Role failed"
        );
    }
}

#[tokio::test]
async fn read_fault_aborts_before_any_write() {
    let store = MemoryStore::new();
    store.fail_reads_for(ChildKind::ServiceAccount).await;
    let gw = gateway("gw-a", "u1", &[8080]);

    let err = apply(&store, &gw, &GatewayClassConfigSpec::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ChildKind::ServiceAccount);
    assert!(matches!(
        err,
        PipelineError::Apply {
            source: UpsertError::Store(_),
            ..
        }
    ));
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn invalid_class_config_fails_deployment_build_before_its_write() {
    let store = MemoryStore::new();
    let gw = gateway("gw-a", "u1", &[8080]);
    let cc = GatewayClassConfigSpec {
        min_instances: Some(5),
        max_instances: Some(2),
        ..Default::default()
    };

    let err = apply(&store, &gw, &cc).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Build {
            kind: ChildKind::Deployment,
            ..
        }
    ));

    // The first four steps stay committed; only the Deployment is missing.
    for kind in [
        ChildKind::ServiceAccount,
        ChildKind::Role,
        ChildKind::RoleBinding,
        ChildKind::Service,
    ] {
        assert!(store.contains("default", "gw-a", kind).await);
    }
    assert!(!store.contains("default", "gw-a", ChildKind::Deployment).await);
}

#[tokio::test]
async fn drifted_service_annotations_and_port_order_survive_reconcile() {
    let store = MemoryStore::new();
    let gw = gateway("gw-a", "u1", &[8080, 9090]);
    let cc = GatewayClassConfigSpec::default();
    apply(&store, &gw, &cc).await.unwrap();

    // An external actor annotates the Service and the platform reorders its
    // port list.
    let mut drifted = store
        .stored("default", "gw-a", ChildKind::Service)
        .await
        .unwrap()
        .as_service()
        .unwrap()
        .clone();
    drifted
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert("foo".into(), "bar".into());
    drifted
        .spec
        .as_mut()
        .unwrap()
        .ports
        .as_mut()
        .unwrap()
        .reverse();
    store.insert(ChildResource::Service(drifted)).await;

    apply(&store, &gw, &cc).await.unwrap();

    let after = store
        .stored("default", "gw-a", ChildKind::Service)
        .await
        .unwrap()
        .as_service()
        .unwrap()
        .clone();
    assert_eq!(
        after
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get("foo"))
            .map(String::as_str),
        Some("bar")
    );
    assert_eq!(
        after
            .spec
            .unwrap()
            .ports
            .unwrap()
            .iter()
            .map(|p| p.port)
            .collect::<Vec<_>>(),
        vec![9090, 8080]
    );
}

#[tokio::test]
async fn foreign_owner_uid_on_existing_deployment_is_refused() {
    let store = MemoryStore::new();
    let gw_old = gateway("gw-a", "u-old", &[8080]);
    let cc = GatewayClassConfigSpec::default();
    apply(&store, &gw_old, &cc).await.unwrap();

    // Same name, different uid: children written for the deleted gateway
    // still carry its uid, so a recreated gateway may not adopt them.
    let gw_new = gateway("gw-a", "u-new", &[8080]);
    let err = apply(&store, &gw_new, &cc).await.unwrap_err();
    assert!(err.is_not_owned());
    assert_eq!(err.kind(), ChildKind::ServiceAccount);
}
