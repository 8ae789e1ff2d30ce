use k8s_openapi::api::core::v1::Service;

/// Keep annotations and ports from the observed Service on the freshly
/// built one. The platform injects and normalizes both after a write;
/// re-asserting the built values every reconcile would loop forever.
///
/// TODO: carrying observed ports forward also swallows deliberate listener
/// edits on the EdgeGateway spec; distinguishing those from platform drift
/// needs a port diff keyed on listener names.
pub fn merge_service(observed: Option<&Service>, desired: Service) -> Service {
    let Some(existing) = observed else {
        return desired;
    };
    if services_equal(existing, &desired) {
        return desired;
    }

    let mut merged = desired;
    merged.metadata.annotations = existing.metadata.annotations.clone();
    merged.spec.get_or_insert_with(Default::default).ports =
        existing.spec.as_ref().and_then(|s| s.ports.clone());
    merged
}

/// Equality on the two fields the platform mutates: the annotation map and
/// the ordered (port, protocol) list. Everything else is ignored here.
pub fn services_equal(a: &Service, b: &Service) -> bool {
    if a.metadata.annotations != b.metadata.annotations {
        return false;
    }

    let a_ports = ports_of(a);
    let b_ports = ports_of(b);
    if a_ports.len() != b_ports.len() {
        return false;
    }
    a_ports
        .iter()
        .zip(b_ports.iter())
        .all(|(x, y)| x.port == y.port && x.protocol == y.protocol)
}

fn ports_of(svc: &Service) -> &[k8s_openapi::api::core::v1::ServicePort] {
    svc.spec
        .as_ref()
        .and_then(|s| s.ports.as_deref())
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{ServicePort, ServiceSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn port(p: i32, proto: &str) -> ServicePort {
        ServicePort {
            port: p,
            protocol: Some(proto.into()),
            ..Default::default()
        }
    }

    fn service(
        annotations: Option<BTreeMap<String, String>>,
        ports: Vec<ServicePort>,
    ) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some("gw-a".into()),
                annotations,
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                ports: Some(ports),
                selector: Some(BTreeMap::from([(
                    "app".to_string(),
                    "gw-a".to_string(),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn equal_services_merge_to_desired_unchanged() {
        let observed = service(None, vec![port(8080, "TCP")]);
        let desired = service(None, vec![port(8080, "TCP")]);
        let merged = merge_service(Some(&observed), desired.clone());
        assert_eq!(merged, desired);
    }

    #[test]
    fn absent_observed_merges_to_desired() {
        let desired = service(None, vec![port(8080, "TCP")]);
        assert_eq!(merge_service(None, desired.clone()), desired);
    }

    #[test]
    fn differing_annotations_are_preserved_from_observed() {
        let ann = BTreeMap::from([("foo".to_string(), "bar".to_string())]);
        let observed = service(Some(ann.clone()), vec![port(8080, "TCP")]);
        let desired = service(None, vec![port(8080, "TCP")]);
        let merged = merge_service(Some(&observed), desired);
        assert_eq!(merged.metadata.annotations, Some(ann));
    }

    #[test]
    fn differing_ports_are_preserved_from_observed_wholesale() {
        let observed =
            service(None, vec![port(9090, "TCP"), port(8080, "TCP")]);
        let desired = service(None, vec![port(8080, "TCP")]);
        let merged = merge_service(Some(&observed), desired);
        let merged_ports = merged.spec.as_ref().unwrap().ports.clone().unwrap();
        assert_eq!(
            merged_ports.iter().map(|p| p.port).collect::<Vec<_>>(),
            vec![9090, 8080]
        );
        // Fields outside the drift set still come from desired.
        assert!(merged.spec.unwrap().selector.is_some());
    }

    #[test]
    fn port_order_matters_for_equality() {
        let a = service(None, vec![port(1, "TCP"), port(2, "TCP")]);
        let b = service(None, vec![port(2, "TCP"), port(1, "TCP")]);
        assert!(!services_equal(&a, &b));
    }

    #[test]
    fn missing_port_list_equals_empty_port_list() {
        let mut a = service(None, vec![]);
        a.spec.as_mut().unwrap().ports = None;
        let b = service(None, vec![]);
        assert!(services_equal(&a, &b));
    }
}
