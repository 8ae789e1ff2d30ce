use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::api::{Api, Patch, PatchParams};
use kube::Client;

use super::{ChildKind, ChildResource, ChildStore, StoreError, StoreResult};

/// Store backed by the Kubernetes API. Reads map 404 to absence; writes go
/// through server-side apply with a forced field manager, which covers both
/// the create and the update path.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl KubeStore {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn apply_params(&self) -> PatchParams {
        PatchParams::apply(&self.field_manager).force()
    }
}

/// Apply patches must carry apiVersion/kind, which the typed structs do not
/// serialize on their own.
fn apply_body<T>(obj: &T) -> StoreResult<serde_json::Value>
where
    T: serde::Serialize + k8s_openapi::Resource,
{
    let mut value = serde_json::to_value(obj)?;
    if let Some(map) = value.as_object_mut() {
        map.insert("apiVersion".into(), T::API_VERSION.into());
        map.insert("kind".into(), T::KIND.into());
    }
    Ok(value)
}

#[async_trait]
impl ChildStore for KubeStore {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
        kind: ChildKind,
    ) -> StoreResult<Option<ChildResource>> {
        match kind {
            ChildKind::ServiceAccount => {
                let api: Api<ServiceAccount> =
                    Api::namespaced(self.client.clone(), namespace);
                let obj = api.get_opt(name).await.map_err(StoreError::Api)?;
                Ok(obj.map(ChildResource::ServiceAccount))
            }
            ChildKind::Role => {
                let api: Api<Role> =
                    Api::namespaced(self.client.clone(), namespace);
                let obj = api.get_opt(name).await.map_err(StoreError::Api)?;
                Ok(obj.map(ChildResource::Role))
            }
            ChildKind::RoleBinding => {
                let api: Api<RoleBinding> =
                    Api::namespaced(self.client.clone(), namespace);
                let obj = api.get_opt(name).await.map_err(StoreError::Api)?;
                Ok(obj.map(ChildResource::RoleBinding))
            }
            ChildKind::Service => {
                let api: Api<Service> =
                    Api::namespaced(self.client.clone(), namespace);
                let obj = api.get_opt(name).await.map_err(StoreError::Api)?;
                Ok(obj.map(ChildResource::Service))
            }
            ChildKind::Deployment => {
                let api: Api<Deployment> =
                    Api::namespaced(self.client.clone(), namespace);
                let obj = api.get_opt(name).await.map_err(StoreError::Api)?;
                Ok(obj.map(ChildResource::Deployment))
            }
        }
    }

    async fn create_or_update(
        &self,
        resource: &ChildResource,
    ) -> StoreResult<()> {
        let ns = resource.namespace();
        let name = resource.name();
        let pp = self.apply_params();
        match resource {
            ChildResource::ServiceAccount(obj) => {
                let api: Api<ServiceAccount> =
                    Api::namespaced(self.client.clone(), ns);
                let value = apply_body(obj)?;
                api.patch(name, &pp, &Patch::Apply(&value))
                    .await
                    .map_err(StoreError::Api)?;
            }
            ChildResource::Role(obj) => {
                let api: Api<Role> = Api::namespaced(self.client.clone(), ns);
                let value = apply_body(obj)?;
                api.patch(name, &pp, &Patch::Apply(&value))
                    .await
                    .map_err(StoreError::Api)?;
            }
            ChildResource::RoleBinding(obj) => {
                let api: Api<RoleBinding> =
                    Api::namespaced(self.client.clone(), ns);
                let value = apply_body(obj)?;
                api.patch(name, &pp, &Patch::Apply(&value))
                    .await
                    .map_err(StoreError::Api)?;
            }
            ChildResource::Service(obj) => {
                let api: Api<Service> =
                    Api::namespaced(self.client.clone(), ns);
                let value = apply_body(obj)?;
                api.patch(name, &pp, &Patch::Apply(&value))
                    .await
                    .map_err(StoreError::Api)?;
            }
            ChildResource::Deployment(obj) => {
                let api: Api<Deployment> =
                    Api::namespaced(self.client.clone(), ns);
                let value = apply_body(obj)?;
                api.patch(name, &pp, &Patch::Apply(&value))
                    .await
                    .map_err(StoreError::Api)?;
            }
        }
        Ok(())
    }
}
