use std::sync::Arc;

use kube::api::Api;
use kube::runtime::controller::Action;
use kube::{Client, Resource, ResourceExt};
use tracing::{info, instrument};

use crate::builder::GatewayBuilder;
use crate::crd::{
    EdgeGateway, GatewayClass, GatewayClassConfig, GatewayClassConfigSpec,
};
use crate::store::KubeStore;

use super::{ControllerContext, ReconcileErr, pipeline};

#[instrument(skip_all, fields(ns = %obj.namespace().unwrap_or_else(|| "default".into()), name = %obj.name_any()))]
pub async fn reconcile(
    obj: Arc<EdgeGateway>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let ns = obj.namespace().unwrap_or_else(|| "default".to_string());
    let name = obj.name_any();

    // Re-fetch: the watch event may be stale; a gateway that is gone is a
    // clean no-op, not an error.
    let gw_api: Api<EdgeGateway> = Api::namespaced(ctx.client.clone(), &ns);
    let Some(gateway) = gw_api
        .get_opt(&name)
        .await
        .map_err(|source| ReconcileErr::Fetch {
            what: "gateway",
            source,
        })?
    else {
        return Ok(Action::await_change());
    };

    if gateway.meta().deletion_timestamp.is_some() {
        info!(%ns, %name, "reconcile: deletion requested");
        on_delete(&gateway);
        return Ok(Action::await_change());
    }

    let identity = gateway.identity().ok_or(ReconcileErr::MissingUid)?;
    let class_config = resolve_class_config(&ctx.client, &gateway).await?;
    info!(%ns, %name, "reconcile: begin child upserts");

    let builder = GatewayBuilder::new(&gateway, &class_config, &ctx.cfg);
    let store = KubeStore::new(ctx.client.clone(), &ctx.cfg.field_manager);
    pipeline::apply_gateway(&store, &identity, &builder).await?;

    info!(%ns, %name, "reconcile: children converged");
    Ok(Action::await_change())
}

/// Deletion hook. Children all carry an owner reference, so the garbage
/// collector removes them once the gateway is gone; side-effect cleanup
/// that is not owner-keyed hangs off here.
fn on_delete(gateway: &EdgeGateway) {
    info!(name = %gateway.name_any(), "delete: child cleanup delegated to garbage collector");
}

/// Walk gatewayClassName -> GatewayClass -> parametersRef ->
/// GatewayClassConfig. Every "not there" along the way (missing class,
/// missing ref, foreign group/kind, missing config) degrades to the default
/// config; only real lookup failures propagate.
async fn resolve_class_config(
    client: &Client,
    gateway: &EdgeGateway,
) -> Result<GatewayClassConfigSpec, ReconcileErr> {
    let class_api: Api<GatewayClass> = Api::all(client.clone());
    let Some(class) = class_api
        .get_opt(&gateway.spec.gateway_class_name)
        .await
        .map_err(|source| ReconcileErr::Fetch {
            what: "gateway class",
            source,
        })?
    else {
        return Ok(GatewayClassConfigSpec::default());
    };

    let Some(params) = class.spec.parameters_ref else {
        return Ok(GatewayClassConfigSpec::default());
    };
    if params.group != crate::crd::GROUP || params.kind != "GatewayClassConfig"
    {
        return Ok(GatewayClassConfigSpec::default());
    }

    let cfg_api: Api<GatewayClassConfig> = Api::all(client.clone());
    Ok(cfg_api
        .get_opt(&params.name)
        .await
        .map_err(|source| ReconcileErr::Fetch {
            what: "gateway class config",
            source,
        })?
        .map(|c| c.spec)
        .unwrap_or_default())
}
