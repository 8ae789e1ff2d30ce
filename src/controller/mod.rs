pub mod merge;
pub mod ownership;
pub mod pipeline;
pub mod reconcile;

use std::sync::Arc;

use futures_util::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::{
    Client,
    api::Api,
    runtime::{Controller, controller::Action, watcher::Config},
};
use tokio::time::Duration;
use tracing::{error, info, warn};

use crate::config::GwmConfig;
use crate::crd::EdgeGateway;
use pipeline::PipelineError;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileErr {
    #[error("fetching {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: kube::Error,
    },

    #[error("gateway has no uid; children cannot carry an owner reference")]
    MissingUid,

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ReconcileErr {
    /// Terminal errors are ones a retry cannot fix without outside
    /// intervention; the error policy stops requeueing them.
    pub fn is_terminal(&self) -> bool {
        match self {
            ReconcileErr::Pipeline(p) => p.is_not_owned(),
            ReconcileErr::MissingUid => true,
            ReconcileErr::Fetch { .. } => false,
        }
    }
}

#[derive(Clone)]
pub struct ControllerContext {
    pub client: Client,
    pub cfg: GwmConfig,
}

pub async fn run_controller(
    client: Client,
    cfg: GwmConfig,
) -> anyhow::Result<()> {
    let api: Api<EdgeGateway> = Api::all(client.clone());
    let ctx = Arc::new(ControllerContext {
        client: client.clone(),
        cfg,
    });

    Controller::new(api, Config::default())
        .owns(
            Api::<ServiceAccount>::all(client.clone()),
            Config::default(),
        )
        .owns(Api::<Role>::all(client.clone()), Config::default())
        .owns(Api::<RoleBinding>::all(client.clone()), Config::default())
        .owns(Api::<Service>::all(client.clone()), Config::default())
        .owns(Api::<Deployment>::all(client.clone()), Config::default())
        .run(reconcile::reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((_obj_ref, action)) => {
                    info!("reconciled: requeue={:?}", action)
                }
                Err(e) => error!(error = ?e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

fn error_policy(
    _obj: Arc<EdgeGateway>,
    error: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    if error.is_terminal() {
        // Requeueing cannot succeed until the conflicting object changes;
        // wait for a watch event instead of hot-looping.
        warn!(%error, "reconcile failed terminally; awaiting change");
        Action::await_change()
    } else {
        Action::requeue(Duration::from_secs(ctx.cfg.requeue_secs))
    }
}
