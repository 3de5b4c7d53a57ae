//! Kubernetes reconciliation shared by every AgentCore kind.
//!
//! Each controller binary subcommand runs [`run`] with the custom
//! resource type and the [`Handler`] that manages its remote object.

use crate::{
    handler::Handler,
    util::{patch::Object, Error},
};
use futures::stream::StreamExt;
use kube::{api::ListParams, client::Client, runtime::Controller, Api};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

#[cfg(feature = "metrics")]
use crate::util::metrics::ControllerMetrics;

mod actions;
mod reconcile;

pub use reconcile::ResourceAction;

/// Per-controller settings.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Short name of the controller, used to name its metrics.
    pub tag: &'static str,

    /// How often a ready resource is re-read to detect drift.
    pub resync_interval: Duration,
}

/// Entrypoint for a controller of `K` resources backed by `handler`.
pub async fn run<K, H>(client: Client, handler: H, settings: Settings) -> Result<(), Error>
where
    K: Object,
    H: Handler<Spec = K::Spec>,
{
    info!(kind = H::KIND, resync_interval = ?settings.resync_interval, "starting controller");

    // Preparation of resources used by the `kube_runtime::Controller`
    let crd_api: Api<K> = Api::all(client.clone());
    let context = Arc::new(ContextData::new(client, handler, settings));

    // The controller comes from the `kube_runtime` crate and manages the
    // reconciliation process. `reconcile` is called each time a resource
    // is created, updated or deleted, and again whenever it requeues.
    Controller::new(crd_api, ListParams::default())
        .run(
            reconcile::reconcile::<K, H>,
            reconcile::on_error::<K, H>,
            context,
        )
        .for_each(|reconciliation_result| async move {
            if let Err(err) = reconciliation_result {
                warn!(error = ?err, "reconciliation error");
            }
        })
        .await;
    Ok(())
}

/// Context injected with each `reconcile` and `on_error` method invocation.
pub(crate) struct ContextData<H> {
    /// Kubernetes client to make Kubernetes API requests with.
    client: Client,

    /// Manages the remote object behind each resource.
    handler: H,

    resync_interval: Duration,

    #[cfg(feature = "metrics")]
    metrics: ControllerMetrics,
}

impl<H> ContextData<H> {
    /// Constructs a new instance of ContextData.
    pub fn new(client: Client, handler: H, settings: Settings) -> Self {
        #[cfg(feature = "metrics")]
        {
            ContextData {
                client,
                handler,
                resync_interval: settings.resync_interval,
                metrics: ControllerMetrics::new(settings.tag),
            }
        }
        #[cfg(not(feature = "metrics"))]
        {
            ContextData {
                client,
                handler,
                resync_interval: settings.resync_interval,
            }
        }
    }
}
