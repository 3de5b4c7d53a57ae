use crate::{
    api::AgentCoreControl,
    controller::{self, Settings},
    util::Error,
};
use agentcore_types::WorkloadIdentity;
use kube::Client;
use std::{sync::Arc, time::Duration};

mod handler;

pub use handler::WorkloadIdentityHandler;

/// Entrypoint for the `WorkloadIdentity` controller.
pub async fn run(
    client: Client,
    control: Arc<dyn AgentCoreControl>,
    resync_interval: Duration,
) -> Result<(), Error> {
    let settings = Settings {
        tag: "workload_identity",
        resync_interval,
    };
    controller::run::<WorkloadIdentity, _>(client, WorkloadIdentityHandler::new(control), settings).await
}
