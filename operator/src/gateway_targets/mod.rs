use crate::{
    api::AgentCoreControl,
    controller::{self, Settings},
    util::Error,
};
use agentcore_types::GatewayTarget;
use kube::Client;
use std::{sync::Arc, time::Duration};

mod handler;

pub use handler::GatewayTargetHandler;

/// Entrypoint for the `GatewayTarget` controller.
pub async fn run(
    client: Client,
    control: Arc<dyn AgentCoreControl>,
    resync_interval: Duration,
) -> Result<(), Error> {
    let settings = Settings {
        tag: "gateway_target",
        resync_interval,
    };
    controller::run::<GatewayTarget, _>(client, GatewayTargetHandler::new(control), settings).await
}
