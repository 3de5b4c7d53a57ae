use crate::{
    api::AgentCoreControl,
    controller::{self, Settings},
    util::Error,
};
use agentcore_types::MemoryStrategy;
use kube::Client;
use std::{sync::Arc, time::Duration};

mod handler;

pub use handler::MemoryStrategyHandler;

/// Entrypoint for the `MemoryStrategy` controller.
pub async fn run(
    client: Client,
    control: Arc<dyn AgentCoreControl>,
    resync_interval: Duration,
) -> Result<(), Error> {
    let settings = Settings {
        tag: "memory_strategy",
        resync_interval,
    };
    controller::run::<MemoryStrategy, _>(client, MemoryStrategyHandler::new(control), settings)
        .await
}
