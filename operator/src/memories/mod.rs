use crate::{
    api::AgentCoreControl,
    controller::{self, Settings},
    util::Error,
};
use agentcore_types::Memory;
use kube::Client;
use std::{sync::Arc, time::Duration};

mod handler;

pub use handler::MemoryHandler;

/// Entrypoint for the `Memory` controller.
pub async fn run(
    client: Client,
    control: Arc<dyn AgentCoreControl>,
    resync_interval: Duration,
) -> Result<(), Error> {
    let settings = Settings {
        tag: "memory",
        resync_interval,
    };
    controller::run::<Memory, _>(client, MemoryHandler::new(control), settings).await
}
