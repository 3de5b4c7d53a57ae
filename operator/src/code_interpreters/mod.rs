use crate::{
    api::AgentCoreControl,
    controller::{self, Settings},
    util::Error,
};
use agentcore_types::CodeInterpreter;
use kube::Client;
use std::{sync::Arc, time::Duration};

mod handler;

pub use handler::CodeInterpreterHandler;

/// Entrypoint for the `CodeInterpreter` controller.
pub async fn run(
    client: Client,
    control: Arc<dyn AgentCoreControl>,
    resync_interval: Duration,
) -> Result<(), Error> {
    let settings = Settings {
        tag: "code_interpreter",
        resync_interval,
    };
    controller::run::<CodeInterpreter, _>(client, CodeInterpreterHandler::new(control), settings).await
}
