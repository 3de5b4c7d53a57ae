use crate::{
    api::AgentCoreControl,
    controller::{self, Settings},
    util::Error,
};
use agentcore_types::TokenVaultCmk;
use kube::Client;
use std::{sync::Arc, time::Duration};

mod handler;

pub use handler::TokenVaultHandler;

/// Entrypoint for the `TokenVaultCmk` controller.
pub async fn run(
    client: Client,
    control: Arc<dyn AgentCoreControl>,
    resync_interval: Duration,
) -> Result<(), Error> {
    let settings = Settings {
        tag: "token_vault_cmk",
        resync_interval,
    };
    controller::run::<TokenVaultCmk, _>(client, TokenVaultHandler::new(control), settings).await
}
