use agentcore_operator::{
    api::{sdk::SdkControlPlane, AgentCoreControl},
    code_interpreters, gateway_targets, memories, memory_strategies, token_vaults,
    util::RESYNC_INTERVAL,
    workload_identities,
};
use clap::{Parser, Subcommand};
use kube::client::Client;
use std::{sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

/// Top-level CLI configuration for the binary. Any command line
/// flags should go in here.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Prometheus metrics server scrape port. Disabled by default.
    #[cfg(feature = "metrics")]
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,

    /// AWS region of the AgentCore control plane. Falls back to the
    /// standard AWS configuration chain.
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Overrides the control plane endpoint, e.g. for a local emulator.
    #[arg(long, env = "AGENTCORE_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// How often a ready resource is re-read to detect drift.
    #[arg(long, env = "RESYNC_INTERVAL", value_parser = parse_interval)]
    resync_interval: Option<Duration>,
}

fn parse_interval(value: &str) -> Result<Duration, String> {
    parse_duration::parse(value).map_err(|err| err.to_string())
}

/// List of subcommands for the binary. Clap will convert the
/// name of each enum variant to kebab-case for the CLI.
/// e.g. `ManageMemories` becomes `manage-memories`.
#[derive(Subcommand)]
enum Command {
    ManageMemories,
    ManageMemoryStrategies,
    ManageGatewayTargets,
    ManageTokenVaultCmks,
    ManageWorkloadIdentities,
    ManageCodeInterpreters,
}

/// Secondary entrypoint that runs the appropriate subcommand.
async fn run(client: Client) {
    let cli = Cli::parse();

    #[cfg(feature = "metrics")]
    if let Some(metrics_port) = cli.metrics_port {
        tokio::spawn(agentcore_operator::metrics::run_server(metrics_port));
    }

    let control: Arc<dyn AgentCoreControl> =
        Arc::new(SdkControlPlane::from_env(cli.region, cli.endpoint_url).await);
    let resync_interval = cli.resync_interval.unwrap_or(RESYNC_INTERVAL);

    match cli.command {
        Command::ManageMemories => memories::run(client, control, resync_interval).await,
        Command::ManageMemoryStrategies => {
            memory_strategies::run(client, control, resync_interval).await
        }
        Command::ManageGatewayTargets => {
            gateway_targets::run(client, control, resync_interval).await
        }
        Command::ManageTokenVaultCmks => token_vaults::run(client, control, resync_interval).await,
        Command::ManageWorkloadIdentities => {
            workload_identities::run(client, control, resync_interval).await
        }
        Command::ManageCodeInterpreters => {
            code_interpreters::run(client, control, resync_interval).await
        }
    }
    .unwrap();

    panic!("exited unexpectedly");
}

/// Main entrypoint that sets up the environment before running the secondary entrypoint `run`.
#[tokio::main]
async fn main() {
    // Any panic, on any thread, takes the process down so the
    // container is restarted.
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_panic(info);
        std::process::exit(1);
    }));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // In-cluster, the kubeconfig is provided by the service account.
    let client: Client = Client::try_default()
        .await
        .expect("Expected a valid KUBECONFIG environment variable.");

    run(client).await;

    // The controllers and metrics server never exit without a panic.
    panic!("exited prematurely");
}
