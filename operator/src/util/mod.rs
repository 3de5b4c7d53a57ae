use const_format::concatcp;
use std::time::Duration;

pub mod finalizer;
pub mod messages;
pub mod mutex_kv;
pub mod patch;
pub mod retry;
pub mod waiter;

#[cfg(feature = "metrics")]
pub mod metrics;

mod error;

pub use error::*;

/// API group of every AgentCore custom resource.
pub const API_GROUP: &str = "agentcore.beebs.dev";

/// The default interval for requeuing a managed resource to detect drift.
pub const RESYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Requeue interval while the remote object is settling on its own.
pub(crate) const SETTLE_INTERVAL: Duration = Duration::from_secs(10);

/// Requeue interval after a retryable reconciliation error.
pub(crate) const ERROR_REQUEUE_INTERVAL: Duration = Duration::from_secs(5);

/// Name of the kubernetes resource finalizer field.
pub(crate) const FINALIZER_NAME: &str = concatcp!(API_GROUP, "/finalizer");

/// Name of the kubernetes resource manager.
pub(crate) const MANAGER_NAME: &str = "agentcore-operator";
