//! Kubernetes controllers that manage Amazon Bedrock AgentCore
//! resources through the AgentCore control plane.
//!
//! Each resource module (`memories`, `gateway_targets`, ...) pairs a
//! [`handler::Handler`] implementation with a `run` entrypoint that
//! drives it from the shared [`controller`].

pub mod api;
pub mod controller;
pub mod handler;
pub mod util;

pub mod code_interpreters;
pub mod gateway_targets;
pub mod memories;
pub mod memory_strategies;
pub mod token_vaults;
pub mod workload_identities;

#[cfg(feature = "metrics")]
pub mod metrics;
