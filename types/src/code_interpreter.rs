use crate::{ResourceStatus, TimeoutsSpec};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// [`CodeInterpreterSpec`] declares a custom AgentCore code interpreter.
/// Code interpreters cannot be modified in place; any change to the spec
/// replaces the remote object.
#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "agentcore.beebs.dev",
    version = "v1",
    kind = "CodeInterpreter",
    plural = "codeinterpreters",
    derive = "PartialEq",
    status = "ResourceStatus",
    namespaced
)]
#[kube(derive = "Default")]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.id\", \"name\": \"ID\", \"type\": \"string\" }"
)]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.phase\", \"name\": \"PHASE\", \"type\": \"string\" }"
)]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.lastUpdated\", \"name\": \"AGE\", \"type\": \"date\" }"
)]
pub struct CodeInterpreterSpec {
    pub name: String,

    pub description: Option<String>,

    /// IAM role the interpreter sessions run as.
    #[serde(rename = "executionRoleArn")]
    pub execution_role_arn: Option<String>,

    #[serde(rename = "networkConfiguration")]
    pub network_configuration: NetworkConfiguration,

    #[serde(rename = "importId")]
    pub import_id: Option<String>,

    pub timeouts: Option<TimeoutsSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct NetworkConfiguration {
    #[serde(rename = "networkMode")]
    pub network_mode: NetworkMode,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum NetworkMode {
    Public,
    #[default]
    Sandbox,
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkMode::Public => write!(f, "Public"),
            NetworkMode::Sandbox => write!(f, "Sandbox"),
        }
    }
}
