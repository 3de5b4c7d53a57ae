use crate::{ResourceStatus, TimeoutsSpec};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// [`MemorySpec`] is the configuration for the [`Memory`] resource, which
/// represents an AgentCore memory store. Strategies that extract long-term
/// memories are managed separately with
/// [`MemoryStrategy`](crate::MemoryStrategy) resources that reference the
/// memory by id.
#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "agentcore.beebs.dev",
    version = "v1",
    kind = "Memory",
    plural = "memories",
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
pub struct MemorySpec {
    /// Name of the memory. Changing it replaces the memory.
    pub name: String,

    pub description: Option<String>,

    /// Number of days short-term events are retained.
    #[serde(rename = "eventExpiryDuration")]
    pub event_expiry_duration: i32,

    /// KMS key used to encrypt the memory. Changing it replaces the memory.
    #[serde(rename = "encryptionKeyArn")]
    pub encryption_key_arn: Option<String>,

    /// IAM role the service assumes to run memory strategies.
    #[serde(rename = "memoryExecutionRoleArn")]
    pub memory_execution_role_arn: Option<String>,

    /// Adopt an existing memory with this id instead of creating one.
    #[serde(rename = "importId")]
    pub import_id: Option<String>,

    pub timeouts: Option<TimeoutsSpec>,
}
