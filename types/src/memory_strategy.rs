use crate::{ResourceStatus, TimeoutsSpec};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// [`MemoryStrategySpec`] describes a single extraction strategy attached
/// to a [`Memory`](crate::Memory). Strategies live inside their parent
/// memory in the control plane, so every mutation goes through the
/// parent and is serialized per memory by the controller.
#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "agentcore.beebs.dev",
    version = "v1",
    kind = "MemoryStrategy",
    plural = "memorystrategies",
    derive = "PartialEq",
    status = "ResourceStatus",
    namespaced
)]
#[kube(derive = "Default")]
#[kube(
    printcolumn = "{\"jsonPath\": \".spec.memoryId\", \"name\": \"MEMORY\", \"type\": \"string\" }"
)]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.phase\", \"name\": \"PHASE\", \"type\": \"string\" }"
)]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.lastUpdated\", \"name\": \"AGE\", \"type\": \"date\" }"
)]
pub struct MemoryStrategySpec {
    /// Identifier of the parent memory.
    #[serde(rename = "memoryId")]
    pub memory_id: String,

    /// Name of the strategy, unique within the memory. Changing it
    /// replaces the strategy.
    pub name: String,

    /// Kind of extraction performed. Changing it replaces the strategy.
    #[serde(rename = "type")]
    pub strategy_type: StrategyType,

    pub description: Option<String>,

    /// Namespaces the extracted records are written to,
    /// e.g. `"/users/{actorId}/facts"`.
    pub namespaces: Option<Vec<String>>,

    /// Adopt an existing strategy with this id instead of creating one.
    #[serde(rename = "importId")]
    pub import_id: Option<String>,

    pub timeouts: Option<TimeoutsSpec>,
}

/// The extraction behaviour of a [`MemoryStrategy`].
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum StrategyType {
    #[default]
    Semantic,
    Summary,
    UserPreference,
    Custom,
}

impl FromStr for StrategyType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Semantic" | "SEMANTIC" => Ok(StrategyType::Semantic),
            "Summary" | "SUMMARIZATION" => Ok(StrategyType::Summary),
            "UserPreference" | "USER_PREFERENCE" => Ok(StrategyType::UserPreference),
            "Custom" | "CUSTOM" => Ok(StrategyType::Custom),
            _ => Err(()),
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyType::Semantic => write!(f, "Semantic"),
            StrategyType::Summary => write!(f, "Summary"),
            StrategyType::UserPreference => write!(f, "UserPreference"),
            StrategyType::Custom => write!(f, "Custom"),
        }
    }
}
