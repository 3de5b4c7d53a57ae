use crate::{ResourceStatus, TimeoutsSpec};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// [`WorkloadIdentitySpec`] declares an agent workload identity, which
/// agents use to obtain OAuth2 tokens and API keys from the token vault.
#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "agentcore.beebs.dev",
    version = "v1",
    kind = "WorkloadIdentity",
    plural = "workloadidentities",
    derive = "PartialEq",
    status = "ResourceStatus",
    namespaced
)]
#[kube(derive = "Default")]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.phase\", \"name\": \"PHASE\", \"type\": \"string\" }"
)]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.lastUpdated\", \"name\": \"AGE\", \"type\": \"date\" }"
)]
pub struct WorkloadIdentitySpec {
    /// Name of the identity. This is also its identifier, so
    /// changing it replaces the identity.
    pub name: String,

    /// Return URLs allowed at the end of an OAuth2 authorization flow.
    /// Order is not significant.
    #[serde(rename = "allowedResourceOauth2ReturnUrls")]
    pub allowed_resource_oauth2_return_urls: Option<Vec<String>>,

    #[serde(rename = "importId")]
    pub import_id: Option<String>,

    pub timeouts: Option<TimeoutsSpec>,
}
