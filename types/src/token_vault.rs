use crate::{ResourceStatus, TimeoutsSpec};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token vault used when [`TokenVaultCmkSpec::token_vault_id`] is unset.
pub const DEFAULT_TOKEN_VAULT_ID: &str = "default";

/// [`TokenVaultCmkSpec`] selects the KMS key that encrypts an AgentCore
/// token vault. The vault always exists, so creating this resource sets
/// the key and deleting it reverts the vault to a service-managed key.
#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "agentcore.beebs.dev",
    version = "v1",
    kind = "TokenVaultCmk",
    plural = "tokenvaultcmks",
    derive = "PartialEq",
    status = "ResourceStatus",
    namespaced
)]
#[kube(derive = "Default")]
#[kube(
    printcolumn = "{\"jsonPath\": \".spec.kmsConfiguration.keyType\", \"name\": \"KEY\", \"type\": \"string\" }"
)]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.phase\", \"name\": \"PHASE\", \"type\": \"string\" }"
)]
pub struct TokenVaultCmkSpec {
    #[serde(rename = "tokenVaultId")]
    pub token_vault_id: Option<String>,

    #[serde(rename = "kmsConfiguration")]
    pub kms_configuration: KmsConfiguration,

    #[serde(rename = "importId")]
    pub import_id: Option<String>,

    pub timeouts: Option<TimeoutsSpec>,
}

impl TokenVaultCmkSpec {
    pub fn token_vault_id(&self) -> &str {
        self.token_vault_id
            .as_deref()
            .unwrap_or(DEFAULT_TOKEN_VAULT_ID)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct KmsConfiguration {
    #[serde(rename = "keyType")]
    pub key_type: KeyType,

    /// Required when `keyType` is `CustomerManagedKey`.
    #[serde(rename = "kmsKeyArn")]
    pub kms_key_arn: Option<String>,
}

impl KmsConfiguration {
    /// The configuration a token vault reverts to when no customer
    /// managed key is declared.
    pub fn service_managed() -> Self {
        KmsConfiguration {
            key_type: KeyType::ServiceManagedKey,
            kms_key_arn: None,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum KeyType {
    CustomerManagedKey,
    #[default]
    ServiceManagedKey,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::CustomerManagedKey => write!(f, "CustomerManagedKey"),
            KeyType::ServiceManagedKey => write!(f, "ServiceManagedKey"),
        }
    }
}
