//! The AgentCore control plane as seen by the handlers.
//!
//! [`AgentCoreControl`] has one method per remote operation. The shapes
//! in this module are what the handlers need from the wire types and
//! nothing more; the `sdk` adapter converts to and from the AWS SDK.

use agentcore_types::{
    CredentialProviderConfiguration, KmsConfiguration, NetworkMode, StrategyType,
    TargetConfiguration,
};
use async_trait::async_trait;
use std::fmt;

mod error;
pub mod tool_schema;

#[cfg(feature = "aws")]
pub mod sdk;

#[cfg(test)]
pub mod fake;

pub use error::*;

/// Declares a remote status enum that keeps values it does not know
/// about instead of failing to parse them.
macro_rules! remote_status {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub enum $name {
            $($variant,)+
            Unknown(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $wire,)+
                    $name::Unknown(value) => value,
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                match value {
                    $($wire => $name::$variant,)+
                    other => $name::Unknown(other.to_owned()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

remote_status!(
    /// Lifecycle status of a memory.
    MemoryStatus {
        Creating => "CREATING",
        Active => "ACTIVE",
        Failed => "FAILED",
        Deleting => "DELETING",
    }
);

remote_status!(
    /// Lifecycle status of a strategy within a memory.
    StrategyStatus {
        Creating => "CREATING",
        Active => "ACTIVE",
        Deleting => "DELETING",
        Failed => "FAILED",
    }
);

remote_status!(
    /// Lifecycle status of a gateway target.
    TargetStatus {
        Creating => "CREATING",
        Updating => "UPDATING",
        UpdateUnsuccessful => "UPDATE_UNSUCCESSFUL",
        Deleting => "DELETING",
        Ready => "READY",
        Failed => "FAILED",
    }
);

remote_status!(
    /// Lifecycle status of a code interpreter.
    CodeInterpreterStatus {
        Creating => "CREATING",
        CreateFailed => "CREATE_FAILED",
        Ready => "READY",
        Deleting => "DELETING",
        DeleteFailed => "DELETE_FAILED",
        Deleted => "DELETED",
    }
);

#[derive(Clone, Debug, PartialEq)]
pub struct Memory {
    pub id: String,
    pub arn: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub event_expiry_duration: i32,
    pub encryption_key_arn: Option<String>,
    pub memory_execution_role_arn: Option<String>,
    pub status: MemoryStatus,
    pub failure_reason: Option<String>,
    pub strategies: Vec<MemoryStrategy>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MemoryStrategy {
    pub strategy_id: String,
    pub name: String,
    pub strategy_type: StrategyType,
    pub description: Option<String>,
    pub namespaces: Vec<String>,
    pub status: StrategyStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateMemoryInput {
    pub name: String,
    pub description: Option<String>,
    pub event_expiry_duration: i32,
    pub encryption_key_arn: Option<String>,
    pub memory_execution_role_arn: Option<String>,
    pub client_token: String,
}

/// Changes to a memory. Unset fields are left as they are.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateMemoryInput {
    pub memory_id: String,
    pub description: Option<String>,
    pub event_expiry_duration: Option<i32>,
    pub memory_execution_role_arn: Option<String>,
    pub strategies: StrategyChanges,
    pub client_token: String,
}

/// Strategy mutations applied by a single `update_memory` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrategyChanges {
    pub add: Vec<StrategyInput>,
    pub modify: Vec<ModifyStrategyInput>,
    pub delete: Vec<String>,
}

impl StrategyChanges {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.modify.is_empty() && self.delete.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StrategyInput {
    pub name: String,
    pub strategy_type: StrategyType,
    pub description: Option<String>,
    pub namespaces: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModifyStrategyInput {
    pub strategy_id: String,
    pub description: Option<String>,
    pub namespaces: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GatewayTarget {
    pub target_id: String,
    pub gateway_arn: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub status: TargetStatus,
    pub status_reasons: Vec<String>,
    pub target_configuration: TargetConfiguration,
    pub credential_provider_configuration: Option<CredentialProviderConfiguration>,
}

/// Body of a create or update gateway target request.
#[derive(Clone, Debug, PartialEq)]
pub struct GatewayTargetInput {
    pub gateway_identifier: String,
    pub name: String,
    pub description: Option<String>,
    pub target_configuration: TargetConfiguration,
    pub credential_provider_configuration: Option<CredentialProviderConfiguration>,
    pub client_token: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TokenVault {
    pub token_vault_id: String,
    pub kms_configuration: KmsConfiguration,
    pub last_modified_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorkloadIdentity {
    pub name: String,
    pub workload_identity_arn: Option<String>,
    pub allowed_resource_oauth2_return_urls: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CodeInterpreter {
    pub code_interpreter_id: String,
    pub code_interpreter_arn: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub execution_role_arn: Option<String>,
    pub network_mode: NetworkMode,
    pub status: CodeInterpreterStatus,
    pub failure_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateCodeInterpreterInput {
    pub name: String,
    pub description: Option<String>,
    pub execution_role_arn: Option<String>,
    pub network_mode: NetworkMode,
    pub client_token: String,
}

/// The subset of the AgentCore control plane used by the handlers.
#[async_trait]
pub trait AgentCoreControl: Send + Sync {
    async fn create_memory(&self, input: CreateMemoryInput) -> Result<Memory, ApiError>;

    async fn get_memory(&self, memory_id: &str) -> Result<Memory, ApiError>;

    /// Updates a memory and/or adds, modifies and deletes its strategies.
    async fn update_memory(&self, input: UpdateMemoryInput) -> Result<Memory, ApiError>;

    async fn delete_memory(&self, memory_id: &str, client_token: &str) -> Result<(), ApiError>;

    async fn create_gateway_target(
        &self,
        input: GatewayTargetInput,
    ) -> Result<GatewayTarget, ApiError>;

    async fn get_gateway_target(
        &self,
        gateway_identifier: &str,
        target_id: &str,
    ) -> Result<GatewayTarget, ApiError>;

    async fn update_gateway_target(
        &self,
        target_id: &str,
        input: GatewayTargetInput,
    ) -> Result<GatewayTarget, ApiError>;

    async fn delete_gateway_target(
        &self,
        gateway_identifier: &str,
        target_id: &str,
    ) -> Result<(), ApiError>;

    async fn set_token_vault_cmk(
        &self,
        token_vault_id: &str,
        kms_configuration: &KmsConfiguration,
    ) -> Result<TokenVault, ApiError>;

    async fn get_token_vault(&self, token_vault_id: &str) -> Result<TokenVault, ApiError>;

    async fn create_workload_identity(
        &self,
        name: &str,
        allowed_resource_oauth2_return_urls: &[String],
    ) -> Result<WorkloadIdentity, ApiError>;

    async fn get_workload_identity(&self, name: &str) -> Result<WorkloadIdentity, ApiError>;

    async fn update_workload_identity(
        &self,
        name: &str,
        allowed_resource_oauth2_return_urls: &[String],
    ) -> Result<WorkloadIdentity, ApiError>;

    async fn delete_workload_identity(&self, name: &str) -> Result<(), ApiError>;

    async fn create_code_interpreter(
        &self,
        input: CreateCodeInterpreterInput,
    ) -> Result<CodeInterpreter, ApiError>;

    async fn get_code_interpreter(&self, code_interpreter_id: &str)
        -> Result<CodeInterpreter, ApiError>;

    async fn delete_code_interpreter(
        &self,
        code_interpreter_id: &str,
        client_token: &str,
    ) -> Result<(), ApiError>;
}

/// Converts a "not found" error into `None`, for reads where absence
/// is an expected answer.
pub fn found<T>(result: Result<T, ApiError>) -> Result<Option<T>, ApiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}
