use crate::{ResourceStatus, TimeoutsSpec};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// [`GatewayTargetSpec`] registers a tool source (a Lambda function, an
/// OpenAPI schema or a Smithy model) behind an existing AgentCore gateway.
#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "agentcore.beebs.dev",
    version = "v1",
    kind = "GatewayTarget",
    plural = "gatewaytargets",
    derive = "PartialEq",
    status = "ResourceStatus",
    namespaced
)]
#[kube(derive = "Default")]
#[kube(
    printcolumn = "{\"jsonPath\": \".spec.gatewayIdentifier\", \"name\": \"GATEWAY\", \"type\": \"string\" }"
)]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.phase\", \"name\": \"PHASE\", \"type\": \"string\" }"
)]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.lastUpdated\", \"name\": \"AGE\", \"type\": \"date\" }"
)]
pub struct GatewayTargetSpec {
    /// Identifier or ARN of the parent gateway.
    #[serde(rename = "gatewayIdentifier")]
    pub gateway_identifier: String,

    pub name: String,

    pub description: Option<String>,

    /// Where the target's tools come from. Exactly one of the MCP
    /// variants must be set. Switching between variants replaces
    /// the target.
    #[serde(rename = "targetConfiguration")]
    pub target_configuration: TargetConfiguration,

    /// How the gateway authenticates against the target.
    #[serde(rename = "credentialProviderConfiguration")]
    pub credential_provider_configuration: Option<CredentialProviderConfiguration>,

    /// Adopt an existing target with this id instead of creating one.
    #[serde(rename = "importId")]
    pub import_id: Option<String>,

    pub timeouts: Option<TimeoutsSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct TargetConfiguration {
    pub mcp: McpTargetConfiguration,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct McpTargetConfiguration {
    pub lambda: Option<LambdaTargetConfiguration>,

    #[serde(rename = "openApiSchema")]
    pub open_api_schema: Option<ApiSchemaConfiguration>,

    #[serde(rename = "smithyModel")]
    pub smithy_model: Option<ApiSchemaConfiguration>,
}

impl McpTargetConfiguration {
    /// Names the variants that are set, in declaration order.
    pub fn configured_types(&self) -> Vec<&'static str> {
        let mut types = Vec::new();
        if self.lambda.is_some() {
            types.push("lambda");
        }
        if self.open_api_schema.is_some() {
            types.push("openApiSchema");
        }
        if self.smithy_model.is_some() {
            types.push("smithyModel");
        }
        types
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct LambdaTargetConfiguration {
    #[serde(rename = "lambdaArn")]
    pub lambda_arn: String,

    /// Tool definitions exposed by the function.
    #[serde(rename = "toolSchema")]
    pub tool_schema: ApiSchemaConfiguration,
}

/// A schema document, either stored in S3 or provided inline.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ApiSchemaConfiguration {
    pub s3: Option<S3Configuration>,

    #[serde(rename = "inlinePayload")]
    pub inline_payload: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct S3Configuration {
    pub uri: Option<String>,

    #[serde(rename = "bucketOwnerAccountId")]
    pub bucket_owner_account_id: Option<String>,
}

/// Exactly one credential provider should be set.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct CredentialProviderConfiguration {
    /// Use the gateway's own IAM role. The object carries no fields.
    #[serde(rename = "gatewayIamRole")]
    pub gateway_iam_role: Option<GatewayIamRoleProvider>,

    #[serde(rename = "apiKey")]
    pub api_key: Option<ApiKeyCredentialProvider>,

    pub oauth: Option<OAuthCredentialProvider>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct GatewayIamRoleProvider {}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ApiKeyCredentialProvider {
    #[serde(rename = "providerArn")]
    pub provider_arn: String,

    /// `Header` or `QueryParameter`.
    #[serde(rename = "credentialLocation")]
    pub credential_location: Option<String>,

    #[serde(rename = "credentialParameterName")]
    pub credential_parameter_name: Option<String>,

    #[serde(rename = "credentialPrefix")]
    pub credential_prefix: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct OAuthCredentialProvider {
    #[serde(rename = "providerArn")]
    pub provider_arn: String,

    pub scopes: Vec<String>,

    #[serde(rename = "customParameters")]
    pub custom_parameters: Option<BTreeMap<String, String>>,
}
