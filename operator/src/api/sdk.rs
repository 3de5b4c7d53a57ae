//! [`AgentCoreControl`] backed by the AWS SDK for the
//! `bedrock-agentcore-control` service.

use super::{tool_schema, *};
use agentcore_types::{
    ApiKeyCredentialProvider, ApiSchemaConfiguration, GatewayIamRoleProvider, KeyType,
    LambdaTargetConfiguration, McpTargetConfiguration, OAuthCredentialProvider, S3Configuration,
};
use aws_sdk_bedrockagentcorecontrol::{
    error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::DateTimeFormat,
    types as sdk, Client,
};
use tracing::debug;

/// Control plane client that talks to AWS.
#[derive(Clone)]
pub struct SdkControlPlane {
    client: Client,
}

impl SdkControlPlane {
    pub fn new(client: Client) -> Self {
        SdkControlPlane { client }
    }

    /// Loads credentials and region the standard AWS way. `region` and
    /// `endpoint_url` override what the environment provides.
    pub async fn from_env(region: Option<String>, endpoint_url: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        if let Some(endpoint_url) = endpoint_url {
            debug!(endpoint_url = %endpoint_url, "using custom control plane endpoint");
            loader = loader.endpoint_url(endpoint_url);
        }
        let config = loader.load().await;
        SdkControlPlane::new(Client::new(&config))
    }
}

/// Reduces an SDK error to its error code and message. Transport
/// failures get synthetic codes that classify as internal errors.
fn api_error<E, R>(err: SdkError<E, R>) -> ApiError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: fmt::Debug,
{
    match err {
        SdkError::ServiceError(context) => {
            let err = context.err();
            ApiError::new(
                err.code().unwrap_or("Unknown"),
                err.message().unwrap_or_default(),
            )
        }
        SdkError::TimeoutError(_) => ApiError::new("RequestTimeout", "request timed out"),
        SdkError::DispatchFailure(failure) => {
            ApiError::new("DispatchFailure", format!("{:?}", failure))
        }
        other => ApiError::new("Unknown", DisplayErrorContext(&other).to_string()),
    }
}

fn invalid(err: BuildError) -> ApiError {
    ApiError::new(VALIDATION, err.to_string())
}

fn missing(what: &str) -> ApiError {
    ApiError::new("InvalidResponse", format!("response has no {}", what))
}

fn memory_from(memory: &sdk::Memory) -> Memory {
    Memory {
        id: memory.id().to_owned(),
        arn: Some(memory.arn().to_owned()),
        name: memory.name().to_owned(),
        description: memory.description().map(str::to_owned),
        event_expiry_duration: memory.event_expiry_duration(),
        encryption_key_arn: memory.encryption_key_arn().map(str::to_owned),
        memory_execution_role_arn: memory.memory_execution_role_arn().map(str::to_owned),
        status: MemoryStatus::from(memory.status().as_str()),
        failure_reason: memory.failure_reason().map(str::to_owned),
        strategies: memory.strategies().iter().map(strategy_from).collect(),
    }
}

fn strategy_from(strategy: &sdk::MemoryStrategy) -> MemoryStrategy {
    MemoryStrategy {
        strategy_id: strategy.strategy_id().to_owned(),
        name: strategy.name().to_owned(),
        strategy_type: strategy
            .r#type()
            .as_str()
            .parse()
            .unwrap_or(StrategyType::Custom),
        description: strategy.description().map(str::to_owned),
        namespaces: strategy.namespaces().to_vec(),
        // Strategies created before statuses existed report none.
        status: strategy
            .status()
            .map_or(StrategyStatus::Active, |status| {
                StrategyStatus::from(status.as_str())
            }),
    }
}

fn strategy_input(input: StrategyInput) -> Result<sdk::MemoryStrategyInput, ApiError> {
    Ok(match input.strategy_type {
        StrategyType::Semantic => sdk::MemoryStrategyInput::SemanticMemoryStrategy(
            sdk::SemanticMemoryStrategyInput::builder()
                .name(input.name)
                .set_description(input.description)
                .set_namespaces(input.namespaces)
                .build()
                .map_err(invalid)?,
        ),
        StrategyType::Summary => sdk::MemoryStrategyInput::SummaryMemoryStrategy(
            sdk::SummaryMemoryStrategyInput::builder()
                .name(input.name)
                .set_description(input.description)
                .set_namespaces(input.namespaces)
                .build()
                .map_err(invalid)?,
        ),
        StrategyType::UserPreference => sdk::MemoryStrategyInput::UserPreferenceMemoryStrategy(
            sdk::UserPreferenceMemoryStrategyInput::builder()
                .name(input.name)
                .set_description(input.description)
                .set_namespaces(input.namespaces)
                .build()
                .map_err(invalid)?,
        ),
        StrategyType::Custom => sdk::MemoryStrategyInput::CustomMemoryStrategy(
            sdk::CustomMemoryStrategyInput::builder()
                .name(input.name)
                .set_description(input.description)
                .set_namespaces(input.namespaces)
                .build()
                .map_err(invalid)?,
        ),
    })
}

fn strategy_changes(changes: StrategyChanges) -> Result<sdk::ModifyMemoryStrategies, ApiError> {
    let add = changes
        .add
        .into_iter()
        .map(strategy_input)
        .collect::<Result<Vec<_>, _>>()?;
    let modify = changes
        .modify
        .into_iter()
        .map(|modify| {
            sdk::ModifyMemoryStrategyInput::builder()
                .memory_strategy_id(modify.strategy_id)
                .set_description(modify.description)
                .set_namespaces(modify.namespaces)
                .build()
                .map_err(invalid)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let delete = changes
        .delete
        .into_iter()
        .map(|strategy_id| {
            sdk::DeleteMemoryStrategyInput::builder()
                .memory_strategy_id(strategy_id)
                .build()
                .map_err(invalid)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sdk::ModifyMemoryStrategies::builder()
        .set_add_memory_strategies((!add.is_empty()).then_some(add))
        .set_modify_memory_strategies((!modify.is_empty()).then_some(modify))
        .set_delete_memory_strategies((!delete.is_empty()).then_some(delete))
        .build())
}

fn s3_to_sdk(s3: &S3Configuration) -> sdk::S3Configuration {
    sdk::S3Configuration::builder()
        .set_uri(s3.uri.clone())
        .set_bucket_owner_account_id(s3.bucket_owner_account_id.clone())
        .build()
}

fn s3_from(s3: &sdk::S3Configuration) -> S3Configuration {
    S3Configuration {
        uri: s3.uri().map(str::to_owned),
        bucket_owner_account_id: s3.bucket_owner_account_id().map(str::to_owned),
    }
}

fn schema_to_sdk(schema: &ApiSchemaConfiguration) -> Result<sdk::ApiSchemaConfiguration, ApiError> {
    match (&schema.s3, &schema.inline_payload) {
        (Some(s3), None) => Ok(sdk::ApiSchemaConfiguration::S3(s3_to_sdk(s3))),
        (None, Some(payload)) => Ok(sdk::ApiSchemaConfiguration::InlinePayload(payload.clone())),
        _ => Err(ApiError::new(
            VALIDATION,
            "schema must set exactly one of s3 or inlinePayload",
        )),
    }
}

fn schema_from(schema: &sdk::ApiSchemaConfiguration) -> ApiSchemaConfiguration {
    match schema {
        sdk::ApiSchemaConfiguration::S3(s3) => ApiSchemaConfiguration {
            s3: Some(s3_from(s3)),
            inline_payload: None,
        },
        sdk::ApiSchemaConfiguration::InlinePayload(payload) => ApiSchemaConfiguration {
            s3: None,
            inline_payload: Some(payload.clone()),
        },
        _ => ApiSchemaConfiguration::default(),
    }
}

fn tool_to_sdk(tool: &tool_schema::ToolDefinition) -> Result<sdk::ToolDefinition, ApiError> {
    sdk::ToolDefinition::builder()
        .name(&tool.name)
        .description(&tool.description)
        .input_schema(schema_definition_to_sdk(&tool.input_schema)?)
        .set_output_schema(
            tool.output_schema
                .as_ref()
                .map(schema_definition_to_sdk)
                .transpose()?,
        )
        .build()
        .map_err(invalid)
}

fn schema_definition_to_sdk(
    schema: &tool_schema::SchemaDefinition,
) -> Result<sdk::SchemaDefinition, ApiError> {
    let properties = match &schema.properties {
        Some(properties) => Some(
            properties
                .iter()
                .map(|(name, property)| Ok((name.clone(), schema_definition_to_sdk(property)?)))
                .collect::<Result<_, ApiError>>()?,
        ),
        None => None,
    };
    let items = match &schema.items {
        Some(items) => Some(Box::new(schema_definition_to_sdk(items)?)),
        None => None,
    };
    sdk::SchemaDefinition::builder()
        .r#type(sdk::SchemaType::from(schema.schema_type.as_str()))
        .set_description(schema.description.clone())
        .set_properties(properties)
        .set_items(items)
        .set_required((!schema.required.is_empty()).then(|| schema.required.clone()))
        .build()
        .map_err(invalid)
}

fn tool_from(tool: &sdk::ToolDefinition) -> tool_schema::ToolDefinition {
    tool_schema::ToolDefinition {
        name: tool.name().to_owned(),
        description: tool.description().to_owned(),
        input_schema: tool
            .input_schema()
            .map(schema_definition_from)
            .unwrap_or_else(|| tool_schema::SchemaDefinition {
                schema_type: "object".to_owned(),
                description: None,
                items: None,
                properties: None,
                required: Vec::new(),
            }),
        output_schema: tool.output_schema().map(schema_definition_from),
    }
}

fn schema_definition_from(schema: &sdk::SchemaDefinition) -> tool_schema::SchemaDefinition {
    tool_schema::SchemaDefinition {
        schema_type: schema.r#type().as_str().to_owned(),
        description: schema.description().map(str::to_owned),
        items: schema
            .items()
            .map(|items| Box::new(schema_definition_from(items))),
        properties: schema.properties().map(|properties| {
            properties
                .iter()
                .map(|(name, property)| (name.clone(), schema_definition_from(property)))
                .collect()
        }),
        required: schema.required().to_vec(),
    }
}

fn target_to_sdk(config: &TargetConfiguration) -> Result<sdk::TargetConfiguration, ApiError> {
    let mcp = &config.mcp;
    let target = if let Some(lambda) = &mcp.lambda {
        let tool_schema = match (&lambda.tool_schema.s3, &lambda.tool_schema.inline_payload) {
            (Some(s3), None) => sdk::ToolSchema::S3(s3_to_sdk(s3)),
            (None, Some(payload)) => sdk::ToolSchema::InlinePayload(
                tool_schema::parse_tools(payload)?
                    .iter()
                    .map(tool_to_sdk)
                    .collect::<Result<_, _>>()?,
            ),
            _ => {
                return Err(ApiError::new(
                    VALIDATION,
                    "toolSchema must set exactly one of s3 or inlinePayload",
                ))
            }
        };
        sdk::McpTargetConfiguration::Lambda(
            sdk::McpLambdaTargetConfiguration::builder()
                .lambda_arn(&lambda.lambda_arn)
                .tool_schema(tool_schema)
                .build()
                .map_err(invalid)?,
        )
    } else if let Some(schema) = &mcp.open_api_schema {
        sdk::McpTargetConfiguration::OpenApiSchema(schema_to_sdk(schema)?)
    } else if let Some(schema) = &mcp.smithy_model {
        sdk::McpTargetConfiguration::SmithyModel(schema_to_sdk(schema)?)
    } else {
        return Err(ApiError::new(VALIDATION, "no MCP target configured"));
    };
    Ok(sdk::TargetConfiguration::Mcp(target))
}

fn target_from(config: Option<&sdk::TargetConfiguration>) -> TargetConfiguration {
    let mut mcp = McpTargetConfiguration::default();
    if let Some(sdk::TargetConfiguration::Mcp(target)) = config {
        match target {
            sdk::McpTargetConfiguration::Lambda(lambda) => {
                let tool_schema = match lambda.tool_schema() {
                    sdk::ToolSchema::S3(s3) => ApiSchemaConfiguration {
                        s3: Some(s3_from(s3)),
                        inline_payload: None,
                    },
                    sdk::ToolSchema::InlinePayload(tools) => ApiSchemaConfiguration {
                        s3: None,
                        inline_payload: Some(tool_schema::render_tools(
                            &tools.iter().map(tool_from).collect::<Vec<_>>(),
                        )),
                    },
                    _ => ApiSchemaConfiguration::default(),
                };
                mcp.lambda = Some(LambdaTargetConfiguration {
                    lambda_arn: lambda.lambda_arn().to_owned(),
                    tool_schema,
                });
            }
            sdk::McpTargetConfiguration::OpenApiSchema(schema) => {
                mcp.open_api_schema = Some(schema_from(schema))
            }
            sdk::McpTargetConfiguration::SmithyModel(schema) => {
                mcp.smithy_model = Some(schema_from(schema))
            }
            _ => {}
        }
    }
    TargetConfiguration { mcp }
}

fn credentials_to_sdk(
    config: &CredentialProviderConfiguration,
) -> Result<sdk::CredentialProviderConfiguration, ApiError> {
    let builder = sdk::CredentialProviderConfiguration::builder();
    let builder = if let Some(oauth) = &config.oauth {
        let provider = sdk::OAuthCredentialProvider::builder()
            .provider_arn(&oauth.provider_arn)
            .set_scopes(Some(oauth.scopes.clone()))
            .set_custom_parameters(
                oauth
                    .custom_parameters
                    .clone()
                    .map(|parameters| parameters.into_iter().collect()),
            )
            .build()
            .map_err(invalid)?;
        builder
            .credential_provider_type(sdk::CredentialProviderType::Oauth)
            .credential_provider(sdk::CredentialProvider::OauthCredentialProvider(provider))
    } else if let Some(api_key) = &config.api_key {
        let provider = sdk::ApiKeyCredentialProvider::builder()
            .provider_arn(&api_key.provider_arn)
            .set_credential_location(
                api_key
                    .credential_location
                    .as_deref()
                    .map(sdk::ApiKeyCredentialLocation::from),
            )
            .set_credential_parameter_name(api_key.credential_parameter_name.clone())
            .set_credential_prefix(api_key.credential_prefix.clone())
            .build()
            .map_err(invalid)?;
        builder
            .credential_provider_type(sdk::CredentialProviderType::ApiKey)
            .credential_provider(sdk::CredentialProvider::ApiKeyCredentialProvider(provider))
    } else {
        builder.credential_provider_type(sdk::CredentialProviderType::GatewayIamRole)
    };
    builder.build().map_err(invalid)
}

fn credentials_from(
    configs: &[sdk::CredentialProviderConfiguration],
) -> Option<CredentialProviderConfiguration> {
    let config = configs.first()?;
    let mut out = CredentialProviderConfiguration::default();
    match config.credential_provider() {
        Some(sdk::CredentialProvider::OauthCredentialProvider(oauth)) => {
            out.oauth = Some(OAuthCredentialProvider {
                provider_arn: oauth.provider_arn().to_owned(),
                scopes: oauth.scopes().to_vec(),
                custom_parameters: oauth.custom_parameters().map(|parameters| {
                    parameters
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                }),
            })
        }
        Some(sdk::CredentialProvider::ApiKeyCredentialProvider(api_key)) => {
            out.api_key = Some(ApiKeyCredentialProvider {
                provider_arn: api_key.provider_arn().to_owned(),
                credential_location: api_key
                    .credential_location()
                    .map(|location| location.as_str().to_owned()),
                credential_parameter_name: api_key.credential_parameter_name().map(str::to_owned),
                credential_prefix: api_key.credential_prefix().map(str::to_owned),
            })
        }
        _ => out.gateway_iam_role = Some(GatewayIamRoleProvider {}),
    }
    Some(out)
}

/// The create, get and update target outputs share their accessors.
macro_rules! gateway_target_from {
    ($out:expr) => {{
        let out = $out;
        GatewayTarget {
            target_id: out.target_id().to_owned(),
            gateway_arn: Some(out.gateway_arn().to_owned()),
            name: out.name().to_owned(),
            description: out.description().map(str::to_owned),
            status: TargetStatus::from(out.status().as_str()),
            status_reasons: out.status_reasons().to_vec(),
            target_configuration: target_from(out.target_configuration()),
            credential_provider_configuration: credentials_from(
                out.credential_provider_configurations(),
            ),
        }
    }};
}

fn kms_to_sdk(kms: &KmsConfiguration) -> Result<sdk::KmsConfiguration, ApiError> {
    let key_type = match kms.key_type {
        KeyType::CustomerManagedKey => sdk::KeyType::CustomerManagedKey,
        KeyType::ServiceManagedKey => sdk::KeyType::ServiceManagedKey,
    };
    sdk::KmsConfiguration::builder()
        .key_type(key_type)
        .set_kms_key_arn(kms.kms_key_arn.clone())
        .build()
        .map_err(invalid)
}

fn kms_from(kms: Option<&sdk::KmsConfiguration>) -> KmsConfiguration {
    let Some(kms) = kms else {
        return KmsConfiguration::service_managed();
    };
    KmsConfiguration {
        key_type: match kms.key_type() {
            sdk::KeyType::CustomerManagedKey => KeyType::CustomerManagedKey,
            _ => KeyType::ServiceManagedKey,
        },
        kms_key_arn: kms.kms_key_arn().map(str::to_owned),
    }
}

/// The set and get token vault outputs share their accessors.
macro_rules! token_vault_from {
    ($out:expr) => {{
        let out = $out;
        TokenVault {
            token_vault_id: out.token_vault_id().to_owned(),
            kms_configuration: kms_from(out.kms_configuration()),
            last_modified_date: out.last_modified_date().fmt(DateTimeFormat::DateTime).ok(),
        }
    }};
}

/// The create, get and update workload identity outputs share their
/// accessors.
macro_rules! workload_identity_from {
    ($out:expr) => {{
        let out = $out;
        WorkloadIdentity {
            name: out.name().to_owned(),
            workload_identity_arn: Some(out.workload_identity_arn().to_owned()),
            allowed_resource_oauth2_return_urls: out.allowed_resource_oauth2_return_urls().to_vec(),
        }
    }};
}

fn network_mode_to_sdk(mode: NetworkMode) -> sdk::CodeInterpreterNetworkMode {
    match mode {
        NetworkMode::Public => sdk::CodeInterpreterNetworkMode::Public,
        NetworkMode::Sandbox => sdk::CodeInterpreterNetworkMode::Sandbox,
    }
}

fn network_mode_from(config: Option<&sdk::CodeInterpreterNetworkConfiguration>) -> NetworkMode {
    match config.map(|config| config.network_mode()) {
        Some(sdk::CodeInterpreterNetworkMode::Public) => NetworkMode::Public,
        _ => NetworkMode::Sandbox,
    }
}

#[async_trait]
impl AgentCoreControl for SdkControlPlane {
    async fn create_memory(&self, input: CreateMemoryInput) -> Result<Memory, ApiError> {
        let out = self
            .client
            .create_memory()
            .name(input.name)
            .set_description(input.description)
            .event_expiry_duration(input.event_expiry_duration)
            .set_encryption_key_arn(input.encryption_key_arn)
            .set_memory_execution_role_arn(input.memory_execution_role_arn)
            .client_token(input.client_token)
            .send()
            .await
            .map_err(api_error)?;
        out.memory().map(memory_from).ok_or_else(|| missing("memory"))
    }

    async fn get_memory(&self, memory_id: &str) -> Result<Memory, ApiError> {
        let out = self
            .client
            .get_memory()
            .memory_id(memory_id)
            .send()
            .await
            .map_err(api_error)?;
        out.memory().map(memory_from).ok_or_else(|| missing("memory"))
    }

    async fn update_memory(&self, input: UpdateMemoryInput) -> Result<Memory, ApiError> {
        let strategies = if input.strategies.is_empty() {
            None
        } else {
            Some(strategy_changes(input.strategies)?)
        };
        let out = self
            .client
            .update_memory()
            .memory_id(input.memory_id)
            .set_description(input.description)
            .set_event_expiry_duration(input.event_expiry_duration)
            .set_memory_execution_role_arn(input.memory_execution_role_arn)
            .set_memory_strategies(strategies)
            .client_token(input.client_token)
            .send()
            .await
            .map_err(api_error)?;
        out.memory().map(memory_from).ok_or_else(|| missing("memory"))
    }

    async fn delete_memory(&self, memory_id: &str, client_token: &str) -> Result<(), ApiError> {
        self.client
            .delete_memory()
            .memory_id(memory_id)
            .client_token(client_token)
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn create_gateway_target(
        &self,
        input: GatewayTargetInput,
    ) -> Result<GatewayTarget, ApiError> {
        let credentials = input
            .credential_provider_configuration
            .as_ref()
            .map(credentials_to_sdk)
            .transpose()?;
        let out = self
            .client
            .create_gateway_target()
            .gateway_identifier(input.gateway_identifier)
            .name(input.name)
            .set_description(input.description)
            .target_configuration(target_to_sdk(&input.target_configuration)?)
            .set_credential_provider_configurations(credentials.map(|c| vec![c]))
            .set_client_token(input.client_token)
            .send()
            .await
            .map_err(api_error)?;
        Ok(gateway_target_from!(out))
    }

    async fn get_gateway_target(
        &self,
        gateway_identifier: &str,
        target_id: &str,
    ) -> Result<GatewayTarget, ApiError> {
        let out = self
            .client
            .get_gateway_target()
            .gateway_identifier(gateway_identifier)
            .target_id(target_id)
            .send()
            .await
            .map_err(api_error)?;
        Ok(gateway_target_from!(out))
    }

    async fn update_gateway_target(
        &self,
        target_id: &str,
        input: GatewayTargetInput,
    ) -> Result<GatewayTarget, ApiError> {
        let credentials = input
            .credential_provider_configuration
            .as_ref()
            .map(credentials_to_sdk)
            .transpose()?;
        let out = self
            .client
            .update_gateway_target()
            .gateway_identifier(input.gateway_identifier)
            .target_id(target_id)
            .name(input.name)
            .set_description(input.description)
            .target_configuration(target_to_sdk(&input.target_configuration)?)
            .set_credential_provider_configurations(credentials.map(|c| vec![c]))
            .send()
            .await
            .map_err(api_error)?;
        Ok(gateway_target_from!(out))
    }

    async fn delete_gateway_target(
        &self,
        gateway_identifier: &str,
        target_id: &str,
    ) -> Result<(), ApiError> {
        self.client
            .delete_gateway_target()
            .gateway_identifier(gateway_identifier)
            .target_id(target_id)
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn set_token_vault_cmk(
        &self,
        token_vault_id: &str,
        kms_configuration: &KmsConfiguration,
    ) -> Result<TokenVault, ApiError> {
        let out = self
            .client
            .set_token_vault_cmk()
            .token_vault_id(token_vault_id)
            .kms_configuration(kms_to_sdk(kms_configuration)?)
            .send()
            .await
            .map_err(api_error)?;
        Ok(token_vault_from!(out))
    }

    async fn get_token_vault(&self, token_vault_id: &str) -> Result<TokenVault, ApiError> {
        let out = self
            .client
            .get_token_vault()
            .token_vault_id(token_vault_id)
            .send()
            .await
            .map_err(api_error)?;
        Ok(token_vault_from!(out))
    }

    async fn create_workload_identity(
        &self,
        name: &str,
        allowed_resource_oauth2_return_urls: &[String],
    ) -> Result<WorkloadIdentity, ApiError> {
        let out = self
            .client
            .create_workload_identity()
            .name(name)
            .set_allowed_resource_oauth2_return_urls(Some(
                allowed_resource_oauth2_return_urls.to_vec(),
            ))
            .send()
            .await
            .map_err(api_error)?;
        Ok(workload_identity_from!(out))
    }

    async fn get_workload_identity(&self, name: &str) -> Result<WorkloadIdentity, ApiError> {
        let out = self
            .client
            .get_workload_identity()
            .name(name)
            .send()
            .await
            .map_err(api_error)?;
        Ok(workload_identity_from!(out))
    }

    async fn update_workload_identity(
        &self,
        name: &str,
        allowed_resource_oauth2_return_urls: &[String],
    ) -> Result<WorkloadIdentity, ApiError> {
        let out = self
            .client
            .update_workload_identity()
            .name(name)
            .set_allowed_resource_oauth2_return_urls(Some(
                allowed_resource_oauth2_return_urls.to_vec(),
            ))
            .send()
            .await
            .map_err(api_error)?;
        Ok(workload_identity_from!(out))
    }

    async fn delete_workload_identity(&self, name: &str) -> Result<(), ApiError> {
        self.client
            .delete_workload_identity()
            .name(name)
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn create_code_interpreter(
        &self,
        input: CreateCodeInterpreterInput,
    ) -> Result<CodeInterpreter, ApiError> {
        let network = sdk::CodeInterpreterNetworkConfiguration::builder()
            .network_mode(network_mode_to_sdk(input.network_mode))
            .build()
            .map_err(invalid)?;
        let out = self
            .client
            .create_code_interpreter()
            .name(&input.name)
            .set_description(input.description.clone())
            .set_execution_role_arn(input.execution_role_arn.clone())
            .network_configuration(network)
            .client_token(input.client_token)
            .send()
            .await
            .map_err(api_error)?;
        Ok(CodeInterpreter {
            code_interpreter_id: out.code_interpreter_id().to_owned(),
            code_interpreter_arn: Some(out.code_interpreter_arn().to_owned()),
            name: input.name,
            description: input.description,
            execution_role_arn: input.execution_role_arn,
            network_mode: input.network_mode,
            status: CodeInterpreterStatus::from(out.status().as_str()),
            failure_reason: None,
        })
    }

    async fn get_code_interpreter(
        &self,
        code_interpreter_id: &str,
    ) -> Result<CodeInterpreter, ApiError> {
        let out = self
            .client
            .get_code_interpreter()
            .code_interpreter_id(code_interpreter_id)
            .send()
            .await
            .map_err(api_error)?;
        Ok(CodeInterpreter {
            code_interpreter_id: out.code_interpreter_id().to_owned(),
            code_interpreter_arn: Some(out.code_interpreter_arn().to_owned()),
            name: out.name().to_owned(),
            description: out.description().map(str::to_owned),
            execution_role_arn: out.execution_role_arn().map(str::to_owned),
            network_mode: network_mode_from(out.network_configuration()),
            status: CodeInterpreterStatus::from(out.status().as_str()),
            failure_reason: out.failure_reason().map(str::to_owned),
        })
    }

    async fn delete_code_interpreter(
        &self,
        code_interpreter_id: &str,
        client_token: &str,
    ) -> Result<(), ApiError> {
        self.client
            .delete_code_interpreter()
            .code_interpreter_id(code_interpreter_id)
            .client_token(client_token)
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }
}
