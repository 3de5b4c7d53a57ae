use crate::{
    api::{
        self, found, tool_schema::canonical_payload, AgentCoreControl, GatewayTargetInput,
        TargetStatus,
    },
    handler::{
        declared_drift, Changes, CreationRecorder, Diff, Handler, Observed, Parent, Timeouts,
    },
    util::{
        waiter::{Observation, Polling, StateChange, DEFAULT_NOT_FOUND_CHECKS},
        Error,
    },
};
use agentcore_types::{
    ApiSchemaConfiguration, GatewayTargetSpec, LambdaTargetConfiguration, McpTargetConfiguration,
    TargetConfiguration,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// A target reports READY briefly before picking up the last change,
/// so it has to be seen READY this many times in a row.
const CONTINUOUS_READY: usize = 2;

/// Manages targets behind AgentCore gateways.
pub struct GatewayTargetHandler {
    client: Arc<dyn AgentCoreControl>,
    polling: Polling,
}

impl GatewayTargetHandler {
    pub fn new(client: Arc<dyn AgentCoreControl>) -> Self {
        GatewayTargetHandler {
            client,
            polling: Polling::default(),
        }
    }

    pub fn with_polling(mut self, polling: Polling) -> Self {
        self.polling = polling;
        self
    }

    async fn find(
        &self,
        gateway_identifier: &str,
        target_id: &str,
    ) -> Result<Option<api::GatewayTarget>, Error> {
        Ok(found(
            self.client
                .get_gateway_target(gateway_identifier, target_id)
                .await,
        )?)
    }

    async fn refresh(
        &self,
        gateway_identifier: &str,
        target_id: &str,
    ) -> Result<Option<Observation<api::GatewayTarget, TargetStatus>>, Error> {
        Ok(self
            .find(gateway_identifier, target_id)
            .await?
            .map(|target| {
                let status = target.status.clone();
                let reason = reasons(&target);
                Observation::new(target, status).with_reason(reason)
            }))
    }

    /// Waits until the target has settled as READY after a mutation
    /// that left it in `pending`.
    async fn wait_ready(
        &self,
        spec: &GatewayTargetSpec,
        target_id: &str,
        pending: TargetStatus,
        timeout: std::time::Duration,
    ) -> Result<api::GatewayTarget, Error> {
        StateChange::new(vec![pending], vec![TargetStatus::Ready], timeout)
            .polling(&self.polling)
            .not_found_checks(DEFAULT_NOT_FOUND_CHECKS)
            .continuous_target_occurrence(CONTINUOUS_READY)
            .until_target(|| self.refresh(&spec.gateway_identifier, target_id))
            .await
    }
}

/// Joins the status reasons of a target, if it reported any.
fn reasons(target: &api::GatewayTarget) -> Option<String> {
    (!target.status_reasons.is_empty()).then(|| target.status_reasons.join("; "))
}

/// Checks that exactly one MCP target type is configured.
fn validate(spec: &GatewayTargetSpec) -> Result<(), Error> {
    let types = spec.target_configuration.mcp.configured_types();
    if types.len() != 1 {
        return Err(Error::UserInputError(format!(
            "targetConfiguration.mcp must set exactly one of lambda, openApiSchema or smithyModel, found [{}]",
            types.join(", ")
        )));
    }
    Ok(())
}

fn configuration_type(mcp: &McpTargetConfiguration) -> Option<&'static str> {
    match mcp.configured_types().as_slice() {
        [single] => Some(*single),
        _ => None,
    }
}

/// The configuration with inline JSON payloads in canonical form, so a
/// payload read back from the service matches the declared one.
fn canonical(config: &TargetConfiguration) -> TargetConfiguration {
    let schema = |schema: &ApiSchemaConfiguration| ApiSchemaConfiguration {
        s3: schema.s3.clone(),
        inline_payload: schema.inline_payload.as_deref().map(canonical_payload),
    };
    let mcp = &config.mcp;
    TargetConfiguration {
        mcp: McpTargetConfiguration {
            lambda: mcp.lambda.as_ref().map(|lambda| LambdaTargetConfiguration {
                lambda_arn: lambda.lambda_arn.clone(),
                tool_schema: schema(&lambda.tool_schema),
            }),
            open_api_schema: mcp.open_api_schema.as_ref().map(schema),
            smithy_model: mcp.smithy_model.as_ref().map(schema),
        },
    }
}

fn input(spec: &GatewayTargetSpec, client_token: Option<String>) -> GatewayTargetInput {
    GatewayTargetInput {
        gateway_identifier: spec.gateway_identifier.clone(),
        name: spec.name.clone(),
        description: spec.description.clone(),
        target_configuration: spec.target_configuration.clone(),
        credential_provider_configuration: spec.credential_provider_configuration.clone(),
        client_token,
    }
}

#[async_trait]
impl Handler for GatewayTargetHandler {
    type Spec = GatewayTargetSpec;
    type State = api::GatewayTarget;

    const KIND: &'static str = "GatewayTarget";

    async fn create_with(
        &self,
        spec: &GatewayTargetSpec,
        timeouts: &Timeouts,
        recorder: &dyn CreationRecorder,
    ) -> Result<api::GatewayTarget, Error> {
        validate(spec)?;
        let target = self
            .client
            .create_gateway_target(input(spec, Some(Uuid::new_v4().to_string())))
            .await?;
        info!(
            gateway = %spec.gateway_identifier,
            target_id = %target.target_id,
            "created gateway target"
        );
        recorder.created(&target.target_id).await;

        self.wait_ready(spec, &target.target_id, TargetStatus::Creating, timeouts.create)
            .await
            .map_err(|err| err.tainted(&target.target_id))
    }

    async fn read(
        &self,
        spec: &GatewayTargetSpec,
        id: &str,
    ) -> Result<Option<api::GatewayTarget>, Error> {
        self.find(&spec.gateway_identifier, id).await
    }

    async fn update(
        &self,
        spec: &GatewayTargetSpec,
        state: &api::GatewayTarget,
        timeouts: &Timeouts,
    ) -> Result<api::GatewayTarget, Error> {
        validate(spec)?;
        self.client
            .update_gateway_target(&state.target_id, input(spec, None))
            .await?;
        info!(
            gateway = %spec.gateway_identifier,
            target_id = %state.target_id,
            "updated gateway target"
        );

        self.wait_ready(spec, &state.target_id, TargetStatus::Updating, timeouts.update)
            .await
    }

    async fn delete(
        &self,
        spec: &GatewayTargetSpec,
        id: &str,
        timeouts: &Timeouts,
    ) -> Result<(), Error> {
        match self
            .client
            .delete_gateway_target(&spec.gateway_identifier, id)
            .await
        {
            Err(err) if err.is_not_found() => return Ok(()),
            result => result?,
        }
        info!(gateway = %spec.gateway_identifier, target_id = id, "deleting gateway target");

        StateChange::new(
            vec![TargetStatus::Deleting, TargetStatus::Ready],
            vec![],
            timeouts.delete,
        )
        .polling(&self.polling)
        .until(|| self.refresh(&spec.gateway_identifier, id))
        .await?;
        Ok(())
    }

    fn diff(&self, spec: &GatewayTargetSpec, state: &api::GatewayTarget) -> Diff {
        let declared = &spec.target_configuration;
        let actual = &state.target_configuration;
        Changes::default()
            .replace_if(spec.name != state.name, "name")
            .replace_if(
                configuration_type(&declared.mcp) != configuration_type(&actual.mcp),
                "targetConfiguration",
            )
            .update_if(
                declared_drift(&spec.description, &state.description),
                "description",
            )
            .update_if(canonical(declared) != canonical(actual), "targetConfiguration")
            .update_if(
                declared_drift(
                    &spec.credential_provider_configuration,
                    &state.credential_provider_configuration,
                ),
                "credentialProviderConfiguration",
            )
            .finish()
    }

    fn observe(&self, state: &api::GatewayTarget) -> Observed {
        let failed = matches!(
            state.status,
            TargetStatus::Failed | TargetStatus::UpdateUnsuccessful
        );
        let failure = failed.then(|| {
            reasons(state).unwrap_or_else(|| format!("gateway target is in {} status", state.status))
        });
        Observed {
            id: state.target_id.clone(),
            arn: None,
            remote_status: Some(state.status.to_string()),
            settled: state.status == TargetStatus::Ready,
            failure,
            ..Default::default()
        }
    }

    fn parent(&self, spec: &GatewayTargetSpec) -> Option<Parent> {
        Some(Parent {
            field: "gatewayIdentifier",
            id: spec.gateway_identifier.clone(),
        })
    }

    fn with_parent(&self, spec: &GatewayTargetSpec, parent_id: &str) -> GatewayTargetSpec {
        GatewayTargetSpec {
            gateway_identifier: parent_id.to_owned(),
            ..spec.clone()
        }
    }
}
