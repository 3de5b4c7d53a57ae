use crate::{
    api::{self, found, AgentCoreControl, CreateMemoryInput, ErrorKind, MemoryStatus, UpdateMemoryInput},
    handler::{declared_drift, Changes, CreationRecorder, Diff, Handler, Observed, Timeouts},
    util::{
        retry::retry_when_with,
        waiter::{Observation, Polling, StateChange},
        Error,
    },
};
use agentcore_types::MemorySpec;
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tracing::info;
use uuid::Uuid;

/// A freshly created execution role can take this long before the
/// service is able to assume it.
const IAM_PROPAGATION_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Manages AgentCore memories.
pub struct MemoryHandler {
    client: Arc<dyn AgentCoreControl>,
    polling: Polling,
}

impl MemoryHandler {
    pub fn new(client: Arc<dyn AgentCoreControl>) -> Self {
        MemoryHandler {
            client,
            polling: Polling::default(),
        }
    }

    pub fn with_polling(mut self, polling: Polling) -> Self {
        self.polling = polling;
        self
    }

    async fn find(&self, id: &str) -> Result<Option<api::Memory>, Error> {
        Ok(found(self.client.get_memory(id).await)?)
    }

    async fn refresh(
        &self,
        id: &str,
    ) -> Result<Option<Observation<api::Memory, MemoryStatus>>, Error> {
        Ok(self.find(id).await?.map(|memory| {
            let status = memory.status.clone();
            let reason = memory.failure_reason.clone();
            Observation::new(memory, status).with_reason(reason)
        }))
    }

    fn wait(
        &self,
        pending: Vec<MemoryStatus>,
        target: Vec<MemoryStatus>,
        timeout: Duration,
    ) -> StateChange<MemoryStatus> {
        StateChange::new(pending, target, timeout).polling(&self.polling)
    }
}

#[async_trait]
impl Handler for MemoryHandler {
    type Spec = MemorySpec;
    type State = api::Memory;

    const KIND: &'static str = "Memory";

    async fn create_with(
        &self,
        spec: &MemorySpec,
        timeouts: &Timeouts,
        recorder: &dyn CreationRecorder,
    ) -> Result<api::Memory, Error> {
        let input = CreateMemoryInput {
            name: spec.name.clone(),
            description: spec.description.clone(),
            event_expiry_duration: spec.event_expiry_duration,
            encryption_key_arn: spec.encryption_key_arn.clone(),
            memory_execution_role_arn: spec.memory_execution_role_arn.clone(),
            client_token: Uuid::new_v4().to_string(),
        };
        let memory = retry_when_with(
            &self.polling,
            IAM_PROPAGATION_TIMEOUT,
            || {
                let input = input.clone();
                async move { Ok(self.client.create_memory(input).await?) }
            },
            |err| err.api_kind() == Some(ErrorKind::IamPropagation),
        )
        .await?;
        info!(id = %memory.id, name = %spec.name, "created memory");
        recorder.created(&memory.id).await;

        self.wait(vec![MemoryStatus::Creating], vec![MemoryStatus::Active], timeouts.create)
            .until_target(|| self.refresh(&memory.id))
            .await
            .map_err(|err| err.tainted(&memory.id))
    }

    async fn read(&self, _spec: &MemorySpec, id: &str) -> Result<Option<api::Memory>, Error> {
        self.find(id).await
    }

    async fn update(
        &self,
        spec: &MemorySpec,
        state: &api::Memory,
        timeouts: &Timeouts,
    ) -> Result<api::Memory, Error> {
        let input = UpdateMemoryInput {
            memory_id: state.id.clone(),
            description: spec.description.clone(),
            event_expiry_duration: Some(spec.event_expiry_duration),
            memory_execution_role_arn: spec.memory_execution_role_arn.clone(),
            client_token: Uuid::new_v4().to_string(),
            ..Default::default()
        };
        retry_when_with(
            &self.polling,
            timeouts.update,
            || {
                let input = input.clone();
                async move { Ok(self.client.update_memory(input).await?) }
            },
            Error::is_retryable,
        )
        .await?;
        info!(id = %state.id, "updated memory");

        self.wait(vec![MemoryStatus::Creating], vec![MemoryStatus::Active], timeouts.update)
            .until_target(|| self.refresh(&state.id))
            .await
    }

    async fn delete(&self, _spec: &MemorySpec, id: &str, timeouts: &Timeouts) -> Result<(), Error> {
        match self
            .client
            .delete_memory(id, &Uuid::new_v4().to_string())
            .await
        {
            Err(err) if err.is_not_found() => return Ok(()),
            result => result?,
        }
        info!(id, "deleting memory");

        self.wait(
            vec![MemoryStatus::Deleting, MemoryStatus::Active],
            vec![],
            timeouts.delete,
        )
        .until(|| self.refresh(id))
        .await?;
        Ok(())
    }

    fn diff(&self, spec: &MemorySpec, state: &api::Memory) -> Diff {
        Changes::default()
            .replace_if(spec.name != state.name, "name")
            .replace_if(
                spec.encryption_key_arn != state.encryption_key_arn,
                "encryptionKeyArn",
            )
            .update_if(
                declared_drift(&spec.description, &state.description),
                "description",
            )
            .update_if(
                spec.event_expiry_duration != state.event_expiry_duration,
                "eventExpiryDuration",
            )
            .update_if(
                declared_drift(
                    &spec.memory_execution_role_arn,
                    &state.memory_execution_role_arn,
                ),
                "memoryExecutionRoleArn",
            )
            .finish()
    }

    fn observe(&self, state: &api::Memory) -> Observed {
        let failure = (state.status == MemoryStatus::Failed).then(|| {
            state
                .failure_reason
                .clone()
                .unwrap_or_else(|| "memory is in FAILED status".to_owned())
        });
        Observed {
            id: state.id.clone(),
            arn: state.arn.clone(),
            remote_status: Some(state.status.to_string()),
            settled: state.status == MemoryStatus::Active,
            failure,
            ..Default::default()
        }
    }
}
