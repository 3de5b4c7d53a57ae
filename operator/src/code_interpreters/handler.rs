use crate::{
    api::{self, found, AgentCoreControl, CodeInterpreterStatus, CreateCodeInterpreterInput},
    handler::{declared_drift, Changes, CreationRecorder, Diff, Handler, Observed, Timeouts},
    util::{
        waiter::{Observation, Polling, StateChange},
        Error,
    },
};
use agentcore_types::CodeInterpreterSpec;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Manages custom code interpreters. They cannot be changed after
/// creation.
pub struct CodeInterpreterHandler {
    client: Arc<dyn AgentCoreControl>,
    polling: Polling,
}

impl CodeInterpreterHandler {
    pub fn new(client: Arc<dyn AgentCoreControl>) -> Self {
        CodeInterpreterHandler {
            client,
            polling: Polling::default(),
        }
    }

    pub fn with_polling(mut self, polling: Polling) -> Self {
        self.polling = polling;
        self
    }

    /// A `DELETED` interpreter is still returned by reads for a while.
    /// It is reported as absent.
    async fn find(&self, id: &str) -> Result<Option<api::CodeInterpreter>, Error> {
        Ok(found(self.client.get_code_interpreter(id).await)?
            .filter(|interpreter| interpreter.status != CodeInterpreterStatus::Deleted))
    }

    async fn refresh(
        &self,
        id: &str,
    ) -> Result<Option<Observation<api::CodeInterpreter, CodeInterpreterStatus>>, Error> {
        Ok(self.find(id).await?.map(|interpreter| {
            let status = interpreter.status.clone();
            let reason = interpreter.failure_reason.clone();
            Observation::new(interpreter, status).with_reason(reason)
        }))
    }
}

#[async_trait]
impl Handler for CodeInterpreterHandler {
    type Spec = CodeInterpreterSpec;
    type State = api::CodeInterpreter;

    const KIND: &'static str = "CodeInterpreter";

    async fn create_with(
        &self,
        spec: &CodeInterpreterSpec,
        timeouts: &Timeouts,
        recorder: &dyn CreationRecorder,
    ) -> Result<api::CodeInterpreter, Error> {
        let interpreter = self
            .client
            .create_code_interpreter(CreateCodeInterpreterInput {
                name: spec.name.clone(),
                description: spec.description.clone(),
                execution_role_arn: spec.execution_role_arn.clone(),
                network_mode: spec.network_configuration.network_mode,
                client_token: Uuid::new_v4().to_string(),
            })
            .await?;
        let id = interpreter.code_interpreter_id;
        info!(id = %id, name = %spec.name, "created code interpreter");
        recorder.created(&id).await;

        StateChange::new(
            vec![CodeInterpreterStatus::Creating],
            vec![CodeInterpreterStatus::Ready],
            timeouts.create,
        )
        .polling(&self.polling)
        .until_target(|| self.refresh(&id))
        .await
        .map_err(|err| err.tainted(&id))
    }

    async fn read(
        &self,
        _spec: &CodeInterpreterSpec,
        id: &str,
    ) -> Result<Option<api::CodeInterpreter>, Error> {
        self.find(id).await
    }

    async fn update(
        &self,
        _spec: &CodeInterpreterSpec,
        _state: &api::CodeInterpreter,
        _timeouts: &Timeouts,
    ) -> Result<api::CodeInterpreter, Error> {
        Err(Error::Immutable(Self::KIND.to_owned()))
    }

    async fn delete(
        &self,
        _spec: &CodeInterpreterSpec,
        id: &str,
        timeouts: &Timeouts,
    ) -> Result<(), Error> {
        match self
            .client
            .delete_code_interpreter(id, &Uuid::new_v4().to_string())
            .await
        {
            Err(err) if err.is_not_found() => return Ok(()),
            result => result?,
        }
        info!(id, "deleting code interpreter");

        // The status can still read READY right after the call.
        StateChange::new(
            vec![CodeInterpreterStatus::Deleting, CodeInterpreterStatus::Ready],
            vec![],
            timeouts.delete,
        )
        .polling(&self.polling)
        .until(|| self.refresh(id))
        .await?;
        Ok(())
    }

    /// Every difference is a replacement.
    fn diff(&self, spec: &CodeInterpreterSpec, state: &api::CodeInterpreter) -> Diff {
        Changes::default()
            .replace_if(spec.name != state.name, "name")
            .replace_if(
                declared_drift(&spec.description, &state.description),
                "description",
            )
            .replace_if(
                declared_drift(&spec.execution_role_arn, &state.execution_role_arn),
                "executionRoleArn",
            )
            .replace_if(
                spec.network_configuration.network_mode != state.network_mode,
                "networkConfiguration",
            )
            .finish()
    }

    fn observe(&self, state: &api::CodeInterpreter) -> Observed {
        let failed = matches!(
            state.status,
            CodeInterpreterStatus::CreateFailed | CodeInterpreterStatus::DeleteFailed
        );
        let failure = failed.then(|| {
            state
                .failure_reason
                .clone()
                .unwrap_or_else(|| format!("code interpreter is in {} status", state.status))
        });
        Observed {
            id: state.code_interpreter_id.clone(),
            arn: state.code_interpreter_arn.clone(),
            remote_status: Some(state.status.to_string()),
            settled: state.status == CodeInterpreterStatus::Ready,
            failure,
            ..Default::default()
        }
    }
}
