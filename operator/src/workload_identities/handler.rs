use crate::{
    api::{self, found, AgentCoreControl, ErrorKind},
    handler::{Changes, CreationRecorder, Diff, Handler, Observed, Timeouts},
    util::{retry::retry_when_not_found, waiter::Polling, Error},
};
use agentcore_types::WorkloadIdentitySpec;
use async_trait::async_trait;
use std::{collections::BTreeSet, sync::Arc, time::Duration};
use tracing::info;

/// How long a new identity may stay invisible to reads.
const PROPAGATION_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Manages workload identities. The name is the identifier.
pub struct WorkloadIdentityHandler {
    client: Arc<dyn AgentCoreControl>,
    polling: Polling,
}

impl WorkloadIdentityHandler {
    pub fn new(client: Arc<dyn AgentCoreControl>) -> Self {
        WorkloadIdentityHandler {
            client,
            polling: Polling::default(),
        }
    }

    pub fn with_polling(mut self, polling: Polling) -> Self {
        self.polling = polling;
        self
    }

    async fn find(&self, name: &str) -> Result<Option<api::WorkloadIdentity>, Error> {
        Ok(found(self.client.get_workload_identity(name).await)?)
    }
}

fn return_urls(spec: &WorkloadIdentitySpec) -> &[String] {
    spec.allowed_resource_oauth2_return_urls
        .as_deref()
        .unwrap_or_default()
}

/// Return URLs are unordered.
fn same_urls(a: &[String], b: &[String]) -> bool {
    a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
}

#[async_trait]
impl Handler for WorkloadIdentityHandler {
    type Spec = WorkloadIdentitySpec;
    type State = api::WorkloadIdentity;

    const KIND: &'static str = "WorkloadIdentity";

    async fn create_with(
        &self,
        spec: &WorkloadIdentitySpec,
        _timeouts: &Timeouts,
        recorder: &dyn CreationRecorder,
    ) -> Result<api::WorkloadIdentity, Error> {
        match self
            .client
            .create_workload_identity(&spec.name, return_urls(spec))
            .await
        {
            Err(err) if err.kind() == ErrorKind::Conflict => {
                return Err(Error::UserInputError(format!(
                    "workload identity {} already exists, set importId to adopt it",
                    spec.name
                )))
            }
            result => result?,
        };
        info!(name = %spec.name, "created workload identity");
        recorder.created(&spec.name).await;

        retry_when_not_found(&self.polling, PROPAGATION_TIMEOUT, || self.find(&spec.name))
            .await
            .map_err(|err| err.tainted(&spec.name))
    }

    async fn read(
        &self,
        _spec: &WorkloadIdentitySpec,
        id: &str,
    ) -> Result<Option<api::WorkloadIdentity>, Error> {
        self.find(id).await
    }

    async fn update(
        &self,
        spec: &WorkloadIdentitySpec,
        state: &api::WorkloadIdentity,
        _timeouts: &Timeouts,
    ) -> Result<api::WorkloadIdentity, Error> {
        let identity = self
            .client
            .update_workload_identity(&state.name, return_urls(spec))
            .await?;
        info!(name = %state.name, "updated workload identity");
        Ok(identity)
    }

    async fn delete(
        &self,
        _spec: &WorkloadIdentitySpec,
        id: &str,
        _timeouts: &Timeouts,
    ) -> Result<(), Error> {
        match self.client.delete_workload_identity(id).await {
            Err(err) if err.is_not_found() => Ok(()),
            result => {
                result?;
                info!(name = id, "deleted workload identity");
                Ok(())
            }
        }
    }

    fn diff(&self, spec: &WorkloadIdentitySpec, state: &api::WorkloadIdentity) -> Diff {
        let urls_drifted = spec
            .allowed_resource_oauth2_return_urls
            .as_deref()
            .map_or(false, |declared| {
                !same_urls(declared, &state.allowed_resource_oauth2_return_urls)
            });
        Changes::default()
            .replace_if(spec.name != state.name, "name")
            .update_if(urls_drifted, "allowedResourceOauth2ReturnUrls")
            .finish()
    }

    fn observe(&self, state: &api::WorkloadIdentity) -> Observed {
        Observed {
            id: state.name.clone(),
            arn: state.workload_identity_arn.clone(),
            remote_status: None,
            settled: true,
            failure: None,
            ..Default::default()
        }
    }
}
