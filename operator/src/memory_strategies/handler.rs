use crate::{
    api::{
        self, found, AgentCoreControl, ModifyStrategyInput, StrategyChanges, StrategyInput,
        StrategyStatus, UpdateMemoryInput,
    },
    handler::{
        declared_drift, Changes, CreationRecorder, Diff, Handler, Observed, Parent, Timeouts,
    },
    util::{
        mutex_kv::{MutexKv, GLOBAL_MUTEX_KV},
        retry::retry_when_with,
        waiter::{Observation, Polling, StateChange},
        Error,
    },
};
use agentcore_types::MemoryStrategySpec;
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};
use uuid::Uuid;

/// Manages strategies inside AgentCore memories.
///
/// Every strategy mutation is an `update_memory` call on the parent,
/// and the parent rejects updates while any of its strategies is
/// transitioning. Mutations therefore hold the parent's named lock
/// until the strategy has settled.
pub struct MemoryStrategyHandler {
    client: Arc<dyn AgentCoreControl>,
    locks: Arc<MutexKv>,
    polling: Polling,
}

impl MemoryStrategyHandler {
    pub fn new(client: Arc<dyn AgentCoreControl>) -> Self {
        MemoryStrategyHandler {
            client,
            locks: GLOBAL_MUTEX_KV.clone(),
            polling: Polling::default(),
        }
    }

    pub fn with_locks(mut self, locks: Arc<MutexKv>) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_polling(mut self, polling: Polling) -> Self {
        self.polling = polling;
        self
    }

    /// Returns the memory's strategies, or `None` if the memory is gone.
    async fn strategies(&self, memory_id: &str) -> Result<Option<Vec<api::MemoryStrategy>>, Error> {
        Ok(found(self.client.get_memory(memory_id).await)?.map(|memory| memory.strategies))
    }

    async fn find(
        &self,
        memory_id: &str,
        strategy_id: &str,
    ) -> Result<Option<api::MemoryStrategy>, Error> {
        Ok(self
            .strategies(memory_id)
            .await?
            .and_then(|strategies| {
                strategies
                    .into_iter()
                    .find(|strategy| strategy.strategy_id == strategy_id)
            }))
    }

    async fn refresh(
        &self,
        memory_id: &str,
        strategy_id: &str,
    ) -> Result<Option<Observation<api::MemoryStrategy, StrategyStatus>>, Error> {
        Ok(self.find(memory_id, strategy_id).await?.map(|strategy| {
            let status = strategy.status.clone();
            Observation::new(strategy, status)
        }))
    }

    /// Sends `changes` to the parent memory, retrying while the memory
    /// is busy with something the lock does not cover.
    async fn apply(
        &self,
        memory_id: &str,
        changes: StrategyChanges,
        timeout: Duration,
    ) -> Result<api::Memory, Error> {
        let input = UpdateMemoryInput {
            memory_id: memory_id.to_owned(),
            strategies: changes,
            client_token: Uuid::new_v4().to_string(),
            ..Default::default()
        };
        retry_when_with(
            &self.polling,
            timeout,
            || {
                let input = input.clone();
                async move { Ok(self.client.update_memory(input).await?) }
            },
            Error::is_retryable,
        )
        .await
    }

    async fn wait_active(
        &self,
        memory_id: &str,
        strategy_id: &str,
        timeout: Duration,
    ) -> Result<api::MemoryStrategy, Error> {
        StateChange::new(vec![StrategyStatus::Creating], vec![StrategyStatus::Active], timeout)
            .polling(&self.polling)
            .until_target(|| self.refresh(memory_id, strategy_id))
            .await
    }
}

#[async_trait]
impl Handler for MemoryStrategyHandler {
    type Spec = MemoryStrategySpec;
    type State = api::MemoryStrategy;

    const KIND: &'static str = "MemoryStrategy";

    async fn create_with(
        &self,
        spec: &MemoryStrategySpec,
        timeouts: &Timeouts,
        recorder: &dyn CreationRecorder,
    ) -> Result<api::MemoryStrategy, Error> {
        let _lock = self.locks.lock(&spec.memory_id).await;
        let changes = StrategyChanges {
            add: vec![StrategyInput {
                name: spec.name.clone(),
                strategy_type: spec.strategy_type,
                description: spec.description.clone(),
                namespaces: spec.namespaces.clone(),
            }],
            ..Default::default()
        };
        let memory = self.apply(&spec.memory_id, changes, timeouts.create).await?;

        // The response usually lists the new strategy. Fall back to a
        // fresh read when it does not.
        let by_name = |strategies: &[api::MemoryStrategy]| {
            strategies
                .iter()
                .find(|strategy| strategy.name == spec.name)
                .map(|strategy| strategy.strategy_id.clone())
        };
        let strategy_id = match by_name(memory.strategies.as_slice()) {
            Some(id) => id,
            None => {
                debug!(memory_id = %spec.memory_id, name = %spec.name, "strategy missing from response");
                self.strategies(&spec.memory_id)
                    .await?
                    .and_then(|strategies| by_name(strategies.as_slice()))
                    .ok_or_else(|| {
                        Error::EmptyResult(format!(
                            "strategy {} not listed in memory {}",
                            spec.name, spec.memory_id
                        ))
                    })?
            }
        };
        info!(memory_id = %spec.memory_id, strategy_id = %strategy_id, "added memory strategy");
        recorder.created(&strategy_id).await;

        self.wait_active(&spec.memory_id, &strategy_id, timeouts.create)
            .await
            .map_err(|err| err.tainted(&strategy_id))
    }

    async fn read(
        &self,
        spec: &MemoryStrategySpec,
        id: &str,
    ) -> Result<Option<api::MemoryStrategy>, Error> {
        self.find(&spec.memory_id, id).await
    }

    async fn update(
        &self,
        spec: &MemoryStrategySpec,
        state: &api::MemoryStrategy,
        timeouts: &Timeouts,
    ) -> Result<api::MemoryStrategy, Error> {
        let _lock = self.locks.lock(&spec.memory_id).await;
        let changes = StrategyChanges {
            modify: vec![ModifyStrategyInput {
                strategy_id: state.strategy_id.clone(),
                description: spec.description.clone(),
                namespaces: spec.namespaces.clone(),
            }],
            ..Default::default()
        };
        self.apply(&spec.memory_id, changes, timeouts.update).await?;
        info!(memory_id = %spec.memory_id, strategy_id = %state.strategy_id, "modified memory strategy");

        self.wait_active(&spec.memory_id, &state.strategy_id, timeouts.update)
            .await
    }

    async fn delete(
        &self,
        spec: &MemoryStrategySpec,
        id: &str,
        timeouts: &Timeouts,
    ) -> Result<(), Error> {
        let _lock = self.locks.lock(&spec.memory_id).await;
        let Some(strategy) = self.find(&spec.memory_id, id).await? else {
            return Ok(());
        };
        if strategy.status != StrategyStatus::Deleting {
            let changes = StrategyChanges {
                delete: vec![id.to_owned()],
                ..Default::default()
            };
            match self.apply(&spec.memory_id, changes, timeouts.delete).await {
                Err(err) if err.is_not_found() => return Ok(()),
                result => result?,
            };
            info!(memory_id = %spec.memory_id, strategy_id = id, "deleting memory strategy");
        }

        StateChange::new(
            vec![StrategyStatus::Deleting, StrategyStatus::Active],
            vec![],
            timeouts.delete,
        )
        .polling(&self.polling)
        .until(|| self.refresh(&spec.memory_id, id))
        .await?;
        Ok(())
    }

    fn diff(&self, spec: &MemoryStrategySpec, state: &api::MemoryStrategy) -> Diff {
        Changes::default()
            .replace_if(spec.name != state.name, "name")
            .replace_if(spec.strategy_type != state.strategy_type, "type")
            .update_if(
                declared_drift(&spec.description, &state.description),
                "description",
            )
            .update_if(
                declared_drift(&spec.namespaces, &Some(state.namespaces.clone())),
                "namespaces",
            )
            .finish()
    }

    fn observe(&self, state: &api::MemoryStrategy) -> Observed {
        let failure = (state.status == StrategyStatus::Failed)
            .then(|| format!("memory strategy {} is in FAILED status", state.name));
        Observed {
            id: state.strategy_id.clone(),
            arn: None,
            remote_status: Some(state.status.to_string()),
            settled: state.status == StrategyStatus::Active,
            failure,
            ..Default::default()
        }
    }

    fn parent(&self, spec: &MemoryStrategySpec) -> Option<Parent> {
        Some(Parent {
            field: "memoryId",
            id: spec.memory_id.clone(),
        })
    }

    fn with_parent(&self, spec: &MemoryStrategySpec, parent_id: &str) -> MemoryStrategySpec {
        MemoryStrategySpec {
            memory_id: parent_id.to_owned(),
            ..spec.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{fake::FakeControlPlane, ApiError, CreateMemoryInput, VALIDATION};
    use agentcore_types::StrategyType;

    /// Creates a memory in the fake and reads it until it is active.
    async fn active_memory(fake: &FakeControlPlane) -> String {
        let memory = fake
            .create_memory(CreateMemoryInput {
                name: "support_chat".to_owned(),
                description: None,
                event_expiry_duration: 30,
                encryption_key_arn: None,
                memory_execution_role_arn: None,
                client_token: "token".to_owned(),
            })
            .await
            .unwrap();
        while fake.get_memory(&memory.id).await.unwrap().status != api::MemoryStatus::Active {}
        memory.id
    }

    fn spec(memory_id: &str, name: &str) -> MemoryStrategySpec {
        MemoryStrategySpec {
            memory_id: memory_id.to_owned(),
            name: name.to_owned(),
            strategy_type: StrategyType::Semantic,
            namespaces: Some(vec!["/facts/{actorId}".to_owned()]),
            ..Default::default()
        }
    }

    fn handler(fake: &Arc<FakeControlPlane>) -> MemoryStrategyHandler {
        MemoryStrategyHandler::new(fake.clone())
            .with_locks(Arc::new(MutexKv::default()))
            .with_polling(Polling::immediate())
    }

    #[tokio::test]
    async fn create_waits_until_active() {
        let fake = Arc::new(FakeControlPlane::default());
        let memory_id = active_memory(&fake).await;
        let strategy = handler(&fake)
            .create(&spec(&memory_id, "facts"), &Timeouts::default())
            .await
            .unwrap();
        assert_eq!(strategy.status, StrategyStatus::Active);
        assert_eq!(strategy.name, "facts");
        assert!(strategy.strategy_id.starts_with("strat-"));
    }

    #[tokio::test]
    async fn concurrent_creates_on_one_memory_are_serialized() {
        let fake = Arc::new(FakeControlPlane::default());
        let memory_id = active_memory(&fake).await;
        let handler = handler(&fake);
        let facts = spec(&memory_id, "facts");
        let summary = MemoryStrategySpec {
            strategy_type: StrategyType::Summary,
            ..spec(&memory_id, "summary")
        };
        let timeouts = Timeouts::default();
        let (a, b) = tokio::join!(
            handler.create(&facts, &timeouts),
            handler.create(&summary, &timeouts),
        );
        assert_eq!(a.unwrap().status, StrategyStatus::Active);
        assert_eq!(b.unwrap().status, StrategyStatus::Active);
        assert_eq!(fake.transitional_rejections(), 0);
        assert_eq!(fake.count_calls("update_memory"), 2);
    }

    #[tokio::test]
    async fn transitional_rejection_is_retried() {
        let fake = Arc::new(FakeControlPlane::default());
        let memory_id = active_memory(&fake).await;
        fake.fail_next(
            "update_memory",
            ApiError::new(
                VALIDATION,
                format!("Memory {} is in a transitional state", memory_id),
            ),
        );
        handler(&fake)
            .create(&spec(&memory_id, "facts"), &Timeouts::default())
            .await
            .unwrap();
        assert_eq!(fake.count_calls("update_memory"), 2);
    }

    #[tokio::test]
    async fn failed_strategy_is_tainted() {
        let fake = Arc::new(FakeControlPlane::default());
        let memory_id = active_memory(&fake).await;
        fake.fail_settle("strategy", "model access denied");
        let err = handler(&fake)
            .create(&spec(&memory_id, "facts"), &Timeouts::default())
            .await
            .unwrap_err();
        match err {
            Error::Tainted { id, source } => {
                assert!(id.starts_with("strat-"));
                assert!(matches!(*source, Error::UnexpectedState { .. }), "{source:?}");
            }
            other => panic!("expected a tainted error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_modifies_in_place() {
        let fake = Arc::new(FakeControlPlane::default());
        let memory_id = active_memory(&fake).await;
        let handler = handler(&fake);
        let strategy = handler
            .create(&spec(&memory_id, "facts"), &Timeouts::default())
            .await
            .unwrap();
        let desired = MemoryStrategySpec {
            description: Some("Facts about the user".to_owned()),
            ..spec(&memory_id, "facts")
        };
        assert_eq!(
            handler.diff(&desired, &strategy),
            Diff::Update(vec!["description".to_owned()])
        );
        let strategy = handler
            .update(&desired, &strategy, &Timeouts::default())
            .await
            .unwrap();
        assert_eq!(strategy.description.as_deref(), Some("Facts about the user"));
        assert_eq!(handler.diff(&desired, &strategy), Diff::None);
    }

    #[tokio::test]
    async fn delete_waits_until_gone() {
        let fake = Arc::new(FakeControlPlane::default());
        let memory_id = active_memory(&fake).await;
        let handler = handler(&fake);
        let spec = spec(&memory_id, "facts");
        let strategy = handler.create(&spec, &Timeouts::default()).await.unwrap();
        handler
            .delete(&spec, &strategy.strategy_id, &Timeouts::default())
            .await
            .unwrap();
        assert_eq!(handler.read(&spec, &strategy.strategy_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleting_from_missing_memory_succeeds() {
        let fake = Arc::new(FakeControlPlane::default());
        handler(&fake)
            .delete(&spec("mem-missing", "facts"), "strat-1", &Timeouts::default())
            .await
            .unwrap();
        assert_eq!(fake.count_calls("update_memory"), 0);
    }

    #[test]
    fn renaming_or_retyping_replaces() {
        let handler = MemoryStrategyHandler::new(Arc::new(FakeControlPlane::default()));
        let state = api::MemoryStrategy {
            strategy_id: "strat-1".to_owned(),
            name: "facts".to_owned(),
            strategy_type: StrategyType::Semantic,
            description: None,
            namespaces: vec!["/facts/{actorId}".to_owned()],
            status: StrategyStatus::Active,
        };
        let desired = MemoryStrategySpec {
            strategy_type: StrategyType::UserPreference,
            ..spec("mem-1", "facts")
        };
        assert_eq!(
            handler.diff(&desired, &state),
            Diff::Replace(vec!["type".to_owned()])
        );
        let undeclared = MemoryStrategySpec {
            namespaces: None,
            ..spec("mem-1", "facts")
        };
        assert_eq!(handler.diff(&undeclared, &state), Diff::None);
    }
}
