//! In-memory control plane used by the handler and controller tests.
//!
//! Objects enter a transitional status on every mutation and settle
//! after [`SETTLE_READS`] reads, the way the real service converges
//! asynchronously. Errors can be injected per operation.

use super::*;
use crate::handler::CreationRecorder;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// Number of reads a transitional status survives.
pub const SETTLE_READS: usize = 2;

#[derive(Default)]
pub struct FakeControlPlane {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    next_id: usize,
    memories: HashMap<String, Tracked<Memory>>,
    strategy_reads: HashMap<String, usize>,
    targets: HashMap<(String, String), Tracked<GatewayTarget>>,
    vaults: HashMap<String, Vault>,
    identities: HashMap<String, Tracked<WorkloadIdentity>>,
    interpreters: HashMap<String, Tracked<CodeInterpreter>>,
    failures: Vec<(String, ApiError)>,
    settle_failures: HashMap<String, String>,
    calls: Vec<String>,
    transitional_rejections: usize,
    delete_lag: usize,
    lagging_deletes: HashMap<String, usize>,
}

struct Tracked<T> {
    value: T,
    reads_left: usize,
}

impl<T> Tracked<T> {
    fn settling(value: T) -> Self {
        Tracked {
            value,
            reads_left: SETTLE_READS,
        }
    }

    /// Counts one read. Returns true when the object settles on it.
    fn read(&mut self) -> bool {
        if self.reads_left == 0 {
            return false;
        }
        self.reads_left -= 1;
        self.reads_left == 0
    }
}

struct Vault {
    current: TokenVault,
    pending: Option<Tracked<KmsConfiguration>>,
}

impl FakeControlPlane {
    /// Makes the next call to `operation` fail with `err`.
    pub fn fail_next(&self, operation: &str, err: ApiError) {
        self.lock().failures.push((operation.to_owned(), err));
    }

    /// Makes the next object of `kind` that settles end up in its
    /// failure status with `reason`. Kinds are `memory`, `strategy`,
    /// `target_create`, `target_update` and `code_interpreter`.
    pub fn fail_settle(&self, kind: &str, reason: &str) {
        self.lock()
            .settle_failures
            .insert(kind.to_owned(), reason.to_owned());
    }

    /// Makes the next accepted code interpreter delete invisible for
    /// `reads` reads: the interpreter keeps reporting its old status.
    pub fn lag_next_delete(&self, reads: usize) {
        self.lock().delete_lag = reads;
    }

    /// Names of the operations called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == operation).count()
    }

    /// Number of `update_memory` calls rejected because the memory or
    /// one of its strategies was mid-transition.
    pub fn transitional_rejections(&self) -> usize {
        self.lock().transitional_rejections
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the call and returns an injected failure, if any.
    fn enter(&self, operation: &str) -> Result<MutexGuard<'_, FakeState>, ApiError> {
        let mut state = self.lock();
        state.calls.push(operation.to_owned());
        if let Some(index) = state.failures.iter().position(|(op, _)| op == operation) {
            let (_, err) = state.failures.remove(index);
            return Err(err);
        }
        Ok(state)
    }
}

impl FakeState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn settle_failure(&mut self, kind: &str) -> Option<String> {
        self.settle_failures.remove(kind)
    }

    fn memory(&mut self, memory_id: &str) -> Result<&mut Tracked<Memory>, ApiError> {
        self.memories
            .get_mut(memory_id)
            .ok_or_else(|| ApiError::not_found(format!("Memory {} not found", memory_id)))
    }

    /// Advances the memory and its strategies by one read.
    fn read_memory(&mut self, memory_id: &str) -> Result<Memory, ApiError> {
        let settled = self.memory(memory_id)?.read();
        if settled {
            let status = self.memory(memory_id)?.value.status.clone();
            match status {
                MemoryStatus::Deleting => {
                    self.memories.remove(memory_id);
                    return Err(ApiError::not_found(format!("Memory {} not found", memory_id)));
                }
                MemoryStatus::Creating => {
                    let failure = self.settle_failure("memory");
                    let memory = &mut self.memory(memory_id)?.value;
                    match failure {
                        Some(reason) => {
                            memory.status = MemoryStatus::Failed;
                            memory.failure_reason = Some(reason);
                        }
                        None => memory.status = MemoryStatus::Active,
                    }
                }
                _ => {}
            }
        }

        let ids: Vec<String> = self
            .memory(memory_id)?
            .value
            .strategies
            .iter()
            .map(|s| s.strategy_id.clone())
            .collect();
        for id in ids {
            let settled = match self.strategy_reads.get_mut(&id) {
                Some(0) | None => false,
                Some(reads) => {
                    *reads -= 1;
                    *reads == 0
                }
            };
            if !settled {
                continue;
            }
            let failure = self.settle_failure("strategy");
            let strategies = &mut self.memory(memory_id)?.value.strategies;
            let Some(index) = strategies.iter().position(|s| s.strategy_id == id) else {
                continue;
            };
            let status = strategies[index].status.clone();
            match status {
                StrategyStatus::Deleting => {
                    strategies.remove(index);
                }
                StrategyStatus::Creating => match failure {
                    Some(_) => strategies[index].status = StrategyStatus::Failed,
                    None => strategies[index].status = StrategyStatus::Active,
                },
                _ => {}
            }
        }
        Ok(self.memory(memory_id)?.value.clone())
    }

    fn memory_busy(&mut self, memory_id: &str) -> Result<bool, ApiError> {
        let memory = &self.memory(memory_id)?.value;
        Ok(memory.status != MemoryStatus::Active
            || memory.strategies.iter().any(|s| {
                matches!(s.status, StrategyStatus::Creating | StrategyStatus::Deleting)
            }))
    }
}

#[async_trait]
impl AgentCoreControl for FakeControlPlane {
    async fn create_memory(&self, input: CreateMemoryInput) -> Result<Memory, ApiError> {
        let mut state = self.enter("create_memory")?;
        if input.event_expiry_duration <= 0 {
            return Err(ApiError::new(
                VALIDATION,
                "eventExpiryDuration must be a positive number of days",
            ));
        }
        let id = state.id("mem");
        let memory = Memory {
            id: id.clone(),
            arn: Some(format!(
                "arn:aws:bedrock-agentcore:us-east-1:123456789012:memory/{}",
                id
            )),
            name: input.name,
            description: input.description,
            event_expiry_duration: input.event_expiry_duration,
            encryption_key_arn: input.encryption_key_arn,
            memory_execution_role_arn: input.memory_execution_role_arn,
            status: MemoryStatus::Creating,
            failure_reason: None,
            strategies: Vec::new(),
        };
        state.memories.insert(id, Tracked::settling(memory.clone()));
        Ok(memory)
    }

    async fn get_memory(&self, memory_id: &str) -> Result<Memory, ApiError> {
        self.enter("get_memory")?.read_memory(memory_id)
    }

    async fn update_memory(&self, input: UpdateMemoryInput) -> Result<Memory, ApiError> {
        let mut state = self.enter("update_memory")?;
        if state.memory_busy(&input.memory_id)? {
            state.transitional_rejections += 1;
            return Err(ApiError::new(
                VALIDATION,
                format!(
                    "Memory {} is in a transitional state and cannot be modified",
                    input.memory_id
                ),
            ));
        }

        let mut created = Vec::new();
        for add in &input.strategies.add {
            created.push((state.id("strat"), add.clone()));
        }
        let mut touched = Vec::new();
        let memory = &mut state.memory(&input.memory_id)?.value;
        if let Some(description) = input.description {
            memory.description = Some(description);
        }
        if let Some(days) = input.event_expiry_duration {
            memory.event_expiry_duration = days;
        }
        if let Some(role) = input.memory_execution_role_arn {
            memory.memory_execution_role_arn = Some(role);
        }
        for (strategy_id, add) in created {
            memory.strategies.push(MemoryStrategy {
                strategy_id: strategy_id.clone(),
                name: add.name,
                strategy_type: add.strategy_type,
                description: add.description,
                namespaces: add.namespaces.unwrap_or_default(),
                status: StrategyStatus::Creating,
            });
            touched.push(strategy_id);
        }
        for modify in &input.strategies.modify {
            let strategy = memory
                .strategies
                .iter_mut()
                .find(|s| s.strategy_id == modify.strategy_id)
                .ok_or_else(|| {
                    ApiError::new(
                        VALIDATION,
                        format!("Strategy {} does not exist", modify.strategy_id),
                    )
                })?;
            if modify.description.is_some() {
                strategy.description = modify.description.clone();
            }
            if let Some(namespaces) = &modify.namespaces {
                strategy.namespaces = namespaces.clone();
            }
            strategy.status = StrategyStatus::Creating;
            touched.push(modify.strategy_id.clone());
        }
        for strategy_id in &input.strategies.delete {
            let strategy = memory
                .strategies
                .iter_mut()
                .find(|s| &s.strategy_id == strategy_id)
                .ok_or_else(|| {
                    ApiError::new(
                        VALIDATION,
                        format!("Strategy {} does not exist", strategy_id),
                    )
                })?;
            strategy.status = StrategyStatus::Deleting;
            touched.push(strategy_id.clone());
        }
        let memory = memory.clone();
        for strategy_id in touched {
            state.strategy_reads.insert(strategy_id, SETTLE_READS);
        }
        Ok(memory)
    }

    async fn delete_memory(&self, memory_id: &str, _client_token: &str) -> Result<(), ApiError> {
        let mut state = self.enter("delete_memory")?;
        let memory = state.memory(memory_id)?;
        memory.value.status = MemoryStatus::Deleting;
        memory.reads_left = SETTLE_READS;
        Ok(())
    }

    async fn create_gateway_target(
        &self,
        input: GatewayTargetInput,
    ) -> Result<GatewayTarget, ApiError> {
        let mut state = self.enter("create_gateway_target")?;
        let target_id = state.id("tgt");
        let target = GatewayTarget {
            target_id: target_id.clone(),
            gateway_arn: Some(format!(
                "arn:aws:bedrock-agentcore:us-east-1:123456789012:gateway/{}",
                input.gateway_identifier
            )),
            name: input.name,
            description: input.description,
            status: TargetStatus::Creating,
            status_reasons: Vec::new(),
            target_configuration: input.target_configuration,
            credential_provider_configuration: input.credential_provider_configuration,
        };
        state.targets.insert(
            (input.gateway_identifier, target_id),
            Tracked::settling(target.clone()),
        );
        Ok(target)
    }

    async fn get_gateway_target(
        &self,
        gateway_identifier: &str,
        target_id: &str,
    ) -> Result<GatewayTarget, ApiError> {
        let mut state = self.enter("get_gateway_target")?;
        let key = (gateway_identifier.to_owned(), target_id.to_owned());
        let not_found = || ApiError::not_found(format!("Target {} not found", target_id));
        let settled = state.targets.get_mut(&key).ok_or_else(not_found)?.read();
        if settled {
            let status = state.targets[&key].value.status.clone();
            if status == TargetStatus::Deleting {
                state.targets.remove(&key);
                return Err(not_found());
            }
            let failure = match status {
                TargetStatus::Creating => state.settle_failure("target_create"),
                TargetStatus::Updating => state.settle_failure("target_update"),
                _ => None,
            };
            let target = &mut state.targets.get_mut(&key).ok_or_else(not_found)?.value;
            match (status, failure) {
                (TargetStatus::Creating, Some(reason)) => {
                    target.status = TargetStatus::Failed;
                    target.status_reasons = vec![reason];
                }
                (TargetStatus::Updating, Some(reason)) => {
                    target.status = TargetStatus::UpdateUnsuccessful;
                    target.status_reasons = vec![reason];
                }
                (TargetStatus::Creating | TargetStatus::Updating, None) => {
                    target.status = TargetStatus::Ready;
                }
                _ => {}
            }
        }
        Ok(state.targets.get(&key).ok_or_else(not_found)?.value.clone())
    }

    async fn update_gateway_target(
        &self,
        target_id: &str,
        input: GatewayTargetInput,
    ) -> Result<GatewayTarget, ApiError> {
        let mut state = self.enter("update_gateway_target")?;
        let key = (input.gateway_identifier.clone(), target_id.to_owned());
        let tracked = state
            .targets
            .get_mut(&key)
            .ok_or_else(|| ApiError::not_found(format!("Target {} not found", target_id)))?;
        if tracked.value.status != TargetStatus::Ready
            && tracked.value.status != TargetStatus::UpdateUnsuccessful
        {
            return Err(ApiError::new(
                CONFLICT,
                format!("Target {} is {}", target_id, tracked.value.status),
            ));
        }
        tracked.value.name = input.name;
        tracked.value.description = input.description;
        tracked.value.target_configuration = input.target_configuration;
        tracked.value.credential_provider_configuration = input.credential_provider_configuration;
        tracked.value.status = TargetStatus::Updating;
        tracked.value.status_reasons.clear();
        tracked.reads_left = SETTLE_READS;
        Ok(tracked.value.clone())
    }

    async fn delete_gateway_target(
        &self,
        gateway_identifier: &str,
        target_id: &str,
    ) -> Result<(), ApiError> {
        let mut state = self.enter("delete_gateway_target")?;
        let key = (gateway_identifier.to_owned(), target_id.to_owned());
        let tracked = state
            .targets
            .get_mut(&key)
            .ok_or_else(|| ApiError::not_found(format!("Target {} not found", target_id)))?;
        tracked.value.status = TargetStatus::Deleting;
        tracked.reads_left = SETTLE_READS;
        Ok(())
    }

    async fn set_token_vault_cmk(
        &self,
        token_vault_id: &str,
        kms_configuration: &KmsConfiguration,
    ) -> Result<TokenVault, ApiError> {
        let mut state = self.enter("set_token_vault_cmk")?;
        let vault = vault(&mut state, token_vault_id);
        vault.pending = Some(Tracked::settling(kms_configuration.clone()));
        Ok(TokenVault {
            kms_configuration: kms_configuration.clone(),
            ..vault.current.clone()
        })
    }

    async fn get_token_vault(&self, token_vault_id: &str) -> Result<TokenVault, ApiError> {
        let mut state = self.enter("get_token_vault")?;
        let vault = vault(&mut state, token_vault_id);
        if let Some(pending) = vault.pending.as_mut() {
            if pending.read() {
                vault.current.kms_configuration = pending.value.clone();
                vault.current.last_modified_date = Some("2025-01-01T00:00:00Z".to_owned());
                vault.pending = None;
            }
        }
        Ok(vault.current.clone())
    }

    async fn create_workload_identity(
        &self,
        name: &str,
        allowed_resource_oauth2_return_urls: &[String],
    ) -> Result<WorkloadIdentity, ApiError> {
        let mut state = self.enter("create_workload_identity")?;
        if state.identities.contains_key(name) {
            return Err(ApiError::new(
                CONFLICT,
                format!("Workload identity {} already exists", name),
            ));
        }
        let identity = WorkloadIdentity {
            name: name.to_owned(),
            workload_identity_arn: Some(format!(
                "arn:aws:bedrock-agentcore:us-east-1:123456789012:workload-identity-directory/default/workload-identity/{}",
                name
            )),
            allowed_resource_oauth2_return_urls: allowed_resource_oauth2_return_urls.to_vec(),
        };
        state
            .identities
            .insert(name.to_owned(), Tracked::settling(identity.clone()));
        Ok(identity)
    }

    async fn get_workload_identity(&self, name: &str) -> Result<WorkloadIdentity, ApiError> {
        let mut state = self.enter("get_workload_identity")?;
        let not_found = || ApiError::not_found(format!("Workload identity {} not found", name));
        let tracked = state.identities.get_mut(name).ok_or_else(not_found)?;
        // Not visible to reads until it has propagated.
        if tracked.reads_left > 0 {
            tracked.read();
            return Err(not_found());
        }
        Ok(tracked.value.clone())
    }

    async fn update_workload_identity(
        &self,
        name: &str,
        allowed_resource_oauth2_return_urls: &[String],
    ) -> Result<WorkloadIdentity, ApiError> {
        let mut state = self.enter("update_workload_identity")?;
        let tracked = state.identities.get_mut(name).ok_or_else(|| {
            ApiError::not_found(format!("Workload identity {} not found", name))
        })?;
        tracked.value.allowed_resource_oauth2_return_urls =
            allowed_resource_oauth2_return_urls.to_vec();
        Ok(tracked.value.clone())
    }

    async fn delete_workload_identity(&self, name: &str) -> Result<(), ApiError> {
        let mut state = self.enter("delete_workload_identity")?;
        state
            .identities
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found(format!("Workload identity {} not found", name)))
    }

    async fn create_code_interpreter(
        &self,
        input: CreateCodeInterpreterInput,
    ) -> Result<CodeInterpreter, ApiError> {
        let mut state = self.enter("create_code_interpreter")?;
        let id = state.id("ci");
        let interpreter = CodeInterpreter {
            code_interpreter_id: id.clone(),
            code_interpreter_arn: Some(format!(
                "arn:aws:bedrock-agentcore:us-east-1:123456789012:code-interpreter-custom/{}",
                id
            )),
            name: input.name,
            description: input.description,
            execution_role_arn: input.execution_role_arn,
            network_mode: input.network_mode,
            status: CodeInterpreterStatus::Creating,
            failure_reason: None,
        };
        state
            .interpreters
            .insert(id, Tracked::settling(interpreter.clone()));
        Ok(interpreter)
    }

    async fn get_code_interpreter(
        &self,
        code_interpreter_id: &str,
    ) -> Result<CodeInterpreter, ApiError> {
        let mut state = self.enter("get_code_interpreter")?;
        let not_found = || {
            ApiError::not_found(format!("Code interpreter {} not found", code_interpreter_id))
        };
        if let Some(lag) = state.lagging_deletes.get_mut(code_interpreter_id) {
            *lag -= 1;
            if *lag == 0 {
                state.lagging_deletes.remove(code_interpreter_id);
                let tracked = state
                    .interpreters
                    .get_mut(code_interpreter_id)
                    .ok_or_else(not_found)?;
                tracked.value.status = CodeInterpreterStatus::Deleting;
                tracked.reads_left = SETTLE_READS;
            }
            return Ok(state
                .interpreters
                .get(code_interpreter_id)
                .ok_or_else(not_found)?
                .value
                .clone());
        }
        let settled = state
            .interpreters
            .get_mut(code_interpreter_id)
            .ok_or_else(not_found)?
            .read();
        if settled {
            let failure = state.settle_failure("code_interpreter");
            let interpreter = &mut state
                .interpreters
                .get_mut(code_interpreter_id)
                .ok_or_else(not_found)?
                .value;
            let status = interpreter.status.clone();
            match (status, failure) {
                (CodeInterpreterStatus::Creating, Some(reason)) => {
                    interpreter.status = CodeInterpreterStatus::CreateFailed;
                    interpreter.failure_reason = Some(reason);
                }
                (CodeInterpreterStatus::Creating, None) => {
                    interpreter.status = CodeInterpreterStatus::Ready;
                }
                (CodeInterpreterStatus::Deleting, _) => {
                    interpreter.status = CodeInterpreterStatus::Deleted;
                }
                _ => {}
            }
        }
        Ok(state
            .interpreters
            .get(code_interpreter_id)
            .ok_or_else(not_found)?
            .value
            .clone())
    }

    async fn delete_code_interpreter(
        &self,
        code_interpreter_id: &str,
        _client_token: &str,
    ) -> Result<(), ApiError> {
        let mut state = self.enter("delete_code_interpreter")?;
        let not_found = || {
            ApiError::not_found(format!("Code interpreter {} not found", code_interpreter_id))
        };
        let deletable = state
            .interpreters
            .get(code_interpreter_id)
            .map_or(false, |t| t.value.status != CodeInterpreterStatus::Deleted);
        if !deletable {
            return Err(not_found());
        }
        if state.delete_lag > 0 {
            let lag = std::mem::take(&mut state.delete_lag);
            state
                .lagging_deletes
                .insert(code_interpreter_id.to_owned(), lag);
            return Ok(());
        }
        let tracked = state
            .interpreters
            .get_mut(code_interpreter_id)
            .ok_or_else(not_found)?;
        tracked.value.status = CodeInterpreterStatus::Deleting;
        tracked.reads_left = SETTLE_READS;
        Ok(())
    }
}

/// Logs recorded ids as `created <id>` in the call log, so tests see
/// where in the call sequence an id was handed over.
#[async_trait]
impl CreationRecorder for FakeControlPlane {
    async fn created(&self, id: &str) {
        self.lock().calls.push(format!("created {}", id));
    }
}

/// Token vaults always exist. Unknown ids start out service-managed.
fn vault<'a>(state: &'a mut FakeState, token_vault_id: &str) -> &'a mut Vault {
    state
        .vaults
        .entry(token_vault_id.to_owned())
        .or_insert_with(|| Vault {
            current: TokenVault {
                token_vault_id: token_vault_id.to_owned(),
                kms_configuration: KmsConfiguration::service_managed(),
                last_modified_date: None,
            },
            pending: None,
        })
}
