use super::{actions, ContextData};
use crate::{
    handler::{CreationRecorder, Diff, Handler, Observed, Timeouts},
    util::{
        finalizer::{self, has_finalizer},
        messages,
        patch::{name_and_namespace, Object},
        Error, ERROR_REQUEUE_INTERVAL, SETTLE_INTERVAL,
    },
};
use agentcore_types::{ResourcePhase, ResourceStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kube::{runtime::controller::Action, Client, Resource, ResourceExt};
use std::{borrow::Cow, sync::Arc, time::Duration};
use tracing::{info, warn};

/// Action to be taken upon a resource during reconciliation.
#[derive(Debug, PartialEq)]
pub enum ResourceAction<S> {
    /// Set the status.phase to Pending and add the finalizer.
    Pending,

    /// Adds the finalizer to the resource.
    AddFinalizer,

    /// Create the remote object.
    Create,

    /// Adopt the existing remote object with this id.
    Import(String),

    /// Change drifted fields of the remote object in place.
    Update { fields: Vec<String>, state: S },

    /// Delete the remote object so it is recreated with the new
    /// immutable fields.
    Replace { id: String, fields: Vec<String> },

    /// The recorded remote object no longer exists.
    Vanished,

    /// The remote object is transitioning on its own.
    Waiting(Observed),

    /// The remote object is in a failure status.
    Failed { message: String, observed: Observed },

    /// Refresh the Ready status.
    Ready(Observed),

    /// Delete the remote object, if one was recorded, then remove
    /// the finalizer.
    Delete(Option<String>),

    /// This resource is in desired state and requires no actions to be taken
    NoOp,
}

impl<S> ResourceAction<S> {
    /// Short name used as the metrics label and in logs.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceAction::Pending => "Pending",
            ResourceAction::AddFinalizer => "AddFinalizer",
            ResourceAction::Create => "Create",
            ResourceAction::Import(_) => "Import",
            ResourceAction::Update { .. } => "Update",
            ResourceAction::Replace { .. } => "Replace",
            ResourceAction::Vanished => "Vanished",
            ResourceAction::Waiting(_) => "Waiting",
            ResourceAction::Failed { .. } => "Failed",
            ResourceAction::Ready(_) => "Ready",
            ResourceAction::Delete(_) => "Delete",
            ResourceAction::NoOp => "NoOp",
        }
    }
}

/// Reconciliation function shared by every AgentCore resource.
pub(crate) async fn reconcile<K, H>(
    instance: Arc<K>,
    context: Arc<ContextData<H>>,
) -> Result<Action, Error>
where
    K: Object,
    H: Handler<Spec = K::Spec>,
{
    let (name, namespace) = name_and_namespace(instance.as_ref())?;

    #[cfg(feature = "metrics")]
    context
        .metrics
        .reconcile_counter
        .with_label_values(&[name, namespace])
        .inc();

    // Read phase of reconciliation determines goal during the write phase.
    #[cfg(feature = "metrics")]
    let start = std::time::Instant::now();
    let action = determine_action(&context.handler, instance.as_ref(), context.resync_interval).await?;

    if action != ResourceAction::NoOp {
        info!(namespace, name, kind = H::KIND, action = action.label(), "reconciling");
    }

    #[cfg(feature = "metrics")]
    {
        let label = action.label();
        context
            .metrics
            .action_counter
            .with_label_values(&[name, namespace, label])
            .inc();
        context
            .metrics
            .read_histogram
            .with_label_values(&[name, namespace, label])
            .observe(start.elapsed().as_secs_f64());
    }

    // Performs action as decided by the `determine_action` function.
    // This is the write phase of reconciliation.
    #[cfg(feature = "metrics")]
    let timer = context
        .metrics
        .write_histogram
        .with_label_values(&[name, namespace, action.label()])
        .start_timer();

    let result = match apply(&context, instance.as_ref(), action).await {
        Ok(action) => Ok(action),
        Err(err) => settle(&context, instance.as_ref(), err).await,
    };

    #[cfg(feature = "metrics")]
    timer.observe_duration();

    result
}

/// Write phase of reconciliation.
async fn apply<K, H>(
    context: &ContextData<H>,
    instance: &K,
    action: ResourceAction<H::State>,
) -> Result<Action, Error>
where
    K: Object,
    H: Handler<Spec = K::Spec>,
{
    let client = context.client.clone();
    let handler = &context.handler;
    let spec = instance.spec();
    match action {
        ResourceAction::Pending => {
            // Give the resource a finalizer.
            let instance = finalizer::add(client.clone(), instance).await?;

            // Update the phase of the resource to Pending.
            actions::pending(client, &instance).await?;

            // Requeue immediately.
            Ok(Action::requeue(Duration::ZERO))
        }
        ResourceAction::AddFinalizer => {
            finalizer::add(client, instance).await?;
            Ok(Action::requeue(Duration::ZERO))
        }
        ResourceAction::Create => {
            let timeouts = resolve_timeouts(handler, instance)?;
            let instance = actions::progress(
                client.clone(),
                instance,
                ResourcePhase::Creating,
                messages::CREATING.to_owned(),
            )
            .await?;
            let recorder = StatusRecorder {
                client: client.clone(),
                instance: &instance,
                parent_id: handler.parent(spec).map(|parent| parent.id),
            };
            let state = handler.create_with(spec, &timeouts, &recorder).await?;
            actions::ready(client, &instance, &observe(handler, spec, &state)).await?;
            Ok(Action::requeue(context.resync_interval))
        }
        ResourceAction::Import(id) => {
            let instance = actions::progress(
                client.clone(),
                instance,
                ResourcePhase::Importing,
                messages::IMPORTING.to_owned(),
            )
            .await?;
            match handler.import(spec, &id).await {
                Ok(state) => {
                    actions::ready(client, &instance, &observe(handler, spec, &state)).await?;
                }
                Err(err) if err.is_not_found() => {
                    actions::import_not_found(client, &instance, &id).await?;
                }
                Err(err) => return Err(err),
            }
            Ok(Action::requeue(context.resync_interval))
        }
        ResourceAction::Update { fields, state } => {
            let timeouts = resolve_timeouts(handler, instance)?;
            let instance = actions::progress(
                client.clone(),
                instance,
                ResourcePhase::Updating,
                messages::updating(&fields),
            )
            .await?;
            let state = handler.update(spec, &state, &timeouts).await?;
            actions::ready(client, &instance, &observe(handler, spec, &state)).await?;
            Ok(Action::requeue(context.resync_interval))
        }
        ResourceAction::Replace { id, fields } => {
            let timeouts = resolve_timeouts(handler, instance)?;
            let located = located(handler, instance);
            let instance = actions::progress(
                client.clone(),
                instance,
                ResourcePhase::Replacing,
                messages::replacing(&fields),
            )
            .await?;
            handler.delete(&located, &id, &timeouts).await?;
            actions::forget(client, &instance, messages::REPLACED).await?;

            // Requeue immediately to create the replacement.
            Ok(Action::requeue(Duration::ZERO))
        }
        ResourceAction::Vanished => {
            actions::forget(client, instance, messages::VANISHED).await?;
            Ok(Action::requeue(Duration::ZERO))
        }
        ResourceAction::Waiting(observed) => {
            actions::waiting(client, instance, &observed).await?;
            Ok(Action::requeue(SETTLE_INTERVAL))
        }
        ResourceAction::Failed { message, observed } => {
            actions::remote_failed(client, instance, &observed, &message).await?;
            Ok(Action::requeue(context.resync_interval))
        }
        ResourceAction::Ready(observed) => {
            actions::ready(client, instance, &observed).await?;
            Ok(Action::requeue(context.resync_interval))
        }
        ResourceAction::Delete(id) => {
            if let Some(id) = id {
                let timeouts = delete_timeouts(handler, instance);
                let located = located(handler, instance);
                let instance = actions::progress(
                    client.clone(),
                    instance,
                    ResourcePhase::Deleting,
                    messages::DELETING.to_owned(),
                )
                .await?;
                handler.delete(&located, &id, &timeouts).await?;
                finalizer::delete(client, &instance).await?;
            } else {
                finalizer::delete(client, instance).await?;
            }

            // No need to requeue as the resource is being deleted.
            Ok(Action::await_change())
        }
        ResourceAction::NoOp => Ok(Action::requeue(context.resync_interval)),
    }
}

/// Writes the id of a new remote object to the status as soon as the
/// handler has it, while the phase is still Creating.
struct StatusRecorder<'a, K> {
    client: Client,
    instance: &'a K,
    parent_id: Option<String>,
}

#[async_trait]
impl<'a, K: Object> CreationRecorder for StatusRecorder<'a, K> {
    async fn created(&self, id: &str) {
        let result = actions::created(
            self.client.clone(),
            self.instance,
            id,
            self.parent_id.as_deref(),
        )
        .await;
        // The id is written again once the object settles.
        if let Err(err) = result {
            warn!(
                name = %self.instance.name_any(),
                id,
                error = %err,
                "failed to record new remote object"
            );
        }
    }
}

/// What becomes of a write phase error.
#[derive(Debug, PartialEq)]
enum Settlement {
    /// Hand the error to `on_error`, which requeues soon.
    Retry,

    /// Record the failure in the status. `id` names a remote object
    /// that was created even though the operation failed.
    Fail { message: String, id: Option<String> },
}

fn settlement(err: &Error) -> Settlement {
    if err.is_retryable() {
        return Settlement::Retry;
    }
    let id = match err {
        Error::Tainted { id, .. } => Some(id.clone()),
        _ => None,
    };
    Settlement::Fail {
        message: err.to_string(),
        id,
    }
}

/// Routes a write phase error. Retryable errors go to `on_error` so the
/// resource is requeued soon; anything else is recorded in the status.
async fn settle<K, H>(context: &ContextData<H>, instance: &K, err: Error) -> Result<Action, Error>
where
    K: Object,
    H: Handler<Spec = K::Spec>,
{
    let (message, id) = match settlement(&err) {
        Settlement::Retry => return Err(err),
        Settlement::Fail { message, id } => (message, id),
    };
    #[cfg(feature = "metrics")]
    context.metrics.observe_error(
        &instance.name_any(),
        instance.namespace().as_deref().unwrap_or_default(),
        &err,
    );
    let client = context.client.clone();
    warn!(
        name = %instance.name_any(),
        kind = H::KIND,
        error = %err,
        "reconciliation failed"
    );
    let parent_id = context
        .handler
        .parent(instance.spec())
        .map(|parent| parent.id);
    actions::failed(
        client,
        instance,
        &message,
        id.as_deref(),
        parent_id.as_deref(),
    )
    .await?;
    Ok(Action::requeue(context.resync_interval))
}

fn resolve_timeouts<K, H>(handler: &H, instance: &K) -> Result<Timeouts, Error>
where
    K: Object,
    H: Handler<Spec = K::Spec>,
{
    Timeouts::resolve(instance.timeouts(), handler.default_timeouts())
}

/// A bad `timeouts` value must not block deletion; the defaults
/// stand in for it.
fn delete_timeouts<K, H>(handler: &H, instance: &K) -> Timeouts
where
    K: Object,
    H: Handler<Spec = K::Spec>,
{
    resolve_timeouts(handler, instance).unwrap_or_else(|err| {
        warn!(name = %instance.name_any(), error = %err, "using default timeouts for deletion");
        handler.default_timeouts()
    })
}

/// What the handler reports about `state`, plus the parent `spec`
/// declares.
fn observe<H: Handler>(handler: &H, spec: &H::Spec, state: &H::State) -> Observed {
    Observed {
        parent_id: handler.parent(spec).map(|parent| parent.id),
        ..handler.observe(state)
    }
}

fn recorded_parent<K: Object>(instance: &K) -> Option<&str> {
    instance
        .status()
        .and_then(|status| status.parent_id.as_deref())
}

/// The parent field, if the spec no longer names the parent the remote
/// object was created under.
fn moved_parent<K, H>(handler: &H, instance: &K) -> Option<&'static str>
where
    K: Object,
    H: Handler<Spec = K::Spec>,
{
    let recorded = recorded_parent(instance)?;
    let declared = handler.parent(instance.spec())?;
    (declared.id != recorded).then_some(declared.field)
}

/// The spec addressed to where the remote object actually lives. After
/// a parent change that is the recorded parent, not the declared one.
fn located<'a, K, H>(handler: &H, instance: &'a K) -> Cow<'a, H::Spec>
where
    K: Object,
    H: Handler<Spec = K::Spec>,
{
    match (moved_parent(handler, instance), recorded_parent(instance)) {
        (Some(_), Some(recorded)) => Cow::Owned(handler.with_parent(instance.spec(), recorded)),
        _ => Cow::Borrowed(instance.spec()),
    }
}

/// True while a create that recorded its id may still be waiting for
/// the object to become readable.
fn still_creating<K, H>(handler: &H, instance: &K) -> Result<bool, Error>
where
    K: Object,
    H: Handler<Spec = K::Spec>,
{
    let Some(status) = instance.status() else {
        return Ok(false);
    };
    if status.phase != Some(ResourcePhase::Creating) {
        return Ok(false);
    }
    let window = resolve_timeouts(handler, instance)
        .unwrap_or_else(|_| handler.default_timeouts())
        .create;
    Ok(status_age(status)?.map_or(false, |age| age < window))
}

/// Resources arrive into the reconciliation queue in a certain state.
/// This function looks at the state of the given resource and the
/// remote object, and decides which action needs to be performed.
async fn determine_action<K, H>(
    handler: &H,
    instance: &K,
    resync_interval: Duration,
) -> Result<ResourceAction<H::State>, Error>
where
    K: Object,
    H: Handler<Spec = K::Spec>,
{
    if let Some(action) = lifecycle_action(instance) {
        return Ok(action);
    }
    let Some(id) = instance.status().and_then(|status| status.id.clone()) else {
        return Ok(match instance.import_id() {
            Some(id) => ResourceAction::Import(id.to_owned()),
            None => ResourceAction::Create,
        });
    };
    let located = located(handler, instance);
    let Some(state) = handler.read(&located, &id).await? else {
        if still_creating(handler, instance)? {
            return Ok(ResourceAction::Waiting(Observed {
                id,
                parent_id: recorded_parent(instance).map(str::to_owned),
                ..Default::default()
            }));
        }
        return Ok(ResourceAction::Vanished);
    };
    decide(handler, instance, state, resync_interval)
}

/// Actions that depend only on the Kubernetes object: deletion, the
/// initial status and the finalizer.
fn lifecycle_action<K: Object, S>(instance: &K) -> Option<ResourceAction<S>> {
    if instance.meta().deletion_timestamp.is_some() {
        if !has_finalizer(instance) {
            return Some(ResourceAction::NoOp);
        }
        let id = instance.status().and_then(|status| status.id.clone());
        return Some(ResourceAction::Delete(id));
    }

    // Ensure that the resource has a status object with a phase.
    // This should be the first action for any freshly created
    // resource. It will be immediately requeued.
    if instance.status().map_or(true, |status| status.phase.is_none()) {
        return Some(ResourceAction::Pending);
    }

    // Ensure the resource has a finalizer so the remote object is
    // deleted before the resource goes away.
    if !has_finalizer(instance) {
        return Some(ResourceAction::AddFinalizer);
    }
    None
}

/// Decides what to do about an existing remote object.
fn decide<K, H>(
    handler: &H,
    instance: &K,
    state: H::State,
    resync_interval: Duration,
) -> Result<ResourceAction<H::State>, Error>
where
    K: Object,
    H: Handler<Spec = K::Spec>,
{
    let observed = observe(handler, instance.spec(), &state);
    if let Some(field) = moved_parent(handler, instance) {
        return Ok(ResourceAction::Replace {
            id: observed.id,
            fields: vec![field.to_owned()],
        });
    }
    let diff = handler.diff(instance.spec(), &state);
    if let Diff::Replace(fields) = diff {
        return Ok(ResourceAction::Replace {
            id: observed.id,
            fields,
        });
    }

    if let Some(message) = observed.failure.clone() {
        // A spec change is the only thing that can get a failed object
        // out of its failure status without replacing it.
        if let Diff::Update(fields) = diff {
            if generation_changed(instance) {
                return Ok(ResourceAction::Update { fields, state });
            }
        }
        if is_current(instance, ResourcePhase::ErrFailed, &message, &observed, resync_interval)? {
            return Ok(ResourceAction::NoOp);
        }
        return Ok(ResourceAction::Failed { message, observed });
    }

    if !observed.settled {
        return Ok(ResourceAction::Waiting(observed));
    }

    if let Diff::Update(fields) = diff {
        return Ok(ResourceAction::Update { fields, state });
    }

    if is_current(instance, ResourcePhase::Ready, messages::READY, &observed, resync_interval)? {
        return Ok(ResourceAction::NoOp);
    }
    Ok(ResourceAction::Ready(observed))
}

fn generation_changed<K: Object>(instance: &K) -> bool {
    instance.status().and_then(|status| status.observed_generation) != instance.meta().generation
}

/// True if the status already says exactly this and was written
/// within the resync interval.
fn is_current<K: Object>(
    instance: &K,
    phase: ResourcePhase,
    message: &str,
    observed: &Observed,
    resync_interval: Duration,
) -> Result<bool, Error> {
    let Some(status) = instance.status() else {
        return Ok(false);
    };
    let same = status.phase == Some(phase)
        && status.message.as_deref() == Some(message)
        && status.id.as_deref() == Some(observed.id.as_str())
        && status.parent_id == observed.parent_id
        && status.arn == observed.arn
        && status.remote_status == observed.remote_status
        && status.observed_generation == instance.meta().generation;
    if !same {
        return Ok(false);
    }
    Ok(status_age(status)?.map_or(false, |age| age < resync_interval))
}

/// Returns how long ago the status was last written, if known.
fn status_age(status: &ResourceStatus) -> Result<Option<Duration>, Error> {
    let Some(last_updated) = status.last_updated.as_ref() else {
        return Ok(None);
    };
    let last_updated: DateTime<Utc> = last_updated.parse()?;
    let age = Utc::now() - last_updated;
    if age < chrono::Duration::zero() {
        return Ok(Some(Duration::ZERO));
    }
    Ok(Some(age.to_std()?))
}

/// Actions to be taken when a reconciliation fails with a retryable
/// error. Logs the error and requeues the resource for another
/// reconciliation after five seconds.
pub(crate) fn on_error<K, H>(instance: Arc<K>, error: &Error, context: Arc<ContextData<H>>) -> Action
where
    K: Object,
{
    #[cfg(feature = "metrics")]
    context.metrics.observe_error(
        &instance.name_any(),
        instance.namespace().as_deref().unwrap_or_default(),
        error,
    );
    #[cfg(not(feature = "metrics"))]
    let _ = context;
    warn!(
        name = %instance.name_any(),
        namespace = instance.namespace().as_deref().unwrap_or_default(),
        error = %error,
        "reconciliation error, requeueing"
    );
    Action::requeue(ERROR_REQUEUE_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{self, fake::FakeControlPlane, ApiError, MemoryStatus, StrategyStatus},
        gateway_targets::GatewayTargetHandler,
        memories::MemoryHandler,
        memory_strategies::MemoryStrategyHandler,
        util::{waiter::Polling, FINALIZER_NAME},
    };
    use agentcore_types::{
        ApiSchemaConfiguration, GatewayTarget, GatewayTargetSpec, McpTargetConfiguration, Memory,
        MemorySpec, MemoryStrategy, MemoryStrategySpec, S3Configuration, StrategyType,
        TargetConfiguration, TimeoutsSpec,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    const RESYNC: Duration = Duration::from_secs(60);

    fn handler() -> MemoryHandler {
        MemoryHandler::new(Arc::new(FakeControlPlane::default()))
    }

    fn spec() -> MemorySpec {
        MemorySpec {
            name: "support_chat".to_owned(),
            event_expiry_duration: 30,
            ..Default::default()
        }
    }

    fn remote(status: MemoryStatus) -> api::Memory {
        api::Memory {
            id: "mem-1".to_owned(),
            arn: Some("arn:aws:bedrock-agentcore:us-east-1:123456789012:memory/mem-1".to_owned()),
            name: "support_chat".to_owned(),
            description: None,
            event_expiry_duration: 30,
            encryption_key_arn: None,
            memory_execution_role_arn: None,
            status,
            failure_reason: None,
            strategies: Vec::new(),
        }
    }

    /// A resource that was made Ready at generation 1 just now.
    fn ready_instance() -> Memory {
        let mut memory = Memory::new("support", spec());
        memory.metadata.namespace = Some("default".to_owned());
        memory.metadata.generation = Some(1);
        memory.metadata.finalizers = Some(vec![FINALIZER_NAME.to_owned()]);
        let observed = handler().observe(&remote(MemoryStatus::Active));
        memory.status = Some(ResourceStatus {
            phase: Some(ResourcePhase::Ready),
            message: Some(messages::READY.to_owned()),
            last_updated: Some(Utc::now().to_rfc3339()),
            id: Some(observed.id),
            parent_id: None,
            arn: observed.arn,
            remote_status: observed.remote_status,
            observed_generation: Some(1),
        });
        memory
    }

    type Action = ResourceAction<api::Memory>;

    #[test]
    fn new_resources_go_pending_then_get_a_finalizer() {
        let mut memory = Memory::new("support", spec());
        assert_eq!(lifecycle_action::<_, api::Memory>(&memory), Some(Action::Pending));

        memory.status = Some(ResourceStatus {
            phase: Some(ResourcePhase::Pending),
            ..Default::default()
        });
        assert_eq!(
            lifecycle_action::<_, api::Memory>(&memory),
            Some(Action::AddFinalizer)
        );

        memory.metadata.finalizers = Some(vec![FINALIZER_NAME.to_owned()]);
        assert_eq!(lifecycle_action::<_, api::Memory>(&memory), None);
    }

    #[test]
    fn deletion_deletes_recorded_remote_object() {
        let mut memory = ready_instance();
        memory.metadata.deletion_timestamp = Some(Time(Utc::now()));
        assert_eq!(
            lifecycle_action::<_, api::Memory>(&memory),
            Some(Action::Delete(Some("mem-1".to_owned())))
        );

        memory.metadata.finalizers = None;
        assert_eq!(lifecycle_action::<_, api::Memory>(&memory), Some(Action::NoOp));
    }

    #[test]
    fn fresh_ready_status_is_a_noop() {
        let action = decide(&handler(), &ready_instance(), remote(MemoryStatus::Active), RESYNC);
        assert_eq!(action.unwrap(), Action::NoOp);
    }

    #[test]
    fn stale_ready_status_is_refreshed() {
        let mut memory = ready_instance();
        memory.status.as_mut().unwrap().last_updated =
            Some((Utc::now() - chrono::Duration::minutes(5)).to_rfc3339());
        let action = decide(&handler(), &memory, remote(MemoryStatus::Active), RESYNC).unwrap();
        assert!(matches!(action, Action::Ready(_)), "{action:?}");
    }

    #[test]
    fn mutable_drift_updates() {
        let mut memory = ready_instance();
        memory.spec.event_expiry_duration = 90;
        memory.metadata.generation = Some(2);
        let action = decide(&handler(), &memory, remote(MemoryStatus::Active), RESYNC).unwrap();
        assert_eq!(
            action,
            Action::Update {
                fields: vec!["eventExpiryDuration".to_owned()],
                state: remote(MemoryStatus::Active),
            }
        );
    }

    #[test]
    fn immutable_drift_replaces() {
        let mut memory = ready_instance();
        memory.spec.name = "sales_chat".to_owned();
        let action = decide(&handler(), &memory, remote(MemoryStatus::Active), RESYNC).unwrap();
        assert_eq!(
            action,
            Action::Replace {
                id: "mem-1".to_owned(),
                fields: vec!["name".to_owned()],
            }
        );
    }

    #[test]
    fn transitioning_remote_object_is_awaited() {
        let action = decide(&handler(), &ready_instance(), remote(MemoryStatus::Creating), RESYNC);
        assert!(matches!(action.unwrap(), Action::Waiting(_)));
    }

    #[test]
    fn failed_remote_object_is_reported_until_the_spec_changes() {
        let mut failed = remote(MemoryStatus::Failed);
        failed.failure_reason = Some("KMS key is disabled".to_owned());
        let mut memory = ready_instance();
        memory.spec.event_expiry_duration = 90;

        let action = decide(&handler(), &memory, failed.clone(), RESYNC).unwrap();
        match action {
            Action::Failed { message, .. } => assert_eq!(message, "KMS key is disabled"),
            other => panic!("expected Failed, got {other:?}"),
        }

        memory.metadata.generation = Some(2);
        let action = decide(&handler(), &memory, failed, RESYNC).unwrap();
        assert!(matches!(action, Action::Update { .. }), "{action:?}");
    }

    #[tokio::test]
    async fn missing_remote_object_has_vanished() {
        let action = determine_action(&handler(), &ready_instance(), RESYNC)
            .await
            .unwrap();
        assert_eq!(action, Action::Vanished);
    }

    #[tokio::test]
    async fn unrecorded_id_creates_or_imports() {
        let mut memory = ready_instance();
        memory.status.as_mut().unwrap().id = None;
        let action = determine_action(&handler(), &memory, RESYNC).await.unwrap();
        assert_eq!(action, Action::Create);

        memory.spec.import_id = Some("mem-7".to_owned());
        let action = determine_action(&handler(), &memory, RESYNC).await.unwrap();
        assert_eq!(action, Action::Import("mem-7".to_owned()));
    }

    #[test]
    fn unparseable_last_updated_is_an_error() {
        let mut status = ResourceStatus::default();
        assert_eq!(status_age(&status).unwrap(), None);
        status.last_updated = Some("yesterday".to_owned());
        assert!(matches!(status_age(&status), Err(Error::ChronoError { .. })));
    }

    /// Marks `resource` as Ready at generation 1 with `id` recorded
    /// under `parent_id`.
    fn recorded<K: Object>(resource: &mut K, id: &str, parent_id: Option<&str>) {
        let meta = resource.meta_mut();
        meta.namespace = Some("default".to_owned());
        meta.generation = Some(1);
        meta.finalizers = Some(vec![FINALIZER_NAME.to_owned()]);
        *resource.mut_status() = ResourceStatus {
            phase: Some(ResourcePhase::Ready),
            message: Some(messages::READY.to_owned()),
            last_updated: Some(Utc::now().to_rfc3339()),
            id: Some(id.to_owned()),
            parent_id: parent_id.map(str::to_owned),
            observed_generation: Some(1),
            ..Default::default()
        };
    }

    fn target_spec(gateway_identifier: &str) -> GatewayTargetSpec {
        GatewayTargetSpec {
            gateway_identifier: gateway_identifier.to_owned(),
            name: "weather".to_owned(),
            target_configuration: TargetConfiguration {
                mcp: McpTargetConfiguration {
                    open_api_schema: Some(ApiSchemaConfiguration {
                        s3: Some(S3Configuration {
                            uri: Some("s3://tools/weather.json".to_owned()),
                            bucket_owner_account_id: None,
                        }),
                        inline_payload: None,
                    }),
                    ..Default::default()
                },
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn target_moved_to_another_gateway_is_replaced_where_it_lives() {
        let fake = Arc::new(FakeControlPlane::default());
        let handler = GatewayTargetHandler::new(fake.clone()).with_polling(Polling::immediate());
        let created = handler
            .create(&target_spec("gw-1"), &Timeouts::default())
            .await
            .unwrap();
        let id = created.target_id;

        let mut target = GatewayTarget::new("weather", target_spec("gw-2"));
        recorded(&mut target, &id, Some("gw-1"));

        // The read goes to gw-1, otherwise the target would have vanished.
        let action = determine_action(&handler, &target, RESYNC).await.unwrap();
        assert_eq!(
            action,
            ResourceAction::Replace {
                id: id.clone(),
                fields: vec!["gatewayIdentifier".to_owned()],
            }
        );

        let spec = located(&handler, &target);
        assert_eq!(spec.gateway_identifier, "gw-1");
        handler.delete(&spec, &id, &Timeouts::default()).await.unwrap();
        assert_eq!(handler.read(&target_spec("gw-1"), &id).await.unwrap(), None);
        assert_eq!(fake.count_calls("delete_gateway_target"), 1);
    }

    #[test]
    fn strategy_moved_to_another_memory_is_replaced() {
        let handler = MemoryStrategyHandler::new(Arc::new(FakeControlPlane::default()));
        let state = api::MemoryStrategy {
            strategy_id: "strat-1".to_owned(),
            name: "facts".to_owned(),
            strategy_type: StrategyType::Semantic,
            description: None,
            namespaces: Vec::new(),
            status: StrategyStatus::Active,
        };
        let spec = |memory_id: &str| MemoryStrategySpec {
            memory_id: memory_id.to_owned(),
            name: "facts".to_owned(),
            ..Default::default()
        };

        let mut strategy = MemoryStrategy::new("facts", spec("mem-2"));
        recorded(&mut strategy, "strat-1", Some("mem-1"));
        assert_eq!(
            decide(&handler, &strategy, state.clone(), RESYNC).unwrap(),
            ResourceAction::Replace {
                id: "strat-1".to_owned(),
                fields: vec!["memoryId".to_owned()],
            }
        );
        assert_eq!(located(&handler, &strategy).memory_id, "mem-1");

        let mut strategy = MemoryStrategy::new("facts", spec("mem-1"));
        recorded(&mut strategy, "strat-1", Some("mem-1"));
        let action = decide(&handler, &strategy, state, RESYNC).unwrap();
        assert!(matches!(action, ResourceAction::Ready(_)), "{action:?}");
        assert_eq!(located(&handler, &strategy).memory_id, "mem-1");
    }

    #[tokio::test]
    async fn created_object_not_yet_readable_is_awaited() {
        let mut memory = ready_instance();
        memory.status.as_mut().unwrap().phase = Some(ResourcePhase::Creating);
        let action = determine_action(&handler(), &memory, RESYNC).await.unwrap();
        match action {
            Action::Waiting(observed) => assert_eq!(observed.id, "mem-1"),
            other => panic!("expected Waiting, got {other:?}"),
        }

        // Past the create timeout it is treated as gone.
        memory.status.as_mut().unwrap().last_updated =
            Some((Utc::now() - chrono::Duration::hours(2)).to_rfc3339());
        let action = determine_action(&handler(), &memory, RESYNC).await.unwrap();
        assert_eq!(action, Action::Vanished);
    }

    #[test]
    fn only_retryable_errors_skip_the_status() {
        let throttled: Error = ApiError::new("ThrottlingException", "Rate exceeded").into();
        assert_eq!(settlement(&throttled), Settlement::Retry);

        let rejected = Error::UserInputError("name is required".to_owned());
        assert_eq!(
            settlement(&rejected),
            Settlement::Fail {
                message: rejected.to_string(),
                id: None,
            }
        );

        let tainted = Error::Timeout {
            last_state: "CREATING".to_owned(),
            expected: "ACTIVE".to_owned(),
        }
        .tainted("mem-1");
        assert_eq!(
            settlement(&tainted),
            Settlement::Fail {
                message: tainted.to_string(),
                id: Some("mem-1".to_owned()),
            }
        );
    }

    #[test]
    fn bad_timeouts_do_not_block_deletion() {
        let handler = handler();
        let mut memory = ready_instance();
        memory.spec.timeouts = Some(TimeoutsSpec {
            delete: Some("whenever".to_owned()),
            ..Default::default()
        });
        assert!(resolve_timeouts(&handler, &memory).is_err());
        assert_eq!(delete_timeouts(&handler, &memory), handler.default_timeouts());

        memory.spec.timeouts = Some(TimeoutsSpec {
            delete: Some("45s".to_owned()),
            ..Default::default()
        });
        assert_eq!(
            delete_timeouts(&handler, &memory).delete,
            Duration::from_secs(45)
        );
    }
}
