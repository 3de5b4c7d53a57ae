use crate::{
    handler::Observed,
    util::{
        messages,
        patch::{patch_status, Object},
        Error,
    },
};
use agentcore_types::{ResourcePhase, ResourceStatus};
use kube::{Client, Resource};

/// Copies what was observed about the remote object into the status.
fn record(status: &mut ResourceStatus, observed: &Observed) {
    status.id = Some(observed.id.clone());
    status.parent_id = observed.parent_id.clone();
    status.arn = observed.arn.clone();
    status.remote_status = observed.remote_status.clone();
}

/// Updates the resource's phase to Pending, which indicates the
/// controller has seen it but not acted on it yet.
pub async fn pending<K: Object>(client: Client, instance: &K) -> Result<K, Error> {
    patch_status(client, instance, |status| {
        status.phase = Some(ResourcePhase::Pending);
        status.message = Some(messages::PENDING.to_owned());
    })
    .await
}

/// Records that a mutation is in progress. Returns the patched resource.
pub async fn progress<K: Object>(
    client: Client,
    instance: &K,
    phase: ResourcePhase,
    message: String,
) -> Result<K, Error> {
    patch_status(client, instance, move |status| {
        status.phase = Some(phase);
        status.message = Some(message);
    })
    .await
}

/// Records the id of a remote object that was just created and is
/// still settling, so it is found again if the wait is interrupted.
pub async fn created<K: Object>(
    client: Client,
    instance: &K,
    id: &str,
    parent_id: Option<&str>,
) -> Result<(), Error> {
    patch_status(client, instance, |status| {
        status.id = Some(id.to_owned());
        status.parent_id = parent_id.map(str::to_owned);
    })
    .await?;
    Ok(())
}

/// Updates the resource's phase to Ready, which indicates the remote
/// object matches the spec at the current generation.
pub async fn ready<K: Object>(client: Client, instance: &K, observed: &Observed) -> Result<K, Error> {
    let generation = instance.meta().generation;
    patch_status(client, instance, |status| {
        status.phase = Some(ResourcePhase::Ready);
        status.message = Some(messages::READY.to_owned());
        status.observed_generation = generation;
        record(status, observed);
    })
    .await
}

/// Refreshes the remote status while the remote object settles. The
/// phase is left as it is. Nothing is written if nothing changed.
pub async fn waiting<K: Object>(
    client: Client,
    instance: &K,
    observed: &Observed,
) -> Result<(), Error> {
    let unchanged = instance.status().map_or(false, |status| {
        status.remote_status == observed.remote_status
            && status.message.as_deref() == Some(messages::WAITING)
    });
    if unchanged {
        return Ok(());
    }
    patch_status(client, instance, |status| {
        status.message = Some(messages::WAITING.to_owned());
        record(status, observed);
    })
    .await?;
    Ok(())
}

/// Updates the resource's phase to ErrFailed because the remote object
/// is in a failure status.
pub async fn remote_failed<K: Object>(
    client: Client,
    instance: &K,
    observed: &Observed,
    message: &str,
) -> Result<(), Error> {
    let generation = instance.meta().generation;
    patch_status(client, instance, |status| {
        status.phase = Some(ResourcePhase::ErrFailed);
        status.message = Some(message.to_owned());
        status.observed_generation = generation;
        record(status, observed);
    })
    .await?;
    Ok(())
}

/// Updates the resource's phase to ErrFailed because the control plane
/// rejected a request. If `id` is given, the remote object exists and
/// its id and parent are recorded so it is not leaked.
pub async fn failed<K: Object>(
    client: Client,
    instance: &K,
    message: &str,
    id: Option<&str>,
    parent_id: Option<&str>,
) -> Result<(), Error> {
    let generation = instance.meta().generation;
    patch_status(client, instance, |status| {
        status.phase = Some(ResourcePhase::ErrFailed);
        status.message = Some(message.to_owned());
        status.observed_generation = generation;
        if let Some(id) = id {
            status.id = Some(id.to_owned());
            status.parent_id = parent_id.map(str::to_owned);
        }
    })
    .await?;
    Ok(())
}

/// Updates the resource's phase to ErrImportNotFound.
pub async fn import_not_found<K: Object>(
    client: Client,
    instance: &K,
    id: &str,
) -> Result<(), Error> {
    patch_status(client, instance, |status| {
        status.phase = Some(ResourcePhase::ErrImportNotFound);
        status.message = Some(messages::import_not_found(id));
    })
    .await?;
    Ok(())
}

/// Forgets the remote object so the next reconciliation creates a new one.
pub async fn forget<K: Object>(client: Client, instance: &K, message: &str) -> Result<(), Error> {
    patch_status(client, instance, |status| {
        status.phase = Some(ResourcePhase::Pending);
        status.message = Some(message.to_owned());
        status.id = None;
        status.parent_id = None;
        status.arn = None;
        status.remote_status = None;
    })
    .await?;
    Ok(())
}
