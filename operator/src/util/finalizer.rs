use super::{patch::name_and_namespace, Error, FINALIZER_NAME};
use kube::{
    api::{Patch, PatchParams, Resource},
    core::NamespaceResourceScope,
    Api, Client, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::{clone::Clone, fmt::Debug};

/// Returns true if the resource carries this controller's finalizer.
pub fn has_finalizer<T: Resource>(instance: &T) -> bool {
    instance.finalizers().iter().any(|f| f == FINALIZER_NAME)
}

/// Adds the finalizer record into a `T` kind of resource. Finalizers
/// owned by other controllers are preserved. If the finalizer already
/// exists, this action has no effect.
///
/// Note: Does not check for resource's existence for simplicity.
pub async fn add<T>(client: Client, instance: &T) -> Result<T, Error>
where
    T: Clone
        + Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Serialize
        + DeserializeOwned
        + Debug,
{
    let mut finalizers = instance.finalizers().to_vec();
    if !finalizers.iter().any(|f| f == FINALIZER_NAME) {
        finalizers.push(FINALIZER_NAME.to_owned());
    }
    set(client, instance, finalizers).await
}

/// Removes this controller's finalizer from `T` resource, leaving any
/// others in place. If the finalizer is already gone, this action has
/// no effect.
pub async fn delete<T>(client: Client, instance: &T) -> Result<T, Error>
where
    T: Clone
        + Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Serialize
        + DeserializeOwned
        + Debug,
{
    let finalizers: Vec<String> = instance
        .finalizers()
        .iter()
        .filter(|f| *f != FINALIZER_NAME)
        .cloned()
        .collect();
    set(client, instance, finalizers).await
}

async fn set<T>(client: Client, instance: &T, finalizers: Vec<String>) -> Result<T, Error>
where
    T: Clone
        + Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Serialize
        + DeserializeOwned
        + Debug,
{
    let (name, namespace) = name_and_namespace(instance)?;
    let api: Api<T> = Api::namespaced(client, namespace);
    let finalizers: Value = if finalizers.is_empty() {
        Value::Null
    } else {
        json!(finalizers)
    };
    let patch: Value = json!({
        "metadata": {
            "finalizers": finalizers
        }
    });
    let patch: Patch<&Value> = Patch::Merge(&patch);
    Ok(api.patch(name, &PatchParams::default(), &patch).await?)
}
