use super::{Error, MANAGER_NAME};
use agentcore_types::*;
use kube::{
    api::{Patch, PatchParams, Resource},
    core::NamespaceResourceScope,
    Api, Client,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{clone::Clone, fmt::Debug};

/// Common accessors over every AgentCore custom resource, so the
/// controller can be written once for all kinds.
pub trait Object:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    type Spec: Clone + Send + Sync;

    fn spec(&self) -> &Self::Spec;

    fn status(&self) -> Option<&ResourceStatus>;

    /// Returns a mutable reference to the status object, initializing
    /// it with the default value if it does not exist.
    fn mut_status(&mut self) -> &mut ResourceStatus;

    fn timeouts(&self) -> Option<&TimeoutsSpec>;

    fn import_id(&self) -> Option<&str>;
}

macro_rules! impl_object {
    ($kind:ty, $spec:ty) => {
        impl Object for $kind {
            type Spec = $spec;

            fn spec(&self) -> &$spec {
                &self.spec
            }

            fn status(&self) -> Option<&ResourceStatus> {
                self.status.as_ref()
            }

            fn mut_status(&mut self) -> &mut ResourceStatus {
                self.status.get_or_insert_with(Default::default)
            }

            fn timeouts(&self) -> Option<&TimeoutsSpec> {
                self.spec.timeouts.as_ref()
            }

            fn import_id(&self) -> Option<&str> {
                self.spec.import_id.as_deref()
            }
        }
    };
}

impl_object!(Memory, MemorySpec);
impl_object!(MemoryStrategy, MemoryStrategySpec);
impl_object!(GatewayTarget, GatewayTargetSpec);
impl_object!(TokenVaultCmk, TokenVaultCmkSpec);
impl_object!(WorkloadIdentity, WorkloadIdentitySpec);
impl_object!(CodeInterpreter, CodeInterpreterSpec);

/// Patch the resource's status object with the provided function.
/// The function is passed a mutable reference to the status object,
/// which is to be mutated in-place. Move closures are supported.
/// `lastUpdated` is always refreshed.
pub async fn patch_status<T: Object>(
    client: Client,
    instance: &T,
    f: impl FnOnce(&mut ResourceStatus),
) -> Result<T, Error> {
    let mut modified = instance.clone();
    let status = modified.mut_status();
    f(status);
    status.last_updated = Some(chrono::Utc::now().to_rfc3339());
    let patch = Patch::Json::<T>(json_patch::diff(
        &serde_json::to_value(instance)?,
        &serde_json::to_value(&modified)?,
    ));
    let (name, namespace) = name_and_namespace(instance)?;
    let api: Api<T> = Api::namespaced(client, namespace);
    Ok(api
        .patch_status(name, &PatchParams::apply(MANAGER_NAME), &patch)
        .await?)
}

/// Returns the name and namespace of a namespaced resource.
pub fn name_and_namespace<T: Resource>(instance: &T) -> Result<(&str, &str), Error> {
    let meta = instance.meta();
    let name = meta
        .name
        .as_deref()
        .ok_or_else(|| Error::UserInputError("resource has no name".to_owned()))?;
    let namespace = meta.namespace.as_deref().ok_or_else(|| {
        Error::UserInputError(
            "Expected resource to be namespaced. Can't reconcile in an unknown namespace."
                .to_owned(),
        )
    })?;
    Ok((name, namespace))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mut_status_initializes_missing_status() {
        let mut memory = Memory::new("chat", MemorySpec::default());
        assert!(Object::status(&memory).is_none());
        memory.mut_status().id = Some("mem-1".to_owned());
        assert_eq!(
            Object::status(&memory).and_then(|s| s.id.as_deref()),
            Some("mem-1")
        );
    }

    #[test]
    fn accessors_read_common_spec_fields() {
        let target = GatewayTarget::new(
            "tools",
            GatewayTargetSpec {
                import_id: Some("tgt-1".to_owned()),
                timeouts: Some(TimeoutsSpec {
                    create: Some("5m".to_owned()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        assert_eq!(target.import_id(), Some("tgt-1"));
        assert_eq!(
            target.timeouts().and_then(|t| t.create.as_deref()),
            Some("5m")
        );
    }

    #[test]
    fn namespace_is_required() {
        let memory = Memory::new("chat", MemorySpec::default());
        assert!(matches!(
            name_and_namespace(&memory),
            Err(Error::UserInputError(_))
        ));
    }
}
